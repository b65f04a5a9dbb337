//! Foundation types for dagway.
//!
//! Every other dagway crate depends on `dagway-types`.
//!
//! # Key Types
//!
//! - [`ContentId`] -- Self-describing content identifier (CIDv1, BLAKE3, base16)
//! - [`RequestPath`] -- Identifier plus sub-path taken from a request URL
//! - [`join_url_parts`] / [`remove_trailing_slash`] -- URL path helpers

pub mod cid;
pub mod error;
pub mod path;

pub use cid::{Codec, ContentId};
pub use error::TypeError;
pub use path::{
    decode_segment, encode_segment, join_url_parts, remove_trailing_slash, RequestPath,
};
