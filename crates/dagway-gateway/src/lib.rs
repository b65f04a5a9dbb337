//! Request pipeline for dagway.
//!
//! A request under the reserved prefix moves through these stages:
//!
//! ```text
//! Received -> CacheCheck -> hit:  Respond
//!                        -> miss: Resolving -> file:      Streaming      -> Respond
//!                                           -> directory: index redirect or listing
//!                                           -> error:     status response
//! ```
//!
//! - [`Gateway`] -- entry point; owns the stages above
//! - [`Resolver`] -- request path to byte stream or [`DirectoryOutcome`]
//! - [`sniff`] -- content type from the first non-empty chunk
//! - [`response`] -- response construction, including the error mapping
//! - [`CacheLayer`] -- request-path keyed responses, filled by [`Prefetcher`]
//! - [`NodeHandle`] -- lazily started content node shared by all requests

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod node;
pub mod prefetch;
pub mod resolver;
pub mod response;
pub mod sniff;

pub use cache::{CacheEntry, CacheLayer, InMemoryResponseCache, ResponseCache};
pub use config::{ConfigError, GatewayConfig, PrefetchConfig};
pub use error::{GatewayError, GatewayResult};
pub use gateway::Gateway;
pub use node::{NodeFactory, NodeHandle, NodeStatus};
pub use prefetch::Prefetcher;
pub use resolver::{DirectoryOutcome, RenderedListing, Resolver};
pub use sniff::{SniffStep, SniffedType, Sniffer};
