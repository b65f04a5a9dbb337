//! Content node interface for dagway.
//!
//! The gateway never talks to a content-addressed network directly. It goes
//! through the [`ContentNode`] trait, which offers exactly three operations
//! plus a readiness signal:
//!
//! - [`ContentNode::resolve`] -- walk a path to a file or directory node
//! - [`ContentNode::list_directory`] -- named links of a directory
//! - [`ContentNode::open_byte_stream`] -- chunked bytes of a file
//!
//! # Backends
//!
//! - [`InMemoryNode`] -- `HashMap`-based DAG for tests and local serving,
//!   filled with [`import_path`]
//!
//! # Streaming
//!
//! File bytes travel over a bounded channel ([`ByteStream`]). The producer
//! waits for capacity instead of buffering, and stops when the reader is
//! dropped.

pub mod error;
pub mod import;
pub mod memory;
pub mod object;
pub mod stream;
pub mod traits;

pub use error::{NodeError, NodeResult};
pub use import::{hash_path, import_path};
pub use memory::InMemoryNode;
pub use object::{DagNode, DirEntry, LinkKind, ResolvedNode};
pub use stream::{ByteStream, ChunkSender, StreamConfig};
pub use traits::ContentNode;
