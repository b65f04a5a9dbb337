use async_trait::async_trait;

use dagway_types::RequestPath;

use crate::error::NodeResult;
use crate::object::{DirEntry, ResolvedNode};
use crate::stream::ByteStream;

/// A content-addressed node the gateway resolves requests against.
///
/// Implementations must satisfy these invariants:
/// - Resolution is a pure function of the node's state and the path at call
///   time. Content at a fixed identifier never changes.
/// - Identifier validation happens here, not in the gateway: a bad
///   identifier is reported as [`NodeError::MalformedIdentifier`].
/// - Missing path segments are reported as [`NodeError::NoSuchLink`].
///
/// [`NodeError::MalformedIdentifier`]: crate::NodeError::MalformedIdentifier
/// [`NodeError::NoSuchLink`]: crate::NodeError::NoSuchLink
#[async_trait]
pub trait ContentNode: Send + Sync {
    /// Resolves once the node can serve requests.
    async fn ready(&self) -> NodeResult<()>;

    /// Walk the DAG from the path's identifier through its segments.
    async fn resolve(&self, path: &RequestPath) -> NodeResult<ResolvedNode>;

    /// List the links of the directory at `path`.
    async fn list_directory(&self, path: &RequestPath) -> NodeResult<Vec<DirEntry>>;

    /// Open the file at `path` as a chunked byte stream.
    async fn open_byte_stream(&self, path: &RequestPath) -> NodeResult<ByteStream>;
}
