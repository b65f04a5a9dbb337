use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use dagway_gateway::NodeFactory;
use dagway_store::{import_path, ContentNode, InMemoryNode, NodeError, NodeResult, StreamConfig};

/// Starts an in-memory node holding a local file or directory tree.
///
/// The import runs on the blocking pool the first time the gateway needs
/// the node.
#[derive(Clone, Debug)]
pub struct DirectoryNodeFactory {
    root: Option<PathBuf>,
    stream: StreamConfig,
}

impl DirectoryNodeFactory {
    /// With `root = None` the node starts empty.
    pub fn new(root: Option<PathBuf>, stream: StreamConfig) -> Self {
        Self { root, stream }
    }
}

#[async_trait]
impl NodeFactory for DirectoryNodeFactory {
    async fn start(&self) -> NodeResult<Arc<dyn ContentNode>> {
        let node = InMemoryNode::with_stream_config(self.stream.clone());
        let Some(root) = self.root.clone() else {
            info!("starting empty content node");
            return Ok(Arc::new(node));
        };

        let node = tokio::task::spawn_blocking(move || {
            let cid = import_path(&node, &root)?;
            info!(root = %root.display(), %cid, "content node loaded");
            Ok::<_, NodeError>(node)
        })
        .await
        .map_err(|e| NodeError::NotReady(format!("import task failed: {e}")))??;
        Ok(Arc::new(node))
    }
}
