use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use dagway_types::{Codec, ContentId, RequestPath};

use crate::error::{NodeError, NodeResult};
use crate::object::{DagNode, DirEntry, ResolvedNode};
use crate::stream::{ByteStream, StreamConfig};
use crate::traits::ContentNode;

/// In-memory, HashMap-based content node.
///
/// Intended for tests, embedding, and serving a directory imported at
/// startup. Nodes are immutable once written; writing the same content twice
/// is a no-op that returns the same identifier.
pub struct InMemoryNode {
    objects: RwLock<HashMap<ContentId, DagNode>>,
    stream: StreamConfig,
}

impl InMemoryNode {
    /// Create an empty node with default stream settings.
    pub fn new() -> Self {
        Self::with_stream_config(StreamConfig::default())
    }

    /// Create an empty node that streams with the given settings.
    pub fn with_stream_config(stream: StreamConfig) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            stream,
        }
    }

    /// Number of DAG nodes held.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Whether a node with this identifier exists.
    pub fn contains(&self, cid: &ContentId) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(cid)
    }

    /// Store file contents and return their identifier.
    pub fn put_file(&self, data: impl Into<Bytes>) -> ContentId {
        let data = data.into();
        let cid = ContentId::for_content(Codec::Raw, &data);
        self.insert(cid, DagNode::File(data));
        cid
    }

    /// Store a directory linking previously stored nodes by name.
    pub fn put_directory<S: Into<String>>(
        &self,
        links: Vec<(S, ContentId)>,
    ) -> NodeResult<ContentId> {
        let entries = {
            let map = self.objects.read().expect("lock poisoned");
            links
                .into_iter()
                .map(|(name, cid)| {
                    let target = map.get(&cid).ok_or(NodeError::NotFound(cid))?;
                    Ok(DirEntry::new(name, cid, target.kind(), target.size()))
                })
                .collect::<NodeResult<Vec<_>>>()?
        };
        let node = DagNode::directory(entries)?;
        let cid = node.compute_id()?;
        self.insert(cid, node);
        Ok(cid)
    }

    fn insert(&self, cid: ContentId, node: DagNode) {
        let mut map = self.objects.write().expect("lock poisoned");
        map.entry(cid).or_insert(node);
    }

    /// Walk from the path's identifier through its segments.
    fn walk(&self, path: &RequestPath) -> NodeResult<(ContentId, DagNode)> {
        let root: ContentId = path
            .identifier()
            .parse()
            .map_err(|e: dagway_types::TypeError| NodeError::MalformedIdentifier {
                identifier: path.identifier().to_string(),
                reason: e.to_string(),
            })?;

        let map = self.objects.read().expect("lock poisoned");
        let mut cid = root;
        let mut node = map.get(&root).ok_or(NodeError::NotFound(root))?;
        let mut walked = path.identifier().to_string();

        for segment in path.segments() {
            let next = match node {
                DagNode::Directory(entries) => entries.iter().find(|e| &e.name == segment),
                DagNode::File(_) => None,
            };
            let Some(entry) = next else {
                return Err(NodeError::NoSuchLink {
                    name: segment.clone(),
                    parent: walked,
                });
            };
            cid = entry.cid;
            node = map.get(&cid).ok_or(NodeError::NotFound(cid))?;
            walked.push('/');
            walked.push_str(segment);
        }

        Ok((cid, node.clone()))
    }
}

impl Default for InMemoryNode {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryNode")
            .field("object_count", &self.len())
            .field("stream", &self.stream)
            .finish()
    }
}

#[async_trait]
impl ContentNode for InMemoryNode {
    async fn ready(&self) -> NodeResult<()> {
        Ok(())
    }

    async fn resolve(&self, path: &RequestPath) -> NodeResult<ResolvedNode> {
        let (cid, node) = self.walk(path)?;
        debug!(path = %path, cid = %cid.short(), kind = %node.kind(), "resolved");
        Ok(match node {
            DagNode::File(data) => ResolvedNode::File {
                cid,
                size: data.len() as u64,
            },
            DagNode::Directory(entries) => ResolvedNode::Directory { cid, entries },
        })
    }

    async fn list_directory(&self, path: &RequestPath) -> NodeResult<Vec<DirEntry>> {
        match self.walk(path)? {
            (_, DagNode::Directory(entries)) => Ok(entries),
            (_, DagNode::File(_)) => Err(NodeError::NotADirectory(path.content_path())),
        }
    }

    async fn open_byte_stream(&self, path: &RequestPath) -> NodeResult<ByteStream> {
        match self.walk(path)? {
            (cid, DagNode::File(data)) => Ok(ByteStream::from_bytes(cid, data, &self.stream)),
            (_, DagNode::Directory(_)) => Err(NodeError::NotAFile(path.content_path())),
        }
    }
}
