use bytes::Bytes;
use serde::{Deserialize, Serialize};

use dagway_types::{Codec, ContentId};

use crate::error::{NodeError, NodeResult};

/// Whether a link points at a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    File,
    Directory,
}

impl LinkKind {
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// A named link inside a directory node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Link name (file or directory name).
    pub name: String,
    /// Identifier of the linked node.
    pub cid: ContentId,
    /// File or directory.
    pub kind: LinkKind,
    /// Cumulative content size in bytes.
    pub size: u64,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, cid: ContentId, kind: LinkKind, size: u64) -> Self {
        Self {
            name: name.into(),
            cid,
            kind,
            size,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }
}

impl PartialOrd for DirEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DirEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// A DAG node held by a content node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DagNode {
    /// Raw file contents.
    File(Bytes),
    /// Sorted, uniquely named links.
    Directory(Vec<DirEntry>),
}

impl DagNode {
    /// Build a directory node, sorting entries by name.
    pub fn directory(mut entries: Vec<DirEntry>) -> NodeResult<Self> {
        if let Some(bad) = entries
            .iter()
            .find(|e| e.name.is_empty() || e.name.contains('/') || e.name == "." || e.name == "..")
        {
            return Err(NodeError::InvalidLinkName(bad.name.clone()));
        }
        entries.sort();
        if let Some(pair) = entries.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(NodeError::DuplicateLink(pair[0].name.clone()));
        }
        Ok(Self::Directory(entries))
    }

    pub fn codec(&self) -> Codec {
        match self {
            Self::File(_) => Codec::Raw,
            Self::Directory(_) => Codec::DagPb,
        }
    }

    pub fn kind(&self) -> LinkKind {
        match self {
            Self::File(_) => LinkKind::File,
            Self::Directory(_) => LinkKind::Directory,
        }
    }

    /// Cumulative size: file length, or the sum of a directory's links.
    pub fn size(&self) -> u64 {
        match self {
            Self::File(data) => data.len() as u64,
            Self::Directory(entries) => entries.iter().map(|e| e.size).sum(),
        }
    }

    /// Canonical bytes the identifier is computed over.
    pub fn encode(&self) -> NodeResult<Vec<u8>> {
        match self {
            Self::File(data) => Ok(data.to_vec()),
            Self::Directory(entries) => {
                serde_json::to_vec(entries).map_err(|e| NodeError::Serialization(e.to_string()))
            }
        }
    }

    /// Compute the content identifier for this node.
    pub fn compute_id(&self) -> NodeResult<ContentId> {
        Ok(ContentId::for_content(self.codec(), &self.encode()?))
    }
}

/// Outcome of walking a path through the DAG.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedNode {
    File { cid: ContentId, size: u64 },
    Directory { cid: ContentId, entries: Vec<DirEntry> },
}

impl ResolvedNode {
    pub fn cid(&self) -> ContentId {
        match self {
            Self::File { cid, .. } | Self::Directory { cid, .. } => *cid,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}
