use dagway_types::ContentId;

/// Errors reported by a content node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The identifier failed multibase, alphabet, or multihash validation.
    #[error("{reason}")]
    MalformedIdentifier { identifier: String, reason: String },

    /// A path segment does not exist under the addressed node.
    #[error("no link named \"{name}\" under {parent}")]
    NoSuchLink { name: String, parent: String },

    /// The root identifier is valid but unknown to this node.
    #[error("object not found: {0}")]
    NotFound(ContentId),

    /// A byte stream was requested for a directory.
    #[error("this dag node is a directory: {0}")]
    NotAFile(String),

    /// A listing was requested for a file.
    #[error("this dag node is not a directory: {0}")]
    NotADirectory(String),

    /// Two links in one directory share a name.
    #[error("duplicate link name: {0}")]
    DuplicateLink(String),

    /// A link name is empty or contains a separator.
    #[error("invalid link name: {0:?}")]
    InvalidLinkName(String),

    /// The node has not finished starting, or failed to.
    #[error("node not ready: {0}")]
    NotReady(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The producer side of a byte stream failed mid-transfer.
    #[error("stream error: {0}")]
    Stream(String),

    /// I/O error from the underlying backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error the node only exposes as descriptive text.
    #[error("{0}")]
    Untyped(String),
}

/// Result alias for node operations.
pub type NodeResult<T> = Result<T, NodeError>;
