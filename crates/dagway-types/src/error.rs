use thiserror::Error;

/// Errors produced while parsing identifiers and request paths.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid multihash: missing multibase prefix")]
    MissingMultibase,

    #[error("invalid multihash: unsupported multibase prefix '{0}'")]
    UnsupportedMultibase(char),

    #[error("invalid multihash: {0}")]
    InvalidHex(String),

    #[error("invalid multihash: unsupported CID version {0}")]
    UnsupportedVersion(u8),

    #[error("invalid multihash: unknown codec 0x{0:02x}")]
    UnknownCodec(u8),

    #[error("invalid multihash: unsupported hash function 0x{0:02x}")]
    UnsupportedHash(u8),

    #[error("invalid multihash: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid multihash: undecodable identifier {0}")]
    InvalidIdentifier(String),

    #[error("empty request path")]
    EmptyPath,

    #[error("invalid path segment: {0}")]
    InvalidSegment(String),
}
