use dagway_types::TypeError;

/// Outcome taxonomy of resolving a request.
///
/// `IsDirectory` is not a failure: it tells the controller to list the
/// directory or redirect to its index file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The path names a directory. Carries its URL-encoded content path.
    #[error("{0} is a directory")]
    IsDirectory(String),

    /// A sub-path segment (or the root) does not exist.
    #[error("{0}")]
    NoSuchLink(String),

    /// The leading segment is not a valid content identifier.
    #[error("{0}")]
    MalformedIdentifier(String),

    /// Stream failure, unexpected node error, or failed node startup.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// A sub-path segment that cannot be decoded names no link; everything
/// else wrong with a request path is a problem with its identifier.
impl From<TypeError> for GatewayError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidSegment(_) => Self::NoSuchLink(err.to_string()),
            other => Self::MalformedIdentifier(other.to_string()),
        }
    }
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_errors_are_malformed() {
        let err: GatewayError = TypeError::EmptyPath.into();
        assert_eq!(err, GatewayError::MalformedIdentifier("empty request path".into()));

        let err: GatewayError = TypeError::InvalidIdentifier("%FF".into()).into();
        assert!(matches!(err, GatewayError::MalformedIdentifier(_)));
    }

    #[test]
    fn bad_sub_path_segment_is_no_such_link() {
        let err: GatewayError = TypeError::InvalidSegment("..".into()).into();
        assert_eq!(err, GatewayError::NoSuchLink("invalid path segment: ..".into()));
    }

    #[test]
    fn display() {
        assert_eq!(
            GatewayError::IsDirectory("fabc/docs".into()).to_string(),
            "fabc/docs is a directory"
        );
        assert_eq!(GatewayError::internal("boom").to_string(), "internal error: boom");
    }
}
