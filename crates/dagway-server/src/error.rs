use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("gateway configuration error: {0}")]
    Gateway(#[from] dagway_gateway::ConfigError),

    #[error("node error: {0}")]
    Node(#[from] dagway_store::NodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;
