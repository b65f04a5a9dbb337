//! HTTP server for dagway.
//!
//! Mounts the gateway under its reserved prefix. `/health` and `/info` are
//! answered directly; any other path outside the prefix gets a plain 404.

pub mod config;
pub mod error;
pub mod handler;
pub mod node;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use node::DirectoryNodeFactory;
pub use server::DagwayServer;
