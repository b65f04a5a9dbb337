use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use dagway_gateway::{Gateway, NodeHandle};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::node::DirectoryNodeFactory;
use crate::router::build_router;

/// dagway HTTP server.
pub struct DagwayServer {
    config: ServerConfig,
    gateway: Arc<Gateway>,
}

impl DagwayServer {
    /// A server whose node is imported from `config.root` on first request.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let factory = DirectoryNodeFactory::new(config.root.clone(), config.stream.clone());
        let node = Arc::new(NodeHandle::lazy(Arc::new(factory)));
        Self::with_node(config, node)
    }

    /// A server backed by an existing node handle.
    pub fn with_node(config: ServerConfig, node: Arc<NodeHandle>) -> ServerResult<Self> {
        let gateway = Gateway::new(config.gateway.clone(), node)?;
        Ok(Self {
            config,
            gateway: Arc::new(gateway),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let state = AppState {
            gateway: Arc::clone(&self.gateway),
        };
        build_router(state, self.config.allow_any_origin)
    }

    /// Start serving requests until the process is interrupted.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        tracing::info!(
            addr = %listener.local_addr()?,
            prefix = %self.gateway.config().mount_point(),
            "dagway listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

impl std::fmt::Debug for DagwayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagwayServer")
            .field("bind_addr", &self.config.bind_addr)
            .field("gateway", &self.gateway)
            .finish()
    }
}
