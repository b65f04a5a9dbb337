use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use dagway_store::{ContentNode, NodeResult};

use crate::error::{GatewayError, GatewayResult};

/// Creates the content node on first use.
#[async_trait]
pub trait NodeFactory: Send + Sync {
    async fn start(&self) -> NodeResult<Arc<dyn ContentNode>>;
}

type InitOutcome = Result<Arc<dyn ContentNode>, String>;

enum NodeState {
    Uninitialized(Arc<dyn NodeFactory>),
    Initializing(watch::Receiver<Option<InitOutcome>>),
    Ready(Arc<dyn ContentNode>),
    Failed(String),
}

/// Observable lifecycle stage of a [`NodeHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Process-wide, lazily started content node.
///
/// Lifecycle: `Uninitialized -> Initializing -> Ready | Failed`. The first
/// caller of [`NodeHandle::get`] spawns a single initialization task; every
/// caller arriving before it finishes awaits the same outcome. The factory
/// runs at most once, and a failure is final for the life of the handle.
pub struct NodeHandle {
    state: Arc<Mutex<NodeState>>,
}

impl NodeHandle {
    /// A handle that starts its node through `factory` on first use.
    pub fn lazy(factory: Arc<dyn NodeFactory>) -> Self {
        Self {
            state: Arc::new(Mutex::new(NodeState::Uninitialized(factory))),
        }
    }

    /// A handle around a node that is already running.
    pub fn ready(node: Arc<dyn ContentNode>) -> Self {
        Self {
            state: Arc::new(Mutex::new(NodeState::Ready(node))),
        }
    }

    pub fn status(&self) -> NodeStatus {
        match &*self.state.lock().expect("node state lock poisoned") {
            NodeState::Uninitialized(_) => NodeStatus::Uninitialized,
            NodeState::Initializing(_) => NodeStatus::Initializing,
            NodeState::Ready(_) => NodeStatus::Ready,
            NodeState::Failed(_) => NodeStatus::Failed,
        }
    }

    /// The running node, starting it if needed.
    pub async fn get(&self) -> GatewayResult<Arc<dyn ContentNode>> {
        let mut rx = {
            let mut state = self.state.lock().expect("node state lock poisoned");
            match &*state {
                NodeState::Ready(node) => return Ok(Arc::clone(node)),
                NodeState::Failed(cause) => return Err(init_failed(cause)),
                NodeState::Initializing(rx) => rx.clone(),
                NodeState::Uninitialized(factory) => {
                    let factory = Arc::clone(factory);
                    let (tx, rx) = watch::channel(None);
                    *state = NodeState::Initializing(rx.clone());
                    self.spawn_init(factory, tx);
                    rx
                }
            }
        };

        let outcome = {
            let settled = rx
                .wait_for(Option::is_some)
                .await
                .map_err(|_| GatewayError::internal("node initialization was abandoned"))?;
            (*settled).clone()
        };
        match outcome {
            Some(Ok(node)) => Ok(node),
            Some(Err(cause)) => Err(init_failed(&cause)),
            None => Err(GatewayError::internal("node initialization was abandoned")),
        }
    }

    fn spawn_init(&self, factory: Arc<dyn NodeFactory>, tx: watch::Sender<Option<InitOutcome>>) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            // A panicking factory must still settle the state.
            let started = tokio::spawn(async move {
                let node = factory.start().await.map_err(|e| e.to_string())?;
                node.ready().await.map_err(|e| e.to_string())?;
                Ok::<_, String>(node)
            });
            let outcome = match started.await {
                Ok(outcome) => outcome,
                Err(err) => Err(format!("node startup aborted: {err}")),
            };
            match &outcome {
                Ok(_) => info!("content node ready"),
                Err(cause) => warn!(%cause, "content node failed to start"),
            }
            {
                let mut state = state.lock().expect("node state lock poisoned");
                *state = match &outcome {
                    Ok(node) => NodeState::Ready(Arc::clone(node)),
                    Err(cause) => NodeState::Failed(cause.clone()),
                };
            }
            tx.send_replace(Some(outcome));
        });
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("status", &self.status())
            .finish()
    }
}

fn init_failed(cause: &str) -> GatewayError {
    GatewayError::Internal(format!("node initialization failed: {cause}"))
}
