//! Axum-based RPC server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use ideas_ledger::SharedLedger;
use ideas_store::ContentStore;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::RpcError;
use crate::metrics::ApiMetrics;
use crate::routes::create_router;

/// Everything a handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
    pub content: Arc<dyn ContentStore>,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(ledger: SharedLedger, content: Arc<dyn ContentStore>) -> Self {
        Self {
            ledger,
            content,
            metrics: Arc::new(ApiMetrics::new()),
        }
    }
}

pub struct RpcServer {
    pub addr: SocketAddr,
    pub enable_cors: bool,
}

impl RpcServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            enable_cors: false,
        }
    }

    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// The full router with tracing and, when enabled, permissive CORS.
    pub fn router(&self, state: AppState) -> Router {
        let router = create_router(state).layer(TraceLayer::new_for_http());
        if self.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Serve until the listener fails.
    pub async fn start(&self, state: AppState) -> Result<(), RpcError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {}: {e}", self.addr)))?;
        info!(addr = %self.addr, "RPC server listening");
        axum::serve(listener, self.router(state))
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }

    /// Bind, then serve on a background task. Returns the bound address,
    /// which differs from the configured one when the port is 0.
    pub async fn start_background(&self, state: AppState) -> Result<SocketAddr, RpcError> {
        let (bound, _) = self
            .start_until(state, std::future::pending::<()>())
            .await?;
        Ok(bound)
    }

    /// Bind, then serve on a background task until `shutdown` resolves.
    ///
    /// The listener closes as soon as `shutdown` fires; the returned handle
    /// completes once in-flight requests have been answered.
    pub async fn start_until<F>(
        &self,
        state: AppState,
        shutdown: F,
    ) -> Result<(SocketAddr, JoinHandle<()>), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {}: {e}", self.addr)))?;
        let bound = listener
            .local_addr()
            .map_err(|e| RpcError::Server(e.to_string()))?;
        let router = self.router(state);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "RPC server stopped");
            }
            info!(addr = %bound, "RPC server drained");
        });
        info!(addr = %bound, "RPC server listening");
        Ok((bound, handle))
    }
}
