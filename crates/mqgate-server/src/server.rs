//! `GatewayServer` — listener wiring and orchestration.
//!
//! Owns the shared state, builds the Axum router for the framed side,
//! binds both listeners, and starts the engine-event pump. Shutdown is
//! ordered: cancel the token (listeners and pump stop, no new sessions or
//! fan-out records), close the engine, then drain the task handles.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use mqgate_core::{ConnectionIdAllocator, ProtocolEngine};
use mqgate_fanout::{EventFanout, EventPump};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::GatewayConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::{tcp, ws};

/// Gateway startup failure.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A listener could not bind its address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Listener I/O error outside of binding.
    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state accessible from Axum handlers and listener tasks.
#[derive(Clone)]
pub struct AppState {
    /// The protocol engine sessions are handed to.
    pub engine: Arc<dyn ProtocolEngine>,
    /// Observer fan-out set.
    pub fanout: Arc<EventFanout>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Connection id allocator shared by all listeners.
    pub ids: Arc<ConnectionIdAllocator>,
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// When the gateway started.
    pub start_time: Instant,
}

/// The gateway orchestrator.
pub struct GatewayServer {
    state: AppState,
}

impl GatewayServer {
    /// Create a gateway around an engine.
    pub fn new(config: GatewayConfig, engine: Arc<dyn ProtocolEngine>) -> Self {
        Self {
            state: AppState {
                engine,
                fanout: Arc::new(EventFanout::new()),
                shutdown: Arc::new(ShutdownCoordinator::new()),
                ids: Arc::new(ConnectionIdAllocator::new()),
                config: Arc::new(config),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the Axum router for the framed listener.
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Shared state handle.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Shutdown coordinator handle.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Bind the enabled listeners and start the event pump.
    ///
    /// Returns once everything is listening; the gateway then runs until
    /// [`RunningGateway::stop`] is called.
    pub async fn start(self) -> Result<RunningGateway, ServerError> {
        let state = self.state;
        let token = state.shutdown.token();
        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        let pump = EventPump::new(state.engine.events(), Arc::clone(&state.fanout));
        handles.push(tokio::spawn(pump.run(token.clone())));

        let tcp_addr = if state.config.tcp.enabled {
            let addr = state.config.tcp.bind_addr();
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|source| ServerError::Bind { addr, source })?;
            let local = listener.local_addr()?;
            handles.push(tokio::spawn(tcp::run_tcp_listener(
                listener,
                state.clone(),
                token.clone(),
            )));
            Some(local)
        } else {
            None
        };

        let ws_addr = if state.config.ws.enabled {
            let addr = state.config.ws.bind_addr();
            let listener = TcpListener::bind(&addr)
                .await
                .map_err(|source| ServerError::Bind { addr, source })?;
            let local = listener.local_addr()?;
            info!(addr = %local, "framed listener ready");

            let router = build_router(state.clone());
            let serve_token = token.clone();
            handles.push(tokio::spawn(async move {
                let server = axum::serve(listener, router)
                    .with_graceful_shutdown(serve_token.cancelled_owned());
                if let Err(err) = server.await {
                    error!(%err, "framed listener failed");
                }
            }));
            Some(local)
        } else {
            None
        };

        Ok(RunningGateway {
            tcp_addr,
            ws_addr,
            state,
            handles,
        })
    }
}

/// A started gateway: bound addresses plus the handles needed to stop it.
pub struct RunningGateway {
    /// Bound byte-stream listener address, if enabled.
    pub tcp_addr: Option<SocketAddr>,
    /// Bound framed listener address, if enabled.
    pub ws_addr: Option<SocketAddr>,
    state: AppState,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for RunningGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningGateway")
            .field("tcp_addr", &self.tcp_addr)
            .field("ws_addr", &self.ws_addr)
            .finish_non_exhaustive()
    }
}

impl RunningGateway {
    /// Shared state handle.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Stop the gateway in order: cancel intake, close the engine, drain
    /// tasks. No fan-out record is produced for events after cancellation.
    pub async fn stop(self, timeout: Option<Duration>) {
        info!("gateway stopping");
        self.state.shutdown.shutdown();
        self.state.engine.close().await;
        self.state.shutdown.drain(self.handles, timeout).await;
        info!("gateway stopped");
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/mqtt", get(ws::broker_handler))
        .route("/events", get(ws::observer_handler))
        .with_state(state)
}

/// GET /
async fn index_handler() -> &'static str {
    "mqgate broker gateway: /mqtt (broker sessions), /events (observers), /health"
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let observers = state.fanout.observer_count().await;
    Json(health::health_check(state.start_time, observers))
}
