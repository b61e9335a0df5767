//! Axum server setup and process lifecycle
//!
//! Startup order: database connect + probe, middleware installation,
//! listener bind, `Running`. Shutdown order: stop accepting, drain
//! in-flight requests (bounded), run lifecycle hooks (database disconnect).

use std::future::{Future, IntoFuture};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::middleware::bind_connection;
use super::routes;
use crate::config::DatabaseConfig;
use crate::db::{ConnectionFactory, ConnectionHandle, ConnectionRef, Connector, DbError};
use crate::graph::{build_schema, LibrarianSchema};
use crate::lifecycle::{Lifecycle, LifecycleError, LifecycleState, ServingGuard};

/// Default bound on draining in-flight requests at shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = localhost only)
    pub cors_permissive: bool,

    /// How long in-flight requests may run after shutdown begins
    pub drain_timeout: Duration,

    pub database: DatabaseConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_permissive: false,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            database: DatabaseConfig::default(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub schema: LibrarianSchema,
    pub lifecycle: Lifecycle,
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Build the router with the connection middleware applied to every route.
pub fn build_router(
    state: AppState,
    connection: Option<ConnectionRef>,
    cors_permissive: bool,
) -> Router {
    let cors = if cors_permissive {
        warn!("CORS: Permissive mode enabled - all origins allowed");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin([
                axum::http::HeaderValue::from_static("http://localhost:8080"),
                axum::http::HeaderValue::from_static("http://127.0.0.1:8080"),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .merge(routes::health::router())
        .merge(routes::graphql::router())
        .layer(axum::middleware::from_fn_with_state(connection, bind_connection))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A started service: database probed, listener bound, state `Running`.
pub struct Service {
    lifecycle: Lifecycle,
    listener: TcpListener,
    router: Router,
    drain_timeout: Duration,
    serving: ServingGuard,
}

impl Service {
    /// Run every startup step. Any error is fatal; nothing is served.
    ///
    /// # Errors
    ///
    /// Database configuration/connect/probe failures, bind failures, and
    /// a `lifecycle` that was already started.
    pub async fn start<C: Connector>(
        config: &ServerConfig,
        connector: C,
        lifecycle: Lifecycle,
    ) -> Result<Self, ServerError> {
        lifecycle.begin_start()?;

        let handle = if config.database.enabled {
            match ConnectionFactory::new(connector)
                .create(&config.database, &lifecycle)
                .await
            {
                Ok(handle) => Some(handle),
                Err(err) => {
                    error!(error = %err, fatal = err.is_startup_failure(), "database startup failed");
                    return Err(err.into());
                }
            }
        } else {
            warn!("database disabled; serving without a connection");
            None
        };

        // The lifecycle's disconnect hook keeps the only strong reference.
        let connection = handle.as_ref().map(ConnectionHandle::downgrade);
        drop(handle);

        let state = AppState {
            schema: build_schema(),
            lifecycle: lifecycle.clone(),
        };
        let router = build_router(state, connection, config.cors_permissive);

        let listener = match TcpListener::bind(config.bind_addr).await {
            Ok(listener) => listener,
            Err(err) => {
                error!(addr = %config.bind_addr, error = %err, "failed to bind listener");
                lifecycle.stop().await;
                return Err(err.into());
            }
        };

        // Taken before `Running` so no stop can slip in between.
        let serving = lifecycle.serving_guard();
        lifecycle.mark_running()?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self {
            serving,
            lifecycle,
            listener,
            router,
            drain_timeout: config.drain_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Serve until `shutdown` resolves or the lifecycle starts stopping.
    ///
    /// In-flight requests get `drain_timeout` to finish; the lifecycle's
    /// hooks run afterwards either way, once the listener is closed.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            lifecycle,
            listener,
            router,
            drain_timeout,
            serving,
        } = self;

        let trigger = lifecycle.clone();
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            tokio::select! {
                () = shutdown => {}
                () = trigger.wait_for(LifecycleState::Stopping) => {}
            }
            if let Err(err) = trigger.begin_stop() {
                warn!(error = %err, "unexpected lifecycle state at shutdown");
            }
        });

        let drain_deadline = async {
            lifecycle.wait_for(LifecycleState::Stopping).await;
            tokio::time::sleep(drain_timeout).await;
        };

        let result = tokio::select! {
            result = server.into_future() => result.map_err(ServerError::from),
            () = drain_deadline => {
                warn!(timeout = ?drain_timeout, "drain timeout elapsed, abandoning in-flight requests");
                Ok(())
            }
        };

        drop(serving);
        lifecycle.stop().await;
        info!("Server shutdown complete");
        result
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting shutdown");
        }
    }
}
