//! HTTP server layer
//!
//! Axum server with:
//! - Connection binding middleware on every route
//! - CORS (localhost only by default)
//! - Request tracing
//! - Graceful shutdown with a bounded drain

pub mod middleware;
pub mod routes;
pub mod server;

pub use server::{build_router, shutdown_signal, AppState, ServerConfig, ServerError, Service};
