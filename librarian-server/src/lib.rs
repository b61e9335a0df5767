//! librarian-server: GraphQL service over a single shared MongoDB client
//!
//! The client is built once at startup, bound into each request's context
//! by middleware, and disconnected once when the lifecycle stops.

pub mod config;
pub mod context;
pub mod db;
pub mod domain;
pub mod graph;
pub mod http;
pub mod lifecycle;
pub mod usecase;

pub use config::{ConfigError, DatabaseConfig};
pub use context::ContextError;
pub use db::{ConnectionFactory, ConnectionHandle, DbError, MongoConnector};
pub use http::{ServerConfig, ServerError, Service};
pub use lifecycle::{Lifecycle, LifecycleState};
