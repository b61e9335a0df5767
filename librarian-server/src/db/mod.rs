//! Database layer - connection factory, shared handle, client backends
//!
//! # Design Principles
//!
//! - One client per process, built and probed before traffic is accepted
//! - No global client: handlers reach it through the request context
//! - The lifecycle owns the handle; contexts hold weak references
//! - Disconnect happens once, from the lifecycle's shutdown path

pub mod error;
pub mod factory;
pub mod handle;
pub mod memory;
pub mod mongo;

pub use error::{DbError, DbResult};
pub use factory::{ConnectionFactory, Connector};
pub use handle::{ConnectionHandle, ConnectionRef, DatabaseClient};
pub use memory::{MemoryClient, MemoryConnector};
pub use mongo::MongoConnector;
