//! Shared connection handle
//!
//! A [`ConnectionHandle`] wraps exactly one live client. The lifecycle's
//! disconnect hook keeps the only long-lived strong reference; everything
//! request-scoped holds a [`ConnectionRef`] and upgrades it per operation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;

use super::error::DbResult;
use crate::domain::{AuthorRepository, UserRepository};

/// A live database client.
///
/// Implementations must be safe for concurrent use; the handle adds no locking.
#[async_trait]
pub trait DatabaseClient: Send + Sync + 'static {
    /// Liveness probe
    async fn ping(&self) -> DbResult<()>;

    /// Close the client. Called at most once per handle.
    async fn disconnect(&self) -> DbResult<()>;

    fn authors(&self) -> Arc<dyn AuthorRepository>;

    fn users(&self) -> Arc<dyn UserRepository>;
}

struct Connection {
    client: Arc<dyn DatabaseClient>,
    descriptor: String,
    closed: AtomicBool,
}

/// Owning handle to the live client
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<Connection>,
}

impl ConnectionHandle {
    /// `descriptor` is the redacted connection URL used in log lines.
    pub fn new(client: Arc<dyn DatabaseClient>, descriptor: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Connection {
                client,
                descriptor: descriptor.into(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn client(&self) -> &dyn DatabaseClient {
        self.inner.client.as_ref()
    }

    pub fn descriptor(&self) -> &str {
        &self.inner.descriptor
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Non-owning reference for request contexts
    pub fn downgrade(&self) -> ConnectionRef {
        ConnectionRef {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether both handles wrap the same client.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Disconnect the client. Later calls return `Ok(())` without touching it.
    pub async fn disconnect(&self) -> DbResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.client.disconnect().await
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("descriptor", &self.inner.descriptor)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Borrowed view of a [`ConnectionHandle`] that never extends its lifetime
#[derive(Clone, Debug)]
pub struct ConnectionRef {
    inner: Weak<Connection>,
}

impl ConnectionRef {
    /// Returns `None` once the owning handle is gone or has been disconnected.
    pub fn upgrade(&self) -> Option<ConnectionHandle> {
        let inner = self.inner.upgrade()?;
        if inner.closed.load(Ordering::Acquire) {
            return None;
        }
        Some(ConnectionHandle { inner })
    }
}
