//! In-memory database client
//!
//! Stands in for MongoDB in tests and local runs. Counters make
//! connect/ping/disconnect observable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::error::{DbError, DbResult};
use super::factory::Connector;
use super::handle::DatabaseClient;
use crate::config::DatabaseConfig;
use crate::domain::{Author, AuthorRepository, User, UserRepository};

#[derive(Default)]
struct Store {
    authors: Mutex<Vec<Author>>,
    users: Mutex<Vec<User>>,
    // Reads never complete
    stall_reads: bool,
    stalled_reads: AtomicUsize,
}

/// Client backed by process memory
#[derive(Default)]
pub struct MemoryClient {
    store: Arc<Store>,
    unreachable: bool,
    fail_disconnect: bool,
    pings: AtomicUsize,
    disconnects: AtomicUsize,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client seeded with users
    pub fn with_users(users: Vec<User>) -> Self {
        let client = Self::default();
        *lock(&client.store.users) = users;
        client
    }

    /// Client whose ping always fails
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Client whose user reads hang forever
    pub fn stalled() -> Self {
        Self {
            store: Arc::new(Store {
                stall_reads: true,
                ..Store::default()
            }),
            ..Self::default()
        }
    }

    /// Client whose disconnect always fails
    pub fn failing_disconnect() -> Self {
        Self {
            fail_disconnect: true,
            ..Self::default()
        }
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Reads currently hanging on a [`MemoryClient::stalled`] client
    pub fn stalled_reads(&self) -> usize {
        self.store.stalled_reads.load(Ordering::SeqCst)
    }

    pub fn authors_snapshot(&self) -> Vec<Author> {
        lock(&self.store.authors).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl DatabaseClient for MemoryClient {
    async fn ping(&self) -> DbResult<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(DbError::Unreachable {
                url: "memory://".into(),
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(DbError::Disconnect("simulated disconnect failure".into()));
        }
        Ok(())
    }

    fn authors(&self) -> Arc<dyn AuthorRepository> {
        Arc::new(MemoryRepository {
            store: Arc::clone(&self.store),
        })
    }

    fn users(&self) -> Arc<dyn UserRepository> {
        Arc::new(MemoryRepository {
            store: Arc::clone(&self.store),
        })
    }
}

struct MemoryRepository {
    store: Arc<Store>,
}

#[async_trait]
impl AuthorRepository for MemoryRepository {
    async fn save_author(&self, author: &Author) -> DbResult<()> {
        lock(&self.store.authors).push(author.clone());
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_all(&self) -> DbResult<Vec<User>> {
        if self.store.stall_reads {
            self.store.stalled_reads.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }
        Ok(lock(&self.store.users).clone())
    }
}

/// Connector that hands out one prepared [`MemoryClient`]
#[derive(Clone)]
pub struct MemoryConnector {
    client: Arc<MemoryClient>,
    connects: Arc<AtomicUsize>,
    last_url: Arc<Mutex<Option<String>>>,
}

impl MemoryConnector {
    pub fn new(client: MemoryClient) -> Self {
        Self {
            client: Arc::new(client),
            connects: Arc::new(AtomicUsize::new(0)),
            last_url: Arc::new(Mutex::new(None)),
        }
    }

    pub fn reachable() -> Self {
        Self::new(MemoryClient::new())
    }

    pub fn unreachable() -> Self {
        Self::new(MemoryClient::unreachable())
    }

    /// The client every successful connect returns
    pub fn client(&self) -> Arc<MemoryClient> {
        Arc::clone(&self.client)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// URL passed to the most recent connect
    pub fn last_url(&self) -> Option<String> {
        lock(&self.last_url).clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(
        &self,
        url: &str,
        _config: &DatabaseConfig,
    ) -> DbResult<Arc<dyn DatabaseClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_url) = Some(url.to_string());
        let client: Arc<dyn DatabaseClient> = self.client.clone();
        Ok(client)
    }
}
