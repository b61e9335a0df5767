//! Connection factory - builds the single shared handle at startup
//!
//! Any error from [`ConnectionFactory::create`] is a fatal startup error:
//! the caller must not start accepting traffic.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::error::{DbError, DbResult};
use super::handle::{ConnectionHandle, DatabaseClient};
use crate::config::{redact_url, DatabaseConfig};
use crate::lifecycle::{HookError, Lifecycle};

/// Opens a client for a connection string.
///
/// Implementations should not probe the server; the factory does that.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        config: &DatabaseConfig,
    ) -> DbResult<Arc<dyn DatabaseClient>>;
}

pub struct ConnectionFactory<C> {
    connector: C,
}

impl<C: Connector> ConnectionFactory<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    /// Connect, probe, and register the disconnect hook.
    ///
    /// The probe is bounded by `config.probe_timeout`. Exactly one
    /// `on_stop` hook is registered, and only on success.
    ///
    /// # Errors
    ///
    /// Configuration, connect and probe failures. None of them are retried.
    pub async fn create(
        &self,
        config: &DatabaseConfig,
        lifecycle: &Lifecycle,
    ) -> DbResult<ConnectionHandle> {
        let url = config.connection_url()?;
        let descriptor = redact_url(&url);

        let client = self.connector.connect(&url, config).await?;

        match tokio::time::timeout(config.probe_timeout, client.ping()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(DbError::ProbeTimeout {
                    url: descriptor,
                    timeout: config.probe_timeout,
                })
            }
        }

        info!(url = %descriptor, authenticated = config.has_credentials(), "connected to database");

        let handle = ConnectionHandle::new(client, descriptor);

        let owned = handle.clone();
        lifecycle.on_stop("database", move || async move {
            info!(url = %owned.descriptor(), "disconnecting database");
            owned.disconnect().await.map_err(HookError::from)
        });

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::db::memory::{MemoryClient, MemoryConnector};
    use crate::lifecycle::LifecycleState;

    fn lifecycle() -> Lifecycle {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start().unwrap();
        lifecycle
    }

    #[tokio::test]
    async fn connects_probes_and_registers_one_hook() {
        let connector = MemoryConnector::reachable();
        let lifecycle = lifecycle();
        let config = DatabaseConfig {
            user: "a".into(),
            password: "b".into(),
            ..DatabaseConfig::with_address("db", "27017")
        };

        let handle = ConnectionFactory::new(connector.clone())
            .create(&config, &lifecycle)
            .await
            .unwrap();

        assert_eq!(connector.last_url().as_deref(), Some("mongodb://a:b@db:27017"));
        assert_eq!(handle.descriptor(), "mongodb://a:***@db:27017");
        assert_eq!(connector.client().ping_count(), 1);
        assert_eq!(lifecycle.hook_count(), 1);
    }

    #[tokio::test]
    async fn unreachable_database_is_fatal_and_registers_nothing() {
        let connector = MemoryConnector::unreachable();
        let lifecycle = lifecycle();

        let err = ConnectionFactory::new(connector)
            .create(&DatabaseConfig::default(), &lifecycle)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Unreachable { .. }));
        assert!(err.is_startup_failure());
        assert_eq!(lifecycle.hook_count(), 0);
    }

    #[tokio::test]
    async fn bad_config_never_reaches_the_connector() {
        let connector = MemoryConnector::reachable();
        let config = DatabaseConfig::with_address("db", "not-a-port");

        let err = ConnectionFactory::new(connector.clone())
            .create(&config, &lifecycle())
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Config(ConfigError::InvalidPort { .. })));
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test]
    async fn stop_disconnects_exactly_once() {
        let connector = MemoryConnector::reachable();
        let lifecycle = lifecycle();
        let handle = ConnectionFactory::new(connector.clone())
            .create(&DatabaseConfig::default(), &lifecycle)
            .await
            .unwrap();
        let weak = handle.downgrade();
        drop(handle);

        lifecycle.stop().await;
        lifecycle.stop().await;

        assert_eq!(connector.client().disconnect_count(), 1);
        assert!(weak.upgrade().is_none());
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn disconnect_failure_still_completes_shutdown() {
        let connector = MemoryConnector::new(MemoryClient::failing_disconnect());
        let lifecycle = lifecycle();
        ConnectionFactory::new(connector.clone())
            .create(&DatabaseConfig::default(), &lifecycle)
            .await
            .unwrap();

        lifecycle.stop().await;

        assert_eq!(connector.client().disconnect_count(), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }
}
