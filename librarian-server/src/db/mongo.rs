//! MongoDB client and repositories
//!
//! The driver's `Client` pools connections internally and is cheap to
//! clone, so repositories hold their own `Collection` clones.

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};

use super::error::{DbError, DbResult};
use super::factory::Connector;
use super::handle::DatabaseClient;
use crate::config::{redact_url, DatabaseConfig};
use crate::domain::{Author, AuthorRepository, User, UserRepository};

/// Database used when the connection string names none
const DEFAULT_DATABASE: &str = "librarian";
const AUTHORS: &str = "authors";
const USERS: &str = "users";

/// Builds [`MongoClient`]s with the official driver
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(
        &self,
        url: &str,
        config: &DatabaseConfig,
    ) -> DbResult<Arc<dyn DatabaseClient>> {
        let mut options = ClientOptions::parse(url)
            .await
            .map_err(|e| DbError::Connect {
                url: redact_url(url),
                reason: e.to_string(),
            })?;
        options.server_selection_timeout = Some(config.probe_timeout);
        if options.app_name.is_none() {
            options.app_name = config.app_name.clone();
        }

        let database = options
            .default_database
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let client = Client::with_options(options).map_err(|e| DbError::Connect {
            url: redact_url(url),
            reason: e.to_string(),
        })?;

        let client: Arc<dyn DatabaseClient> = Arc::new(MongoClient {
            database: client.database(&database),
            client,
            url: redact_url(url),
        });
        Ok(client)
    }
}

/// Live MongoDB client plus the application database
pub struct MongoClient {
    client: Client,
    database: Database,
    url: String,
}

#[async_trait]
impl DatabaseClient for MongoClient {
    async fn ping(&self) -> DbResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(|e| DbError::Unreachable {
                url: self.url.clone(),
                reason: e.to_string(),
            })
    }

    async fn disconnect(&self) -> DbResult<()> {
        // In-flight operations were given the drain window already.
        self.client.clone().shutdown().immediate(true).await;
        Ok(())
    }

    fn authors(&self) -> Arc<dyn AuthorRepository> {
        Arc::new(MongoAuthorRepository {
            collection: self.database.collection(AUTHORS),
        })
    }

    fn users(&self) -> Arc<dyn UserRepository> {
        Arc::new(MongoUserRepository {
            collection: self.database.collection(USERS),
        })
    }
}

struct MongoAuthorRepository {
    collection: Collection<Author>,
}

#[async_trait]
impl AuthorRepository for MongoAuthorRepository {
    async fn save_author(&self, author: &Author) -> DbResult<()> {
        self.collection.insert_one(author).await?;
        Ok(())
    }
}

struct MongoUserRepository {
    collection: Collection<User>,
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn find_all(&self) -> DbResult<Vec<User>> {
        let cursor = self.collection.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }
}
