//! Domain records and the repository seams the use-case layer depends on

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::DbError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// Author persistence
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn save_author(&self, author: &Author) -> Result<(), DbError>;
}

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<User>, DbError>;
}
