use std::sync::Arc;

use tracing::debug;

use super::UsecaseResult;
use crate::domain::{User, UserRepository};

pub struct UserInteractor {
    repository: Arc<dyn UserRepository>,
}

impl UserInteractor {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn find_all(&self) -> UsecaseResult<Vec<User>> {
        let users = self.repository.find_all().await?;
        debug!(count = users.len(), "loaded users");
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseClient, MemoryClient};

    #[tokio::test]
    async fn returns_every_user() {
        let users = vec![
            User { id: "1".into(), name: "ada".into() },
            User { id: "2".into(), name: "grace".into() },
        ];
        let client = MemoryClient::with_users(users.clone());

        let found = UserInteractor::new(client.users()).find_all().await.unwrap();
        assert_eq!(found, users);
    }
}
