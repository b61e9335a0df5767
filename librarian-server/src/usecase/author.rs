use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use super::{UsecaseError, UsecaseResult};
use crate::domain::{Author, AuthorRepository};

pub struct AuthorInteractor {
    repository: Arc<dyn AuthorRepository>,
}

impl AuthorInteractor {
    pub fn new(repository: Arc<dyn AuthorRepository>) -> Self {
        Self { repository }
    }

    /// Persist a new author under a generated id.
    pub async fn create_author(&self, name: &str) -> UsecaseResult<Author> {
        let name = name.trim();
        if name.is_empty() {
            return Err(UsecaseError::InvalidInput("author name must not be empty"));
        }

        let author = Author {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };

        if let Err(err) = self.repository.save_author(&author).await {
            error!(error = %err, "failed to save author");
            return Err(err.into());
        }

        info!(author_id = %author.id, "author created");
        Ok(author)
    }
}
