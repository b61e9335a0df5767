//! Use-case layer - business operations behind the GraphQL resolvers

pub mod author;
pub mod user;

use thiserror::Error;

use crate::db::DbError;

pub use author::AuthorInteractor;
pub use user::UserInteractor;

#[derive(Error, Debug)]
pub enum UsecaseError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error(transparent)]
    Repository(#[from] DbError),
}

pub type UsecaseResult<T> = Result<T, UsecaseError>;
