use async_graphql::{Context, Object, Result};

use super::model::{Author, Book, NewAuthor, NewBook, NewUser, User};
use super::{connection, not_implemented, usecase_error};
use crate::usecase::AuthorInteractor;

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_user(&self, #[graphql(name = "input")] _input: NewUser) -> Result<User> {
        Err(not_implemented("createUser"))
    }

    async fn create_book(&self, #[graphql(name = "input")] _input: NewBook) -> Result<Book> {
        Err(not_implemented("createBook"))
    }

    /// Register an author
    async fn create_author(&self, ctx: &Context<'_>, input: NewAuthor) -> Result<Author> {
        let conn = connection(ctx, "createAuthor")?;
        let author = AuthorInteractor::new(conn.client().authors())
            .create_author(&input.name)
            .await
            .map_err(usecase_error)?;
        Ok(author.into())
    }
}
