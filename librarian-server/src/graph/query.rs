use async_graphql::{Context, Object, Result};

use super::model::{Book, User};
use super::{connection, not_implemented, usecase_error};
use crate::usecase::UserInteractor;

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// All users
    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        let conn = connection(ctx, "users")?;
        let users = UserInteractor::new(conn.client().users())
            .find_all()
            .await
            .map_err(usecase_error)?;
        Ok(users.into_iter().map(User::from).collect())
    }

    /// All books
    async fn books(&self) -> Result<Vec<Book>> {
        Err(not_implemented("books"))
    }
}
