//! GraphQL schema and resolvers
//!
//! Resolvers never hold a client of their own: each one resolves the
//! connection bound to the current request and hands its repositories to
//! the use-case layer.

pub mod model;
pub mod mutation;
pub mod query;

use async_graphql::{Context, EmptySubscription, Error, ErrorExtensions, Schema};
use tracing::{error, warn};

use crate::context;
use crate::db::ConnectionHandle;
use crate::usecase::UsecaseError;

pub use mutation::MutationRoot;
pub use query::QueryRoot;

pub type LibrarianSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema() -> LibrarianSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}

/// Schema Definition Language for the API
pub fn export_schema_sdl() -> String {
    build_schema().sdl()
}

fn connection(ctx: &Context<'_>, field: &'static str) -> Result<ConnectionHandle, Error> {
    context::resolve_graphql(ctx).map_err(|err| {
        if !err.is_defect() {
            warn!(field, reason = %err, "database unavailable for field");
        }
        Error::new(format!("{field} unavailable: {err}"))
            .extend_with(|_, ext| ext.set("code", err.code()))
    })
}

fn not_implemented(field: &'static str) -> Error {
    Error::new(format!("not implemented: {field}"))
        .extend_with(|_, ext| ext.set("code", "NOT_IMPLEMENTED"))
}

fn usecase_error(err: UsecaseError) -> Error {
    match err {
        UsecaseError::InvalidInput(reason) => {
            Error::new(reason).extend_with(|_, ext| ext.set("code", "BAD_USER_INPUT"))
        }
        UsecaseError::Repository(err) => {
            error!(error = %err, "repository error");
            Error::new("an internal error occurred")
                .extend_with(|_, ext| ext.set("code", "INTERNAL"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_graphql::{Request, Response, Value};
    use axum::http::Extensions;

    use super::*;
    use crate::db::{ConnectionRef, MemoryClient};
    use crate::domain;

    fn bound(connection: Option<&ConnectionRef>) -> context::Binding {
        context::binding(&context::bind(&Extensions::new(), connection)).unwrap()
    }

    fn error_code(response: &Response) -> Option<String> {
        let extensions = response.errors.first()?.extensions.as_ref()?;
        match extensions.get("code")? {
            Value::String(code) => Some(code.clone()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn users_resolve_through_the_bound_connection() {
        let client = Arc::new(MemoryClient::with_users(vec![domain::User {
            id: "u1".into(),
            name: "ada".into(),
        }]));
        let handle = ConnectionHandle::new(client, "memory://test");

        let response = build_schema()
            .execute(Request::new("{ users { id name } }").data(bound(Some(&handle.downgrade()))))
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let data = serde_json::to_value(&response.data).unwrap();
        assert_eq!(data, serde_json::json!({ "users": [{ "id": "u1", "name": "ada" }] }));
    }

    #[tokio::test]
    async fn missing_binding_is_reported_as_a_defect() {
        let response = build_schema().execute("{ users { id } }").await;
        assert_eq!(error_code(&response).as_deref(), Some("MISSING_CONNECTION"));
    }

    #[tokio::test]
    async fn unconfigured_database_degrades_gracefully() {
        let response = build_schema()
            .execute(Request::new("{ users { id } }").data(bound(None)))
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("DATABASE_NOT_CONFIGURED"));
        assert!(response.errors[0].message.contains("connection not configured"));
    }

    #[tokio::test]
    async fn create_author_persists_through_use_case() {
        let client = Arc::new(MemoryClient::new());
        let handle = ConnectionHandle::new(client.clone(), "memory://test");

        let response = build_schema()
            .execute(
                Request::new(r#"mutation { createAuthor(input: { name: "Octavia Butler" }) { id name } }"#)
                    .data(bound(Some(&handle.downgrade()))),
            )
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let saved = client.authors_snapshot();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "Octavia Butler");
    }

    #[tokio::test]
    async fn blank_author_name_is_bad_input() {
        let handle = ConnectionHandle::new(Arc::new(MemoryClient::new()), "memory://test");
        let response = build_schema()
            .execute(
                Request::new(r#"mutation { createAuthor(input: { name: " " }) { id } }"#)
                    .data(bound(Some(&handle.downgrade()))),
            )
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("BAD_USER_INPUT"));
    }

    #[tokio::test]
    async fn unimplemented_fields_return_errors() {
        let schema = build_schema();

        let response = schema.execute("{ books { id } }").await;
        assert_eq!(response.errors[0].message, "not implemented: books");

        let response = schema
            .execute(r#"mutation { createUser(input: { name: "x" }) { id } }"#)
            .await;
        assert_eq!(error_code(&response).as_deref(), Some("NOT_IMPLEMENTED"));
    }

    #[test]
    fn sdl_lists_every_root_field() {
        let sdl = export_schema_sdl();
        for field in ["users", "books", "createUser", "createBook", "createAuthor"] {
            assert!(sdl.contains(field), "missing {field} in SDL");
        }
        assert!(sdl.contains("createUser(input: NewUser!)"));
        assert!(sdl.contains("createBook(input: NewBook!)"));
    }
}
