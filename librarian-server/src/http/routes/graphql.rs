//! GraphQL endpoint
//!
//! `POST /graphql` executes a request; `GET /graphql` serves GraphiQL.

use async_graphql::http::GraphiQLSource;
use axum::extract::State;
use axum::http::Extensions;
use axum::response::Html;
use axum::{routing::get, Json, Router};

use crate::context;
use crate::http::server::AppState;

/// POST /graphql
async fn execute(
    State(state): State<AppState>,
    extensions: Extensions,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    // Carry the request's binding into GraphQL execution.
    let request = match context::binding(&extensions) {
        Some(binding) => request.data(binding),
        None => request,
    };
    Json(state.schema.execute(request).await)
}

/// GET /graphql
async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/graphql", get(graphiql).post(execute))
}
