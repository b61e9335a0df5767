//! Request middleware - binds the shared connection into every request

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::context;
use crate::db::ConnectionRef;

/// Bind the connection (or the "not configured" marker) into the request
/// extensions, then run the rest of the stack.
pub async fn bind_connection(
    State(connection): State<Option<ConnectionRef>>,
    mut request: Request,
    next: Next,
) -> Response {
    if connection.is_none() {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "no database configured for this request"
        );
    }

    let bound = context::bind(request.extensions(), connection.as_ref());
    *request.extensions_mut() = bound;

    next.run(request).await
}
