//! Request context binding
//!
//! The per-request context is the request's [`Extensions`] map. The
//! connection is stored under [`Binding`], a type only this module can
//! construct, so unrelated extensions can never shadow or forge it.
//!
//! Three outcomes are kept apart when resolving:
//! - no binding at all: a wiring defect ([`ContextError::MissingBinding`])
//! - bound, but the deployment has no database ([`ContextError::NotConfigured`])
//! - bound, but the connection was already torn down ([`ContextError::Closed`])

use axum::http::Extensions;
use thiserror::Error;
use tracing::error;

use crate::db::{ConnectionHandle, ConnectionRef};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context does not contain a bound connection")]
    MissingBinding,

    #[error("connection not configured")]
    NotConfigured,

    #[error("connection has been closed")]
    Closed,
}

impl ContextError {
    /// True when the handler ran outside the middleware chain.
    pub fn is_defect(self) -> bool {
        matches!(self, Self::MissingBinding)
    }

    /// Stable code for API error payloads
    pub fn code(self) -> &'static str {
        match self {
            Self::MissingBinding => "MISSING_CONNECTION",
            Self::NotConfigured => "DATABASE_NOT_CONFIGURED",
            Self::Closed => "CONNECTION_CLOSED",
        }
    }
}

/// Connection slot carried by a request context
#[derive(Clone, Debug)]
pub struct Binding {
    connection: Option<ConnectionRef>,
}

impl Binding {
    pub fn resolve(&self) -> Result<ConnectionHandle, ContextError> {
        match &self.connection {
            None => Err(ContextError::NotConfigured),
            Some(connection) => connection.upgrade().ok_or(ContextError::Closed),
        }
    }
}

/// Return a copy of `ctx` carrying `handle`; `ctx` itself is untouched.
///
/// `None` binds the "not configured" marker.
pub fn bind(ctx: &Extensions, handle: Option<&ConnectionRef>) -> Extensions {
    let mut bound = ctx.clone();
    bound.insert(Binding {
        connection: handle.cloned(),
    });
    bound
}

/// Fetch the connection bound to `ctx`.
pub fn resolve(ctx: &Extensions) -> Result<ConnectionHandle, ContextError> {
    resolve_binding(ctx.get::<Binding>())
}

/// The binding itself, for carrying it into another context.
pub fn binding(ctx: &Extensions) -> Option<Binding> {
    ctx.get::<Binding>().cloned()
}

/// Fetch the connection from a GraphQL resolver context.
pub fn resolve_graphql(ctx: &async_graphql::Context<'_>) -> Result<ConnectionHandle, ContextError> {
    resolve_binding(ctx.data_opt::<Binding>())
}

fn resolve_binding(binding: Option<&Binding>) -> Result<ConnectionHandle, ContextError> {
    match binding {
        Some(binding) => binding.resolve(),
        None => {
            error!("handler ran without a connection binding; is the middleware installed?");
            Err(ContextError::MissingBinding)
        }
    }
}
