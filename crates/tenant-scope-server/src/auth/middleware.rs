//! Per-request context middleware
//!
//! Resolves the bearer credential, builds a fresh [`RequestContext`] for the
//! resulting identity and stores it in the request extensions. Requests that
//! fail either step never reach a handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tenant_scope::{ContextBuilder, RequestContext};
use tracing::Instrument;

use super::resolver::{IdentityResolver, bearer_token};
use crate::error::Error;

/// Shared state for [`request_context_middleware`]
#[derive(Clone)]
pub struct ContextState {
    pub builder: Arc<ContextBuilder>,
    pub resolver: Arc<dyn IdentityResolver>,
}

impl std::fmt::Debug for ContextState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextState")
            .field("builder", &self.builder)
            .field("resolver", &self.resolver)
            .finish()
    }
}

impl ContextState {
    #[must_use]
    pub fn new(builder: ContextBuilder, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            builder: Arc::new(builder),
            resolver,
        }
    }

    /// Resolve `headers` into a freshly built context
    pub async fn context_for(&self, headers: &HeaderMap) -> Result<RequestContext, Error> {
        let token = bearer_token(headers).inspect_err(|e| {
            tracing::warn!(reason = %e, "missing bearer credential");
        })?;

        // Token contents are never logged
        let identity = self.resolver.resolve(token).await.inspect_err(|e| {
            tracing::warn!(reason = %e, "credential rejected");
        })?;

        let ctx = self.builder.build(identity).inspect_err(|e| {
            #[cfg(feature = "metrics")]
            crate::observability::record_context_rejected(e);
            tracing::warn!(error = %e, "request context not built");
        })?;

        #[cfg(feature = "metrics")]
        crate::observability::record_context_built();

        Ok(ctx)
    }
}

/// Build the request context and hand it to the inner service
pub async fn request_context_middleware(
    State(state): State<ContextState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let ctx = state.context_for(request.headers()).await?;

    let span = tracing::info_span!(
        "request_context",
        context = %ctx.id(),
        tenant = %ctx.tenant_id(),
        user = %ctx.user_id(),
    );
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).instrument(span).await)
}
