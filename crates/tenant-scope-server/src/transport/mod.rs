//! Transport layer
//!
//! HTTP only: an `axum` router served on the configured address.

mod http;

use std::future::Future;

pub use http::{router, run_http};

use crate::Result;
use crate::auth::ContextState;
use crate::config::Config;

/// Build the router for `config` and serve it until `shutdown` resolves
pub async fn run_transport(
    state: ContextState,
    config: &Config,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    http::emit_security_warnings(config.http(), config.auth());
    let app = router(state, config.http());
    run_http(app, config.http(), shutdown).await
}
