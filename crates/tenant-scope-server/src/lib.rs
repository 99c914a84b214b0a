//! HTTP server exposing tenant-scoped data access
//!
//! Every request on an entity route is authenticated, turned into a fresh
//! [`tenant_scope::RequestContext`] and served through that context's
//! handles.

pub mod auth;
pub mod config;
mod error;
pub mod handlers;
pub mod observability;
pub mod transport;

pub use auth::{AuthConfig, AuthError, ContextState, IdentityResolver, create_resolver};
pub use config::{Config, ConfigBuilder, HttpConfig, ObservabilityConfig};
pub use error::{Error, Result};
