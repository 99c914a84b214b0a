//! Authentication module
//!
//! Turns the bearer credential of an incoming request into an [`Identity`]
//! and builds the per-request context from it.
//!
//! # Modes
//!
//! - JWT validation with HS256/384/512 via `jsonwebtoken`; the tenant is read
//!   from a configurable claim (`tenant_id` by default)
//! - Static token table for development and tests
//!
//! A credential that resolves to an identity without tenant is not rejected
//! here. The context builder refuses it, so the request never reaches a
//! handler.
//!
//! [`Identity`]: tenant_scope::Identity

mod claims;
mod config;
mod error;
mod jwt;
mod middleware;
mod resolver;

pub use claims::{JwtClaims, OneOrMany, StandardClaims};
pub use config::{AuthConfig, AuthMode, DEFAULT_TENANT_CLAIM, JwtConfig, StaticToken};
pub use error::{AuthError, Result};
pub use jwt::JwtIdentityResolver;
pub use middleware::{ContextState, request_context_middleware};
pub use resolver::{IdentityResolver, StaticIdentityResolver, bearer_token, create_resolver};
