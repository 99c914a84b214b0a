//! Credential to identity resolution

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use tenant_scope::Identity;

use super::config::{AuthConfig, AuthMode, StaticToken};
use super::error::{AuthError, Result};
use super::jwt::JwtIdentityResolver;

/// Turns a bearer credential into the acting identity.
#[async_trait]
pub trait IdentityResolver: Send + Sync + std::fmt::Debug {
    async fn resolve(&self, credential: &str) -> Result<Identity>;
}

/// Fixed token-to-identity table.
pub struct StaticIdentityResolver {
    tokens: HashMap<String, Identity>,
}

impl std::fmt::Debug for StaticIdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticIdentityResolver")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl StaticIdentityResolver {
    #[must_use]
    pub fn new(tokens: impl IntoIterator<Item = StaticToken>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| (t.token, Identity::new(t.user_id, t.tenant_id)))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<Identity> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// Resolver for the configured authentication mode
#[must_use]
pub fn create_resolver(config: &AuthConfig) -> Arc<dyn IdentityResolver> {
    match &config.mode {
        AuthMode::Jwt(jwt) => Arc::new(JwtIdentityResolver::new(jwt.as_ref().clone())),
        AuthMode::Static(tokens) => Arc::new(StaticIdentityResolver::new(tokens.iter().cloned())),
    }
}

/// Bearer credential from the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::NotAuthenticated)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::NotAuthenticated)
}
