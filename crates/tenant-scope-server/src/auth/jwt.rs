//! JWT parsing and validation

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode_header};
use tenant_scope::Identity;

use super::claims::JwtClaims;
use super::config::JwtConfig;
use super::error::{AuthError, Result};
use super::resolver::IdentityResolver;

/// Resolves HS256/384/512 signed JWTs into identities.
///
/// The user is taken from `sub`, the tenant from the configured claim. A token
/// without a tenant claim yields an identity without tenant (unless a default
/// tenant is configured), which the context builder then rejects.
pub struct JwtIdentityResolver {
    config: JwtConfig,
    key: DecodingKey,
}

impl std::fmt::Debug for JwtIdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIdentityResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl JwtIdentityResolver {
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let key = DecodingKey::from_secret(config.hs_secret.as_bytes());
        Self { config, key }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;

        if !matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let mut validation = Validation::new(header.alg);

        // Normalize issuer by removing trailing slash for comparison
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer.as_str().trim_end_matches('/')]);
        }

        if self.config.audience.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&self.config.audience);
        }

        validation.leeway = self.config.clock_skew.as_secs();

        let token_data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &validation)?;

        Ok(token_data.claims)
    }

    fn identity(&self, claims: &JwtClaims) -> Identity {
        let tenant = claims
            .claim_str(&self.config.tenant_claim)
            .map(str::to_string)
            .or_else(|| self.config.default_tenant.clone());
        Identity::new(claims.standard.sub.clone(), tenant)
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, credential: &str) -> Result<Identity> {
        let claims = self.validate(credential)?;
        Ok(self.identity(&claims))
    }
}
