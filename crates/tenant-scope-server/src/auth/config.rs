//! Authentication configuration types

use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Default JWT claim carrying the tenant id
pub const DEFAULT_TENANT_CLAIM: &str = "tenant_id";

/// How bearer credentials are turned into identities
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// HS256/384/512 signed JWTs
    Jwt(Box<JwtConfig>),
    /// Fixed token table (development and tests)
    Static(Vec<StaticToken>),
}

/// JWT validation settings
#[derive(Clone)]
pub struct JwtConfig {
    /// Expected `iss` claim; not checked when unset
    pub issuer: Option<Url>,
    /// Expected audience claims (must contain at least one match)
    pub audience: Vec<String>,
    /// Clock skew tolerance for exp/nbf validation
    pub clock_skew: Duration,
    /// HS256/384/512 shared secret
    pub hs_secret: String,
    /// Claim holding the tenant id
    pub tenant_claim: String,
    /// Tenant assumed when the claim is absent (None = reject)
    pub default_tenant: Option<String>,
}

// Omits hs_secret
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("clock_skew", &self.clock_skew)
            .field("tenant_claim", &self.tenant_claim)
            .field("default_tenant", &self.default_tenant)
            .finish_non_exhaustive()
    }
}

impl JwtConfig {
    #[must_use]
    pub fn new(hs_secret: impl Into<String>) -> Self {
        Self {
            issuer: None,
            audience: vec![],
            clock_skew: Duration::from_secs(60),
            hs_secret: hs_secret.into(),
            tenant_claim: DEFAULT_TENANT_CLAIM.to_string(),
            default_tenant: None,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: Url) -> Self {
        self.issuer = Some(issuer);
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: Vec<String>) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_tenant_claim(mut self, claim: impl Into<String>) -> Self {
        self.tenant_claim = claim.into();
        self
    }

    #[must_use]
    pub fn with_default_tenant(mut self, tenant: Option<String>) -> Self {
        self.default_tenant = tenant;
        self
    }
}

/// One entry of the static token table
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct StaticToken {
    pub token: String,
    pub user_id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken")
            .field("user_id", &self.user_id)
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

impl StaticToken {
    /// Parse a comma-separated `token:user[:tenant]` list.
    ///
    /// Returns `None` if any entry lacks a token or user.
    pub fn parse_list(raw: &str) -> Option<Vec<Self>> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let mut parts = entry.splitn(3, ':');
                let token = parts.next().filter(|s| !s.is_empty())?;
                let user_id = parts.next().filter(|s| !s.is_empty())?;
                let tenant_id = parts.next().map(str::to_string);
                Some(Self {
                    token: token.to_string(),
                    user_id: user_id.to_string(),
                    tenant_id,
                })
            })
            .collect()
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub mode: AuthMode,
}

impl AuthConfig {
    #[must_use]
    pub fn jwt(config: JwtConfig) -> Self {
        Self {
            mode: AuthMode::Jwt(Box::new(config)),
        }
    }

    #[must_use]
    pub const fn static_tokens(tokens: Vec<StaticToken>) -> Self {
        Self {
            mode: AuthMode::Static(tokens),
        }
    }

    #[must_use]
    pub const fn is_jwt(&self) -> bool {
        matches!(self.mode, AuthMode::Jwt(_))
    }
}
