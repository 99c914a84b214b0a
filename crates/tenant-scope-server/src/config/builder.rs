//! Configuration builder

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use url::Url;

use crate::Error;
use crate::auth::{AuthConfig, DEFAULT_TENANT_CLAIM, JwtConfig, StaticToken};

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub http: HttpConfig,
    pub auth: AuthConfig,
    pub observability: ObservabilityConfig,
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn http(&self) -> &HttpConfig {
        &self.http
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthConfig {
        &self.auth
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
    pub request_timeout: Duration,
    /// Allowed CORS origin; cross-origin requests are refused when unset
    pub cors_origin: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            request_timeout: Duration::from_secs(30),
            cors_origin: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    http: HttpConfig,
    jwt_issuer: Option<Url>,
    jwt_audience: Vec<String>,
    jwt_hs_secret: Option<String>,
    jwt_clock_skew: Duration,
    tenant_claim: Option<String>,
    default_tenant: Option<String>,
    static_tokens: Vec<StaticToken>,
    observability: ObservabilityConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: HttpConfig::default(),
            jwt_issuer: None,
            jwt_audience: Vec::new(),
            jwt_hs_secret: None,
            jwt_clock_skew: Duration::from_secs(60),
            tenant_claim: None,
            default_tenant: None,
            static_tokens: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }

    #[must_use]
    pub const fn http_host(mut self, host: IpAddr) -> Self {
        self.http.host = host;
        self
    }

    #[must_use]
    pub const fn http_port(mut self, port: u16) -> Self {
        self.http.port = port;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.http.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn cors_origin(mut self, origin: Option<String>) -> Self {
        self.http.cors_origin = origin;
        self
    }

    #[must_use]
    pub fn jwt_issuer(mut self, issuer: Url) -> Self {
        self.jwt_issuer = Some(issuer);
        self
    }

    #[must_use]
    pub fn jwt_audience(mut self, audience: Vec<String>) -> Self {
        self.jwt_audience = audience;
        self
    }

    /// HS256/384/512 secret; selects JWT authentication
    #[must_use]
    pub fn jwt_hs_secret(mut self, secret: String) -> Self {
        self.jwt_hs_secret = Some(secret);
        self
    }

    #[must_use]
    pub const fn jwt_clock_skew(mut self, skew: Duration) -> Self {
        self.jwt_clock_skew = skew;
        self
    }

    #[must_use]
    pub fn tenant_claim(mut self, claim: String) -> Self {
        self.tenant_claim = Some(claim);
        self
    }

    #[must_use]
    pub fn default_tenant(mut self, tenant: Option<String>) -> Self {
        self.default_tenant = tenant;
        self
    }

    /// Static token table, used when no JWT secret is configured
    #[must_use]
    pub fn static_tokens(mut self, tokens: Vec<StaticToken>) -> Self {
        self.static_tokens = tokens;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.observability.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.observability.json_logs = enabled;
        self
    }

    /// Build the configuration.
    ///
    /// A JWT secret takes precedence over a static token table. Having
    /// neither is an error.
    pub fn build(self) -> crate::Result<Config> {
        let secret = self.jwt_hs_secret.filter(|s| !s.is_empty());

        let auth = if let Some(secret) = secret {
            let mut jwt = JwtConfig::new(secret)
                .with_audience(self.jwt_audience)
                .with_tenant_claim(
                    self.tenant_claim
                        .unwrap_or_else(|| DEFAULT_TENANT_CLAIM.to_string()),
                )
                .with_default_tenant(self.default_tenant);
            jwt.clock_skew = self.jwt_clock_skew;
            if let Some(issuer) = self.jwt_issuer {
                jwt = jwt.with_issuer(issuer);
            }
            AuthConfig::jwt(jwt)
        } else if !self.static_tokens.is_empty() {
            AuthConfig::static_tokens(self.static_tokens)
        } else {
            return Err(Error::Config(
                "no identity resolver configured: set auth.hs_secret or auth.tokens".into(),
            ));
        };

        let log_level = if self.observability.log_level.is_empty() {
            "info".to_string()
        } else {
            self.observability.log_level
        };

        Ok(Config {
            http: self.http,
            auth,
            observability: ObservabilityConfig {
                log_level,
                json_logs: self.observability.json_logs,
            },
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
