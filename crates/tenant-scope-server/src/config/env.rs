//! Environment variable loading for configuration

use std::env;
use std::net::IpAddr;
use std::time::Duration;

use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::auth::StaticToken;

/// Environment variable names
mod vars {
    pub const HTTP_HOST: &str = "TENANT_SCOPE_HTTP_HOST";
    pub const HTTP_PORT: &str = "TENANT_SCOPE_HTTP_PORT";
    pub const REQUEST_TIMEOUT_SECS: &str = "TENANT_SCOPE_REQUEST_TIMEOUT_SECS";
    pub const CORS_ORIGIN: &str = "TENANT_SCOPE_CORS_ORIGIN";
    pub const JWT_ISSUER: &str = "TENANT_SCOPE_JWT_ISSUER";
    pub const JWT_AUDIENCE: &str = "TENANT_SCOPE_JWT_AUDIENCE";
    pub const JWT_HS_SECRET: &str = "TENANT_SCOPE_JWT_HS_SECRET";
    pub const JWT_CLOCK_SKEW_SECS: &str = "TENANT_SCOPE_JWT_CLOCK_SKEW_SECS";
    pub const TENANT_CLAIM: &str = "TENANT_SCOPE_TENANT_CLAIM";
    pub const DEFAULT_TENANT: &str = "TENANT_SCOPE_DEFAULT_TENANT";
    pub const STATIC_TOKENS: &str = "TENANT_SCOPE_STATIC_TOKENS";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const JSON_LOGS: &str = "TENANT_SCOPE_JSON_LOGS";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    // HTTP listener
    if let Ok(host_str) = env::var(vars::HTTP_HOST)
        && let Ok(host) = host_str.parse::<IpAddr>()
    {
        builder = builder.http_host(host);
    }

    if let Ok(port_str) = env::var(vars::HTTP_PORT)
        && let Ok(port) = port_str.parse::<u16>()
    {
        builder = builder.http_port(port);
    }

    if let Ok(timeout_str) = env::var(vars::REQUEST_TIMEOUT_SECS)
        && let Ok(secs) = timeout_str.parse::<u64>()
    {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }

    if let Ok(origin) = env::var(vars::CORS_ORIGIN) {
        builder = builder.cors_origin(Some(origin));
    }

    // Authentication
    if let Ok(issuer_str) = env::var(vars::JWT_ISSUER) {
        let issuer = Url::parse(&issuer_str)
            .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", vars::JWT_ISSUER, e)))?;
        builder = builder.jwt_issuer(issuer);
    }

    if let Ok(audience) = env::var(vars::JWT_AUDIENCE) {
        let audience = audience
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        builder = builder.jwt_audience(audience);
    }

    if let Ok(secret) = env::var(vars::JWT_HS_SECRET) {
        builder = builder.jwt_hs_secret(secret);
    }

    if let Ok(skew_str) = env::var(vars::JWT_CLOCK_SKEW_SECS)
        && let Ok(secs) = skew_str.parse::<u64>()
    {
        builder = builder.jwt_clock_skew(Duration::from_secs(secs));
    }

    if let Ok(claim) = env::var(vars::TENANT_CLAIM) {
        builder = builder.tenant_claim(claim);
    }

    if let Ok(tenant) = env::var(vars::DEFAULT_TENANT) {
        builder = builder.default_tenant(Some(tenant).filter(|t| !t.is_empty()));
    }

    if let Ok(raw) = env::var(vars::STATIC_TOKENS) {
        let tokens = StaticToken::parse_list(&raw).ok_or_else(|| {
            crate::Error::Config(format!(
                "Invalid {}: expected token:user[:tenant] entries",
                vars::STATIC_TOKENS
            ))
        })?;
        builder = builder.static_tokens(tokens);
    }

    // Logging
    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
