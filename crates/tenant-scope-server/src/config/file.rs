//! TOML configuration file loading

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::auth::StaticToken;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./tenant-scope.toml",
    "~/.config/tenant-scope/config.toml",
    "/etc/tenant-scope/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    builder = apply_file_config(builder, file_config)?;
    Ok(builder)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    // HTTP settings
    if let Some(http) = config.http {
        if let Some(host_str) = http.host
            && let Ok(host) = host_str.parse::<IpAddr>()
        {
            builder = builder.http_host(host);
        }

        if let Some(port) = http.port {
            builder = builder.http_port(port);
        }

        if let Some(timeout) = http.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }

        if let Some(origin) = http.cors_origin {
            builder = builder.cors_origin(Some(origin));
        }
    }

    // Authentication settings
    if let Some(auth) = config.auth {
        if let Some(issuer_str) = auth.issuer {
            let issuer = Url::parse(&issuer_str)
                .map_err(|e| crate::Error::Config(format!("Invalid issuer URL: {e}")))?;
            builder = builder.jwt_issuer(issuer);
        }

        if let Some(audience) = auth.audience {
            builder = builder.jwt_audience(audience);
        }

        if let Some(secret) = auth.hs_secret {
            builder = builder.jwt_hs_secret(secret);
        }

        if let Some(skew) = auth.clock_skew_secs {
            builder = builder.jwt_clock_skew(Duration::from_secs(skew));
        }

        if let Some(claim) = auth.tenant_claim {
            builder = builder.tenant_claim(claim);
        }

        if let Some(tenant) = auth.default_tenant {
            builder = builder.default_tenant(Some(tenant).filter(|t| !t.is_empty()));
        }

        if let Some(tokens) = auth.tokens {
            builder = builder.static_tokens(tokens);
        }
    }

    // Observability settings
    if let Some(obs) = config.observability {
        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    http: Option<HttpFileConfig>,
    auth: Option<AuthFileConfig>,
    observability: Option<ObservabilityFileConfig>,
}

#[derive(Debug, Deserialize)]
struct HttpFileConfig {
    host: Option<String>,
    port: Option<u16>,
    request_timeout_secs: Option<u64>,
    cors_origin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthFileConfig {
    issuer: Option<String>,
    audience: Option<Vec<String>>,
    hs_secret: Option<String>,
    clock_skew_secs: Option<u64>,
    tenant_claim: Option<String>,
    default_tenant: Option<String>,
    tokens: Option<Vec<StaticToken>>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityFileConfig {
    log_level: Option<String>,
    json_logs: Option<bool>,
}
