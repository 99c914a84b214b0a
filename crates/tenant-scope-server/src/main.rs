use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tenant_scope::{ContextBuilder, InMemoryStorage, TracedStorage};
use tenant_scope_server::auth::StaticToken;
use tenant_scope_server::config::{self, ConfigBuilder};
use tenant_scope_server::observability::{init_observability, shutdown_observability};
use tenant_scope_server::transport::run_transport;
use tenant_scope_server::{ContextState, create_resolver};

#[derive(Parser, Debug)]
#[command(name = "tenant-scope-server")]
#[command(about = "HTTP server exposing tenant-scoped data access", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP bind host
    #[arg(long)]
    http_host: Option<IpAddr>,

    /// HTTP bind port
    #[arg(long)]
    http_port: Option<u16>,

    /// Request timeout in seconds
    #[arg(long)]
    request_timeout: Option<u64>,

    /// Allowed CORS origin
    #[arg(long)]
    cors_origin: Option<String>,

    /// Static tokens for development (token:user[:tenant],...)
    #[arg(long)]
    static_tokens: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// CLI layer; file and environment are applied on top of it
    fn into_builder(self) -> anyhow::Result<ConfigBuilder> {
        let mut builder = ConfigBuilder::new();

        if let Some(host) = self.http_host {
            builder = builder.http_host(host);
        }
        if let Some(port) = self.http_port {
            builder = builder.http_port(port);
        }
        if let Some(secs) = self.request_timeout {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if self.cors_origin.is_some() {
            builder = builder.cors_origin(self.cors_origin);
        }
        if let Some(raw) = self.static_tokens {
            let tokens = StaticToken::parse_list(&raw).ok_or_else(|| {
                anyhow::anyhow!("Invalid --static-tokens: expected token:user[:tenant]")
            })?;
            builder = builder.static_tokens(tokens);
        }
        if self.verbose {
            builder = builder.log_level("debug".to_string());
        }
        if self.json_logs {
            builder = builder.json_logs(true);
        }

        Ok(builder)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone();

    // Load configuration with precedence: env > file > CLI > defaults
    let base = args.into_builder()?;
    let builder = match config_path {
        Some(ref path) => config::load_config_from_path(path, base)?,
        None => config::load_config(base)?,
    };
    let config = builder.build()?;

    init_observability(&config.observability)?;

    let storage = Arc::new(TracedStorage::new(InMemoryStorage::new()));
    let contexts = ContextBuilder::with_default_entities(storage);
    let resolver = create_resolver(config.auth());

    tracing::info!("Starting tenant-scope server");
    tracing::info!("Entities: {:?}", contexts.entities());
    tracing::info!(
        "Authentication: {}",
        if config.auth().is_jwt() { "jwt" } else { "static tokens" }
    );
    tracing::info!("Request timeout: {:?}", config.http().request_timeout);

    let state = ContextState::new(contexts, resolver);

    // Setup shutdown signal
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    let result = run_transport(state, &config, shutdown).await;

    shutdown_observability();

    result.map_err(Into::into)
}
