//! HTTP server command for the librarian GraphQL API
//!
//! Connects to MongoDB, verifies it answers a ping, then serves until
//! Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser};

use librarian_server::http::{shutdown_signal, ServerConfig, Service};
use librarian_server::{DatabaseConfig, Lifecycle, MongoConnector};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', env = "LIBRARIAN_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Seconds in-flight requests may run after shutdown begins
    #[arg(long, env = "LIBRARIAN_DRAIN_TIMEOUT_SECS", default_value_t = 10)]
    pub drain_timeout_secs: u64,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

/// MongoDB connection settings
#[derive(Args, Debug)]
pub struct DatabaseArgs {
    /// Full connection string; overrides host and port
    #[arg(long, env = "MONGO_URL", hide_env_values = true)]
    pub mongo_url: Option<String>,

    /// Database host (default: localhost)
    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Database port (default: 27017)
    #[arg(long, env = "DB_PORT")]
    pub db_port: Option<String>,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    pub db_pass: Option<String>,

    /// Set to false to serve without a database
    #[arg(
        long,
        env = "DB_ENABLED",
        action = ArgAction::Set,
        default_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub db_enabled: bool,

    /// Upper bound for the startup ping, in milliseconds
    #[arg(long, env = "DB_PROBE_TIMEOUT_MS", default_value_t = 5000)]
    pub probe_timeout_ms: u64,
}

impl DatabaseArgs {
    pub fn into_config(self) -> DatabaseConfig {
        let defaults = DatabaseConfig::default();
        DatabaseConfig {
            enabled: self.db_enabled,
            url: self.mongo_url.filter(|url| !url.trim().is_empty()),
            host: self.db_host.unwrap_or(defaults.host),
            port: self.db_port.unwrap_or(defaults.port),
            user: self.db_user.unwrap_or_default(),
            password: self.db_pass.unwrap_or_default(),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            app_name: Some(env!("CARGO_PKG_NAME").to_string()),
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
        drain_timeout: Duration::from_secs(args.drain_timeout_secs),
        database: args.database.into_config(),
    };

    tracing::info!("Starting librarian on {}", config.bind_addr);

    let service = Service::start(&config, MongoConnector, Lifecycle::new())
        .await
        .context("Startup failed; not accepting traffic")?;

    // Blocks until shutdown
    service
        .serve(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
