// Standalone MCP server binary

use anyhow::Result;
use clap::Parser;
use easegress_mcp::config::{LogFormat, McpConfig, Overrides};
use easegress_mcp::server::McpServer;
use easegress_mcp::tools::default_registry;
use easegress_mcp::ProxyManager;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "easegress-mcp")]
#[command(about = "MCP server for Easegress reverse proxies and Let's Encrypt", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "EG_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Address of the Easegress admin API
    #[arg(long, env = "EG_API_ADDRESS")]
    api_address: Option<String>,

    /// Path prefix of the Easegress admin API
    #[arg(long, env = "EG_API_PREFIX")]
    api_prefix: Option<String>,

    /// Bearer token for the Easegress admin API
    #[arg(long, env = "EG_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = McpConfig::load(args.config.as_deref())?;
    config.apply(Overrides {
        api_address: args.api_address,
        api_prefix: args.api_prefix,
        api_token: args.api_token,
        timeout_secs: args.timeout,
        log_format: args.log_format,
    });

    // Initialize tracing; stdout carries the protocol
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match config.logging.format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    tracing::info!(
        api = %config.easegress.api_address,
        prefix = %config.easegress.api_prefix,
        "Easegress MCP server starting..."
    );

    let client = config.client()?;
    if let Err(e) = client.health().check().await {
        tracing::warn!(error = %e, "Easegress admin API is not reachable yet; tools will fail until it is");
    }

    let manager = Arc::new(ProxyManager::new(client));
    let registry = default_registry(manager);
    tracing::info!("Registered {} tools", registry.len());

    let server = McpServer::new(registry);
    server.start().await?;

    Ok(())
}
