//! Conductor MCP server over stdio.
//!
//! Usage: conductor-mcp [local_dev]
//!
//! Reads CONDUCTOR_SERVER_URL, CONDUCTOR_AUTH_KEY and CONDUCTOR_AUTH_SECRET, or a
//! TOML file named by CONDUCTOR_MCP_CONFIG. `local_dev` falls back to the Orkes
//! developer cluster when no server URL is configured.

use conductor_mcp::config::resolve_config;
use conductor_mcp::{ConductorMcpServer, HttpProxy};
use rmcp::ServiceExt;
use tracing_subscriber::EnvFilter;

const LOCAL_DEV_ARG: &str = "local_dev";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the MCP protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let local_dev = std::env::args().skip(1).any(|arg| arg == LOCAL_DEV_ARG);

    let config = match resolve_config(local_dev) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Set CONDUCTOR_SERVER_URL (or run with `local_dev`) and try again.");
            std::process::exit(1);
        }
    };
    tracing::info!("Using Conductor server at {}", config.server_url);

    let server = ConductorMcpServer::new(HttpProxy::from_config(config));
    let transport = tokio::io::join(tokio::io::stdin(), tokio::io::stdout());
    let service = server.serve(transport).await?;
    service.waiting().await?;
    Ok(())
}
