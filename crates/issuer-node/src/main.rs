//! Issuer Node — entry point.
//!
//! Registers a credential type, publishes an invitation and offers the
//! credential to every peer that connects through it.

mod api;
mod config;
mod node;
mod prompt;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use config::IssuerConfig;
use node::IssuerNode;

/// Issuer Node
#[derive(Parser, Debug)]
#[command(name = "issuer-node", version, about = "Credential issuer agent")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "issuer.toml")]
    config: PathBuf,

    /// Override the inbound endpoint port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the public endpoint advertised in invitations.
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override whether the invitation accepts more than one connection.
    #[arg(long)]
    multi_use: Option<bool>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config = IssuerConfig::default();
        init_tracing(&config.logging.level, &config.logging.format);
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = IssuerConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.agent.port = port;
    }
    if let Some(endpoint) = args.endpoint {
        config.agent.endpoint = Some(endpoint);
    }
    if let Some(multi_use) = args.multi_use {
        config.invitation.multi_use = multi_use;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("Issuer Node v{}", env!("CARGO_PKG_VERSION"));

    let mut node = IssuerNode::new(config)?;
    node.start().await?;
    if let Some(invitation) = node.invitation() {
        tracing::info!(
            out_of_band_id = %invitation.out_of_band_id(),
            "waiting for connections"
        );
    }

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    loop {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        if prompt::confirm_exit(&mut stdin, &mut stdout).await? {
            break;
        }
    }

    node.shutdown();
    Ok(())
}
