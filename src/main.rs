//! linksys-jnap - bridge a Linksys router into a home-automation host
//!
//! Validates the admin password over JNAP, reads the router's identity and
//! LAN settings, and registers the router as an accessory.

mod accessory;
mod config;
mod error;
mod jnap;
mod models;
mod parser;
mod session;
mod utils;

use accessory::{AccessoryRegistry, Characteristic, CharacteristicValue};
use anyhow::{Context, Result};
use clap::Parser;
use jnap::JnapClient;
use session::DeviceSession;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "linksys-jnap")]
#[command(about = "Linksys router accessory bridge", long_about = None)]
struct Args {
    /// Re-run the router session every check interval
    #[arg(short, long)]
    daemon: bool,

    /// Config file path (default: search config.toml locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the accessory's identify routine after the session
    #[arg(long, conflicts_with = "daemon")]
    identify: bool,

    /// Read a characteristic after the session (e.g. --get Model)
    #[arg(long, value_name = "CHARACTERISTIC", conflicts_with = "daemon")]
    get: Vec<Characteristic>,

    /// Write a characteristic after the session (e.g. --set ManagedNetworkEnable=1)
    #[arg(long, value_name = "CHARACTERISTIC=VALUE", value_parser = parse_write, conflicts_with = "daemon")]
    set: Vec<(Characteristic, CharacteristicValue)>,
}

fn parse_write(arg: &str) -> Result<(Characteristic, CharacteristicValue), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected CHARACTERISTIC=VALUE, got `{}`", arg))?;
    let characteristic = name.trim().parse().map_err(|e| format!("{}", e))?;
    let value = match value.trim().parse() {
        Ok(value) => value,
        Err(never) => match never {},
    };
    Ok((characteristic, value))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let cfg = config::Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level)),
        )
        .init();

    tracing::info!("linksys-jnap v{}", env!("CARGO_PKG_VERSION"));

    let endpoint = match cfg.endpoint() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::error!("{}: check the [router] section of the config file", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    tracing::debug!("Router endpoint: {:?}", endpoint);

    let client = JnapClient::new(endpoint, &cfg.http).context("Failed to build HTTP client")?;
    let mut registry = AccessoryRegistry::new();

    if args.daemon {
        run_daemon(&cfg, &client, &mut registry).await;
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(run_once(&cfg, &client, &mut registry, &args).await)
    }
}

/// Run a single session and report the registered accessory
async fn run_once(
    cfg: &config::Config,
    client: &JnapClient,
    registry: &mut AccessoryRegistry,
    args: &Args,
) -> ExitCode {
    let session = DeviceSession::from_config(client, cfg);
    let Some(outcome) = session.run_logged(registry).await else {
        return ExitCode::FAILURE;
    };

    if let Some(accessory) = registry.get(outcome.identifier()) {
        tracing::info!("Accessory: {} ({})", accessory.display_name(), accessory.uuid());
        for (characteristic, value) in accessory.read_all() {
            tracing::info!("   {}: {}", characteristic.name(), value);
        }
        if args.identify {
            accessory.identify();
        }

        let mut failed = false;
        for characteristic in &args.get {
            match accessory.get(*characteristic) {
                Ok(value) => println!("{}={}", characteristic.name(), value),
                Err(e) => {
                    tracing::error!("{}", e);
                    failed = true;
                }
            }
        }
        for (characteristic, value) in &args.set {
            match accessory.set(*characteristic, value.clone()) {
                Ok(()) => tracing::info!("{} set to {}", characteristic.name(), value),
                Err(e) => {
                    tracing::error!("{}", e);
                    failed = true;
                }
            }
        }
        if failed {
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

/// Run in daemon mode - repeat the session on a fixed interval
async fn run_daemon(cfg: &config::Config, client: &JnapClient, registry: &mut AccessoryRegistry) {
    let check_interval = std::time::Duration::from_secs(cfg.session.check_interval);
    let session = DeviceSession::from_config(client, cfg);

    tracing::info!("Starting daemon mode...");
    tracing::info!("Router: {}", client.endpoint().base_url());
    tracing::info!("Check interval: {}s", cfg.session.check_interval);
    tracing::info!("---");

    loop {
        match session.run_logged(registry).await {
            Some(outcome) => tracing::debug!("Session finished: {:?}", outcome),
            None => tracing::warn!("Session failed, next attempt in {}s", cfg.session.check_interval),
        }
        tokio::time::sleep(check_interval).await;
    }
}
