//! Warden Agent
//!
//! Unattended endpoint process: registers this machine by hardware
//! fingerprint (before any user account exists), serves the loopback
//! discovery endpoint for zero-friction linking, and runs the pull-based
//! command loop — lock, alarm, message, geofence watch, and allowlisted
//! remote wipe. The agent is always the initiator; nothing connects in.

#![allow(clippy::print_stdout, reason = "CLI subcommands output to stdout")]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod browse;
mod config;
mod discovery;
mod executor;
mod poller;
mod registration;
mod surface;
mod wifi;
mod wipe;

use config::AgentConfig;
use discovery::AgentIdentity;
use poller::Poller;
use surface::ConsoleSurface;
use warden_client::{ClientConfig, WardenClient};
use warden_core::modules::safety;
use warden_core::IdentifierSet;

#[derive(Parser, Debug)]
#[command(author, version, about = "Warden endpoint agent", long_about = None)]
struct Cli {
    /// Server base URL (overrides the stored config)
    #[arg(long, env = "WARDEN_SERVER_URL")]
    server_url: Option<String>,

    /// Data directory (defaults to $WARDEN_DATA_DIR or ~/.warden)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the agent loop (default)
    Run {
        /// Seconds between command polls
        #[arg(long)]
        poll_interval: Option<u64>,
        /// Seconds between status reports
        #[arg(long)]
        report_interval: Option<u64>,
        /// Local discovery endpoint port
        #[arg(long)]
        discovery_port: Option<u16>,
    },
    /// Print the hardware fingerprint and its quality summary
    Fingerprint,
    /// Approve a folder for remote wipe
    Approve {
        /// Absolute path to approve
        path: String,
    },
    /// Remove a folder from the approved set
    Unapprove {
        /// Path to remove
        path: String,
    },
    /// List the approved folders
    Folders,
}

fn config_path(data_dir: Option<&PathBuf>) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Ok(dir.join("agent.json"))
        }
        None => AgentConfig::default_path()
            .map_err(|e| anyhow::anyhow!("Failed to resolve config path: {}", e)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config_path = config_path(cli.data_dir.as_ref())?;
    let mut config = AgentConfig::load(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    if let Some(url) = cli.server_url.clone() {
        config.server_url = url;
    }

    match cli.command.unwrap_or(Commands::Run {
        poll_interval: None,
        report_interval: None,
        discovery_port: None,
    }) {
        Commands::Run { poll_interval, report_interval, discovery_port } => {
            if let Some(secs) = poll_interval {
                config.poll_interval_secs = secs;
            }
            if let Some(secs) = report_interval {
                config.report_interval_secs = secs;
            }
            if let Some(port) = discovery_port {
                config.discovery_port = port;
            }
            run_agent(config, &config_path).await
        }
        Commands::Fingerprint => {
            let info = IdentifierSet::collect().info();
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
        Commands::Approve { path } => {
            let eligible = safety::sanitize_approved_folders(std::slice::from_ref(&path));
            if eligible.is_empty() {
                anyhow::bail!("{}: not eligible (must be absolute and outside system paths)", path);
            }
            let folder = eligible.into_iter().next().unwrap_or(path);
            if !config.approved_folders.contains(&folder) {
                config.approved_folders.push(folder.clone());
                config
                    .save(&config_path)
                    .map_err(|e| anyhow::anyhow!("Failed to save config: {}", e))?;
            }
            println!("Approved: {}", folder);
            sync_folders_best_effort(&config).await;
            Ok(())
        }
        Commands::Unapprove { path } => {
            let before = config.approved_folders.len();
            config.approved_folders.retain(|f| f != &path);
            if config.approved_folders.len() == before {
                anyhow::bail!("{}: not in the approved set", path);
            }
            config
                .save(&config_path)
                .map_err(|e| anyhow::anyhow!("Failed to save config: {}", e))?;
            println!("Removed: {}", path);
            sync_folders_best_effort(&config).await;
            Ok(())
        }
        Commands::Folders => {
            if config.approved_folders.is_empty() {
                println!("No approved folders.");
            } else {
                for folder in &config.approved_folders {
                    println!("{}", folder);
                }
            }
            Ok(())
        }
    }
}

async fn run_agent(mut config: AgentConfig, config_path: &std::path::Path) -> Result<()> {
    info!("🤖 Warden Agent starting");
    info!("Server: {}", config.server_url);

    let client = WardenClient::new(ClientConfig {
        base_url: config.server_url.clone(),
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

    // Discovery runs from the start so a browser can watch registration
    // progress on this machine
    let identity = Arc::new(RwLock::new(AgentIdentity::default()));
    discovery::start(identity.clone(), config.discovery_port);

    let device_id =
        registration::ensure_registered(&client, &mut config, config_path, &identity).await;

    match client.sync_approved_folders(&device_id, &config.approved_folders).await {
        Ok(resp) => info!("Approved folders synced: {}", resp.count),
        Err(e) => warn!("Approved folder sync failed (will rely on local set): {}", e),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("🛑 Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let surface = Arc::new(ConsoleSurface::new());
    let poller = Poller::new(client, config, device_id, surface);
    poller.run(shutdown_rx).await;

    info!("Agent stopped");
    Ok(())
}

async fn sync_folders_best_effort(config: &AgentConfig) {
    let Some(device_id) = &config.device_id else {
        println!("(not registered yet; folders will sync on the next agent run)");
        return;
    };
    let Ok(client) = WardenClient::new(ClientConfig {
        base_url: config.server_url.clone(),
        ..Default::default()
    }) else {
        return;
    };
    match client.sync_approved_folders(device_id, &config.approved_folders).await {
        Ok(resp) => println!("Synced {} folder(s) to server.", resp.count),
        Err(e) => println!("(server sync deferred: {})", e),
    }
}
