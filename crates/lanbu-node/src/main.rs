//! `lanbu`: command-line front-end for LANBU LAN discovery.
//!
//! Runs one node in either role until Ctrl-C:
//!
//! ```text
//! lanbu host --game-version 0.53 --port 7777
//! lanbu discover                 # print the server list whenever it changes
//! lanbu discover --json          # one JSON array per change
//! lanbu discover --connect       # join the first host found over TCP
//! lanbu config init              # write the effective settings to the config file
//! ```
//!
//! # Configuration
//!
//! Settings come from the TOML file selected by `--config` (or `LANBU_CONFIG`),
//! else the platform default path; a missing file means defaults.  Flags
//! given on the command line override the file.
//!
//! Logging goes through `tracing`.  `RUST_LOG` wins; otherwise the file's
//! `general.log_level` is used.

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use lanbu_node::application::connect::ConnectionInitiator;
use lanbu_node::infrastructure::{
    network::{transport::TcpSessionTransport, SessionRoleController},
    storage::config::{
        config_file_path, load_config, load_config_from, save_config, save_config_to, AppConfig,
        ConfigFileError,
    },
    ui_bridge::{self, CommandResult, HostDto},
};
use serde::Serialize;

/// How often the Discover command polls the host list.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "lanbu", version, about = "LAN game server discovery")]
struct Cli {
    /// TOML configuration file.  Defaults to the platform config directory.
    #[arg(long, global = true, env = "LANBU_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Advertise a game server on the LAN.
    Host(HostArgs),
    /// Listen for game servers and list them.
    Discover(DiscoverArgs),
    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Write the current settings (defaults plus any existing file) to disk.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct HostArgs {
    /// Version string carried in the beacon.
    #[arg(long)]
    game_version: Option<String>,

    /// Port clients connect to for the game session.
    #[arg(long)]
    port: Option<u16>,

    /// Milliseconds between beacons.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// UDP port beacons are sent to.
    #[arg(long)]
    discovery_port: Option<u16>,

    /// Broadcast destination, e.g. 192.168.1.255.
    #[arg(long)]
    broadcast: Option<String>,
}

#[derive(Debug, Args)]
struct DiscoverArgs {
    /// Milliseconds without a beacon before a host disappears.
    #[arg(long)]
    ttl_ms: Option<u64>,

    /// Receive timeout of the listener, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// UDP port to listen on.
    #[arg(long)]
    discovery_port: Option<u16>,

    /// Print each host list as a JSON array.
    #[arg(long)]
    json: bool,

    /// Stop at the first host found and open a TCP session with it.
    #[arg(long)]
    connect: bool,
}

impl HostArgs {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(v) = &self.game_version {
            config.host.game_version = v.clone();
        }
        if let Some(p) = self.port {
            config.host.advertised_port = p;
        }
        if let Some(ms) = self.interval_ms {
            config.host.broadcast_interval_ms = ms;
        }
        if let Some(p) = self.discovery_port {
            config.network.discovery_port = p;
        }
        if let Some(addr) = &self.broadcast {
            config.network.broadcast_address = addr.clone();
        }
    }
}

impl DiscoverArgs {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(ms) = self.ttl_ms {
            config.discovery.host_ttl_ms = ms;
        }
        if let Some(ms) = self.timeout_ms {
            config.discovery.receive_timeout_ms = ms;
        }
        if let Some(p) = self.discovery_port {
            config.network.discovery_port = p;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = read_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .init();

    let controller = Arc::new(SessionRoleController::new());

    // Shutdown flag cleared by Ctrl-C.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl-C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl-C signal: {e}"),
        }
    });

    let result = match &cli.command {
        Command::Host(args) => {
            args.apply_to(&mut config);
            run_host(&controller, &config, &running).await
        }
        Command::Discover(args) => {
            args.apply_to(&mut config);
            run_discover(&controller, &config, args, &running).await
        }
        Command::Config {
            action: ConfigCommand::Init { force },
        } => init_config(cli.config.as_deref(), &config, *force).map(|path| {
            println!("wrote {}", path.display());
        }),
    };

    stop_controller(&controller).await?;
    result
}

fn read_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let loaded = match path {
        Some(p) => load_config_from(p),
        None => match load_config() {
            Err(ConfigFileError::NoPlatformConfigDir) => Ok(AppConfig::default()),
            other => other,
        },
    };
    loaded.context("failed to load configuration")
}

/// Writes `config` to `path`, or to the platform default location.
///
/// Refuses to replace an existing file unless `force` is set.
fn init_config(path: Option<&Path>, config: &AppConfig, force: bool) -> anyhow::Result<PathBuf> {
    let target = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    if target.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to overwrite", target.display());
    }
    match path {
        Some(p) => save_config_to(config, p),
        None => save_config(config),
    }
    .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(target)
}

/// Turns a bridge response into an `anyhow` result.
fn into_result<T: Serialize>(result: CommandResult<T>) -> anyhow::Result<Option<T>> {
    if result.success {
        Ok(result.data)
    } else {
        Err(anyhow::anyhow!(result
            .error
            .unwrap_or_else(|| "unknown error".to_string())))
    }
}

/// `stop` joins a thread, so it runs off the async workers.
async fn stop_controller(controller: &Arc<SessionRoleController>) -> anyhow::Result<()> {
    let c = Arc::clone(controller);
    let result = tokio::task::spawn_blocking(move || ui_bridge::stop(&c))
        .await
        .context("stop task panicked")?;
    into_result(result).map(|_| ())
}

fn log_final_stats(controller: &SessionRoleController) {
    if let Some(stats) = ui_bridge::get_status(controller).data.and_then(|s| s.stats) {
        info!(
            "beacons sent {}, send failures {}, datagrams received {}, dropped {}, hosts evicted {}",
            stats.beacons_sent,
            stats.send_failures,
            stats.datagrams_received,
            stats.datagrams_dropped,
            stats.hosts_evicted
        );
    }
}

async fn run_host(
    controller: &SessionRoleController,
    config: &AppConfig,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    into_result(ui_bridge::start_hosting(controller, config)).context("failed to start hosting")?;
    info!("hosting; press Ctrl-C to stop");

    while running.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    log_final_stats(controller);
    Ok(())
}

async fn run_discover(
    controller: &Arc<SessionRoleController>,
    config: &AppConfig,
    args: &DiscoverArgs,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    into_result(ui_bridge::start_discovering(controller, config))
        .context("failed to start discovery")?;
    info!("discovering; press Ctrl-C to stop");

    let mut shown: Option<Vec<(String, u16, String)>> = None;
    let mut chosen = None;

    while running.load(Ordering::Relaxed) {
        let hosts = into_result(ui_bridge::get_hosts(controller))?.unwrap_or_default();
        let current = host_list_key(&hosts);

        if shown.as_ref() != Some(&current) {
            print_hosts(&hosts, args.json)?;
            shown = Some(current);
        }

        if args.connect {
            if let Some(first) = controller.discovered_hosts().into_iter().next() {
                chosen = Some(first);
                break;
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    log_final_stats(controller);
    let Some(host) = chosen else {
        return Ok(());
    };

    // Free the discovery port before the game session starts.
    stop_controller(controller).await?;

    let mut initiator = ConnectionInitiator::new(TcpSessionTransport::new(config.connect_timeout()));
    if let Some(required) = &config.connect.required_version {
        initiator = initiator.with_required_version(required.clone());
    }
    let handle = initiator
        .connect(&host)
        .await
        .with_context(|| format!("could not join {}", host.session_addr()))?;
    info!(
        "joined {} (session {}, version {})",
        handle.peer, handle.session_id, handle.game_version
    );
    Ok(())
}

/// Identity of a host list, ignoring ages.
fn host_list_key(hosts: &[HostDto]) -> Vec<(String, u16, String)> {
    hosts
        .iter()
        .map(|h| (h.address.clone(), h.advertised_port, h.game_version.clone()))
        .collect()
}

fn print_hosts(dtos: &[HostDto], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(&dtos)?);
        return Ok(());
    }

    if dtos.is_empty() {
        println!("no hosts found");
    } else {
        println!("{} host(s):", dtos.len());
        for h in dtos {
            println!(
                "  {}:{}  version {}  (seen {} ms ago)",
                h.address, h.advertised_port, h.game_version, h.age_ms
            );
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
