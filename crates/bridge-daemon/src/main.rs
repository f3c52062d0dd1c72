//! `bridged`: runs and inspects the ops bridge

use anyhow::{Context, Result};
use bridge_daemon::{Bridge, BridgeConfig};
use bridge_naming::{RoomIdentityFactory, TopologyLevel};
use bridge_platform::{InMemoryPlatform, UserAccount};
use bridge_reconcile::PurgeOptions;
use bridge_topology::StaticTopologyFeed;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bridged", version, about = "Mirror a component topology onto chat rooms and spaces")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the supervised daemons against an in-process platform until Ctrl-C
    Run {
        /// Topology JSON served by the feed
        #[arg(long)]
        topology: PathBuf,
        /// Local users to register with the directory
        #[arg(long, value_delimiter = ',')]
        users: Vec<String>,
    },
    /// Run a fixed number of cycles and print the reports as JSON
    Simulate {
        #[arg(long)]
        topology: PathBuf,
        #[arg(long, default_value_t = 2)]
        cycles: u32,
        #[arg(long, value_delimiter = ',')]
        users: Vec<String>,
    },
    /// Print the canonical aliases of a participant's space and sub-rooms
    Aliases {
        participant: String,
        #[arg(long, value_enum)]
        level: LevelArg,
    },
    /// Provision a topology in-process, then purge it
    Purge {
        #[arg(long)]
        topology: PathBuf,
        /// Only rooms whose alias starts with this prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Delete instead of planning
        #[arg(long)]
        execute: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LevelArg {
    Subsystem,
    Workshop,
    Wup,
    Endpoint,
}

impl From<LevelArg> for TopologyLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Subsystem => TopologyLevel::Subsystem,
            LevelArg::Workshop => TopologyLevel::Workshop,
            LevelArg::Wup => TopologyLevel::WorkUnitProcessor,
            LevelArg::Endpoint => TopologyLevel::Endpoint,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}

/// In-process platform and a bridge around it
fn in_memory_bridge(
    config: BridgeConfig,
    topology: &Path,
    users: &[String],
) -> Result<(Arc<InMemoryPlatform>, Bridge)> {
    let feed = StaticTopologyFeed::from_path(topology)
        .with_context(|| format!("loading topology from {}", topology.display()))?;
    let platform = Arc::new(InMemoryPlatform::new(config.server_name.clone()));
    for local in users {
        platform.add_account(UserAccount::new(format!("@{local}:{}", config.server_name)));
    }
    let bridge = Bridge::new(config, Arc::clone(&platform), platform.clone(), Arc::new(feed));
    Ok((platform, bridge))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run { topology, users } => {
            let (_platform, bridge) = in_memory_bridge(config, &topology, &users)?;
            let supervisor = bridge.start();
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            tracing::info!("Shutdown requested");
            supervisor.shutdown().await;
        }
        Command::Simulate {
            topology,
            cycles,
            users,
        } => {
            let period = chrono::Duration::seconds(
                i64::try_from(config.topology_sync_period_secs).context("topology sync period")?,
            );
            let (platform, bridge) = in_memory_bridge(config, &topology, &users)?;
            let mut now = Utc::now();
            let mut reports = Vec::new();
            for _ in 0..cycles {
                let cycle = bridge.driver().run_cycle(now).await?;
                let membership = bridge.membership().run_cycle(now).await?;
                reports.push(serde_json::json!({ "cycle": cycle, "membership": membership }));
                now += period;
            }
            let summary = serde_json::json!({
                "reports": reports,
                "stats": bridge.driver().stats(),
                "rooms": platform.room_count(),
                "cache": bridge.rooms().stats(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Aliases { participant, level } => {
            let factory = RoomIdentityFactory::with_server_name(config.server_name);
            let level = TopologyLevel::from(level);
            let types = std::iter::once(level.space_type()).chain(level.sub_room_types().iter().copied());
            for room_type in types {
                let alias = factory.canonical_alias(&participant, room_type)?;
                println!("{:<28} {alias}", room_type.to_string());
            }
        }
        Command::Purge {
            topology,
            prefix,
            execute,
        } => {
            let (_platform, bridge) = in_memory_bridge(config, &topology, &[])?;
            bridge.driver().run_cycle(Utc::now()).await?;

            let mut options = PurgeOptions::default();
            if let Some(prefix) = prefix {
                options = options.with_prefix(prefix);
            }
            if execute {
                options = options.execute();
            }
            let report = bridge.purge().run(&options).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
