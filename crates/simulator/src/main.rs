//! NPC Simulator
//!
//! Entry point for the Wojak Earth background simulation. Serves the
//! activity endpoint, optionally runs batches on a timer, and can run or
//! seed the world from the command line.

use activity_server::{ActivityServer, GenerateActivityRequest, ServerContext};
use anyhow::Result;
use clap::{Parser, Subcommand};
use npc_engine::{ActivityEngine, BatchConfig, DEFAULT_ACTIVITY_COUNT};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use world_store::{MemoryStore, SledStore, WorldSeed, WorldStore};

mod config;

use config::SimulatorConfig;

/// Wojak Earth NPC activity simulator
#[derive(Parser, Debug)]
#[command(name = "npc-simulator")]
#[command(about = "Background NPC activity for Wojak Earth", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for the world store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Keep the world in memory instead of on disk
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the activity endpoint
    Serve {
        /// HTTP bind address
        #[arg(long)]
        addr: Option<String>,

        /// Run a batch every N seconds (0 = only on request)
        #[arg(long)]
        tick_secs: Option<u64>,
    },
    /// Run one batch and print the report
    Run {
        /// Number of NPC turns
        #[arg(long, default_value_t = DEFAULT_ACTIVITY_COUNT)]
        count: usize,

        /// Allowed actions, e.g. TRAVEL,MINE,BUY
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,

        /// Travel strategy (random, popular, difficulty-based)
        #[arg(long)]
        bias: Option<String>,

        /// Personality pool, e.g. casual,trader
        #[arg(long, value_delimiter = ',')]
        personalities: Vec<String>,

        /// Let exhausted NPCs act anyway
        #[arg(long)]
        force: bool,
    },
    /// Load a world document into the store
    Seed {
        /// JSON world document
        file: PathBuf,
    },
}

/// Store handles for one process
struct World {
    store: Arc<dyn WorldStore>,
    disk: Option<Arc<SledStore>>,
}

impl World {
    fn open(config: &SimulatorConfig, in_memory: bool) -> Result<Self> {
        if in_memory {
            tracing::info!("Using in-memory world store");
            return Ok(Self {
                store: Arc::new(MemoryStore::new()),
                disk: None,
            });
        }

        std::fs::create_dir_all(&config.data_dir)?;
        let disk = Arc::new(SledStore::open(config.data_dir.join("world"))?);
        Ok(Self {
            store: disk.clone(),
            disk: Some(disk),
        })
    }

    /// Seed from the configured file when the store has no characters
    fn seed_if_empty(&self, config: &SimulatorConfig) -> Result<()> {
        if !self.store.characters()?.is_empty() {
            return Ok(());
        }
        match &config.seed_file {
            Some(path) => {
                let seed = WorldSeed::load(path)?;
                self.store.seed(&seed)?;
                tracing::info!("Seeded empty world from {:?}", path);
            }
            None => tracing::warn!("World store is empty and no seed_file is configured"),
        }
        Ok(())
    }

    fn flush(&self) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.flush() {
                tracing::error!("Failed to flush world store: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &args.config {
        Some(path) => SimulatorConfig::load(path)?,
        None => SimulatorConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }

    let world = World::open(&config, args.memory)?;

    match args.command {
        Command::Serve { addr, tick_secs } => {
            if let Some(addr) = addr {
                config.http_addr = addr;
            }
            if let Some(secs) = tick_secs {
                config.tick_secs = secs;
            }
            world.seed_if_empty(&config)?;
            serve(config, world).await
        }
        Command::Run {
            count,
            types,
            bias,
            personalities,
            force,
        } => {
            world.seed_if_empty(&config)?;
            let request = GenerateActivityRequest {
                activity_count: Some(count),
                activity_types: (!types.is_empty()).then_some(types),
                location_bias: bias,
                npc_personalities: (!personalities.is_empty()).then_some(personalities),
                market_volatility: None,
                force_actions: Some(force),
            };
            let batch = request.into_config(config.max_activity_count);
            let result = run_once(&config, &world, &batch);
            world.flush();
            result
        }
        Command::Seed { file } => {
            let seed = WorldSeed::load(&file)?;
            world.store.seed(&seed)?;
            world.flush();
            tracing::info!("Seeded world from {:?}", file);
            Ok(())
        }
    }
}

fn engine_for(config: &SimulatorConfig, world: &World) -> ActivityEngine {
    ActivityEngine::new(world.store.clone()).with_excluded(config.excluded())
}

/// Run a single batch and print its report as JSON
fn run_once(config: &SimulatorConfig, world: &World, batch: &BatchConfig) -> Result<()> {
    let engine = engine_for(config, world);
    let report = engine.run_batch(batch, &mut StdRng::from_entropy())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Serve the HTTP endpoint until Ctrl+C
async fn serve(config: SimulatorConfig, world: World) -> Result<()> {
    tracing::info!("Starting Wojak Earth NPC simulator");
    tracing::info!("  HTTP: {}", config.http_addr);
    tracing::info!("  Data directory: {:?}", config.data_dir);
    tracing::info!("  Max turns per batch: {}", config.max_activity_count);
    tracing::info!("  Batch interval: {}s", config.tick_secs);

    let engine = engine_for(&config, &world);
    let server_config = config.server();
    let context = Arc::new(ServerContext {
        engine: engine.clone(),
        max_activity_count: server_config.max_activity_count,
    });

    let http_addr = server_config.http_addr.clone();
    let http_server = tokio::spawn(async move {
        let server = ActivityServer::new(context);
        if let Err(e) = server.run(&http_addr).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    let ticker = (config.tick_secs > 0).then(|| {
        let batch = BatchConfig {
            activity_count: DEFAULT_ACTIVITY_COUNT.min(config.max_activity_count),
            ..Default::default()
        };
        tokio::spawn(run_periodic(engine, batch, config.tick_secs))
    });

    tracing::info!("Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    if let Some(ticker) = ticker {
        ticker.abort();
    }
    http_server.abort();
    world.flush();

    tracing::info!("Simulator stopped");
    Ok(())
}

/// Run a batch every `secs` seconds
async fn run_periodic(engine: ActivityEngine, batch: BatchConfig, secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let engine = engine.clone();
        let batch = batch.clone();
        let result = tokio::task::spawn_blocking(move || {
            engine.run_batch(&batch, &mut StdRng::from_entropy())
        })
        .await;

        match result {
            Ok(Ok(report)) => tracing::debug!(
                "Scheduled batch produced {} actions",
                report.actions.len()
            ),
            Ok(Err(e)) => tracing::warn!("Scheduled batch failed: {}", e),
            Err(e) => tracing::error!("Scheduled batch task panicked: {}", e),
        }
    }
}
