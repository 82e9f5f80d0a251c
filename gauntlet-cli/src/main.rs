mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gauntlet")]
#[command(about = "Survival-game randomness keeper over a simulated chain")]
#[command(version)]
struct Cli {
    /// Data directory for chain and round storage
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a fresh simulated chain
    Init {
        /// Network identity baked into every seed
        #[arg(long, default_value_t = 1)]
        chain_id: u64,
        /// Native recent-hash window in blocks
        #[arg(long, default_value_t = 256)]
        native_window: u64,
        /// Extended history window in blocks, omit for chains without one
        #[arg(long)]
        archive_window: Option<u64>,
    },
    /// Seal new blocks on the simulated chain
    Mine {
        /// Number of blocks
        #[arg(default_value_t = 1)]
        count: u64,
    },
    /// Commit a round to a future block
    Commit {
        /// Round identifier (nonzero)
        round_id: u64,
        /// Commit-to-reveal delay in blocks
        #[arg(long, default_value_t = 2)]
        delay: u64,
    },
    /// Reveal a round's seed from its target block hash
    Reveal {
        /// Round identifier
        round_id: u64,
    },
    /// Show one round's lifecycle state
    Status {
        /// Round identifier
        round_id: u64,
    },
    /// List all rounds
    List,
    /// Draw ranged values from a revealed round
    Draw {
        /// Round identifier
        round_id: u64,
        /// Exclusive upper bound
        #[arg(long)]
        max: u64,
        /// Number of independent draws
        #[arg(long, default_value_t = 1)]
        count: u64,
    },
    /// Run a survival check against a revealed round
    Flip {
        /// Round identifier
        round_id: u64,
        /// Survival probability in basis points
        #[arg(long, default_value_t = 5000)]
        bps: u64,
    },
    /// Dump the audit log for a round
    Events {
        /// Round identifier
        round_id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "gauntlet={},blockseed_engine={},blockseed_core={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gauntlet")
    });

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    // Execute command
    let result = match cli.command {
        Commands::Init {
            chain_id,
            native_window,
            archive_window,
        } => commands::init_chain(&data_dir, chain_id, native_window, archive_window).await,
        Commands::Mine { count } => commands::mine(&data_dir, count).await,
        Commands::Commit { round_id, delay } => commands::commit(&data_dir, round_id, delay).await,
        Commands::Reveal { round_id } => commands::reveal(&data_dir, round_id).await,
        Commands::Status { round_id } => commands::status(&data_dir, round_id).await,
        Commands::List => commands::list(&data_dir).await,
        Commands::Draw {
            round_id,
            max,
            count,
        } => commands::draw(&data_dir, round_id, max, count).await,
        Commands::Flip { round_id, bps } => commands::flip(&data_dir, round_id, bps).await,
        Commands::Events { round_id } => commands::events(&data_dir, round_id).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
