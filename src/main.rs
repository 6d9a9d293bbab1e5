//! Risk Probe - run a single launch-risk check from the command line
//!
//! Every check prints its outcome as JSON. A provider failure is reported as
//! an absent value, not as a process error.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use launch_risk::config::Config;
use launch_risk::provider::ProviderClients;
use launch_risk::risk::{
    CreatorRiskProfiler, HolderPnlAnalyzer, LpRemovalDetector, RiskMonitor, TokenTarget,
};
use launch_risk::storage::MemorySnapshotStore;

/// Risk Probe - launch risk signals for a single token
#[derive(Parser)]
#[command(name = "risk-probe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile a token creator by its launch history
    Creator {
        /// Creator wallet address
        wallet: String,
    },

    /// Show the deepest liquidity pool for a mint
    Pool {
        /// Token mint address
        mint: String,
    },

    /// Aggregate PnL of the top holders of a mint
    Holders {
        /// Token mint address
        mint: String,

        /// Number of top holders to inspect (default: from config)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Check stored snapshots for liquidity removal
    Lp {
        /// Token id used in the snapshot file
        token: String,

        /// JSON array of snapshots
        #[arg(long, value_name = "FILE")]
        snapshots: PathBuf,
    },

    /// Run every check for one token
    Assess {
        /// Token mint address
        mint: String,

        /// JSON array of snapshots
        #[arg(long, value_name = "FILE")]
        snapshots: PathBuf,

        /// Token id used in the snapshot file (default: the mint)
        #[arg(long)]
        token_id: Option<String>,

        /// Creator wallet address
        #[arg(long)]
        creator: Option<String>,

        /// Current score, checked against the holder analysis gate
        #[arg(long, default_value = "0")]
        score: f64,
    },
}

#[derive(Serialize)]
struct LpReport<A, B> {
    token_id: String,
    lp_removal: A,
    cumulative_removal: B,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let clients = ProviderClients::from_config(&config).context("Failed to build provider clients")?;

    let result = run(cli.command, &config, &clients).await;

    clients.close().await;

    match result {
        Ok(json) => {
            println!("{}", json);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("launch_risk=info".parse().context("Invalid log directive")?);

    // Logs go to stderr so stdout stays valid JSON
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn run(command: Commands, config: &Config, clients: &ProviderClients) -> Result<String> {
    match command {
        Commands::Creator { wallet } => {
            let profiler = CreatorRiskProfiler::new(clients.creator_history.clone());
            to_json(&profiler.assess(&wallet).await)
        }
        Commands::Pool { mint } => to_json(&clients.pools.get_pool_info(&mint).await),
        Commands::Holders { mint, limit } => {
            let analyzer =
                HolderPnlAnalyzer::new(clients.holders.clone(), config.holder_analysis.clone());
            let limit = limit.unwrap_or(config.holder_analysis.max_holders);
            to_json(&analyzer.analyze_holders(&mint, limit).await)
        }
        Commands::Lp { token, snapshots } => {
            let store = MemorySnapshotStore::load_json(&snapshots).await?;
            info!(token = %token, snapshots = store.len(&token), "Loaded snapshots");

            let detector = LpRemovalDetector::new(Arc::new(store));
            let (lp_removal, cumulative_removal) =
                tokio::join!(detector.detect(&token), detector.cumulative(&token));
            to_json(&LpReport {
                token_id: token,
                lp_removal,
                cumulative_removal,
            })
        }
        Commands::Assess {
            mint,
            snapshots,
            token_id,
            creator,
            score,
        } => {
            let store = MemorySnapshotStore::load_json(&snapshots).await?;
            let monitor = RiskMonitor::new(
                Arc::new(store),
                clients.creator_history.clone(),
                clients.pools.clone(),
                clients.holders.clone(),
                config.holder_analysis.clone(),
            );
            let target = TokenTarget {
                token_id: token_id.unwrap_or_else(|| mint.clone()),
                mint,
                creator,
                current_score: score,
            };
            to_json(&monitor.assess(&target).await)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize result")
}
