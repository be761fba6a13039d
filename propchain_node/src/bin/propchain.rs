use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use propchain_node::{
    api::{serve, AppState},
    auth::TokenIssuer,
    chain::{ArtifactRegistry, DisabledLedger, EthLedger, Ledger},
    config::Config,
    db::Database,
    seed::ensure_seeded,
    storage::Storage,
};
use std::path::PathBuf;
use std::sync::Arc;

/// PropChain node arguments
#[derive(Parser)]
#[clap(name = "propchain")]
#[clap(about = "PropChain marketplace backend with Ganache contract integration")]
struct Args {
    /// Path to a YAML configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// API port, overriding the configuration
    #[clap(long)]
    port: Option<u16>,

    /// Skip seeding even when the database is empty
    #[clap(long, conflicts_with = "reseed")]
    no_seed: bool,

    /// Clear and reseed users and properties on startup
    #[clap(long)]
    reseed: bool,
}

#[cfg(feature = "rocksdb")]
fn open_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = propchain_node::storage::RocksStorage::open(&config.data_dir)
        .with_context(|| format!("opening RocksDB at {}", config.data_dir.display()))?;
    info!("[DB] RocksDB opened at {}", config.data_dir.display());
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "rocksdb"))]
fn open_storage(_config: &Config) -> Result<Arc<dyn Storage>> {
    info!("[DB] Using in-memory storage; data is lost on restart");
    Ok(Arc::new(propchain_node::storage::MemoryStorage::new()))
}

fn open_ledger(config: &Config, artifacts: Arc<ArtifactRegistry>) -> Result<Arc<dyn Ledger>> {
    if !config.chain_enabled {
        warn!("[CHAIN] Blockchain integration disabled");
        return Ok(Arc::new(DisabledLedger));
    }
    let ledger = EthLedger::new(config, artifacts).context("configuring the chain client")?;
    info!("[CHAIN] Using node at {}", config.blockchain_url);
    Ok(Arc::new(ledger))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    info!("Starting PropChain node v{}", env!("CARGO_PKG_VERSION"));

    let db = Arc::new(Database::new(open_storage(&config)?));
    let stats = db.storage().get_stats().await?;
    info!(
        "[DB] {} entries, {} bytes",
        stats.num_entries, stats.total_size
    );
    let artifacts = Arc::new(ArtifactRegistry::load(&config.contracts_dir, &config.network_id));
    let ledger = open_ledger(&config, artifacts.clone())?;

    match ledger.status().await {
        Ok(status) => info!(
            "[CHAIN] Connected: chain id {}, network {}, block {}",
            status.chain_id, status.network_id, status.block_number
        ),
        Err(e) => warn!("[CHAIN] Not reachable yet: {}", e),
    }

    if args.no_seed {
        info!("[Seed] Skipped (--no-seed)");
    } else if let Some(summary) = ensure_seeded(&db, ledger.as_ref(), args.reseed).await? {
        info!(
            "[Seed] {} users, {} properties ({} registered on chain)",
            summary.users, summary.properties, summary.registered_on_chain
        );
    }

    let state = AppState {
        db: db.clone(),
        ledger,
        artifacts,
        tokens: Arc::new(TokenIssuer::new(&config.jwt_secret, config.jwt_expiry_hours)),
    };
    serve(state, config.port).await?;

    db.storage().flush().await.context("flushing storage")?;
    info!("Shutdown complete");
    Ok(())
}
