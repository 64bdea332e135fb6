//! walletwatch — wallet balance monitoring service.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! registers the configured wallets, starts the periodic monitor, and
//! serves the balance API until ctrl-c.

use anyhow::Result;
use tracing::info;

use walletwatch::api;
use walletwatch::browser::webdriver::WebDriverLauncher;
use walletwatch::cache::CacheStore;
use walletwatch::config::AppConfig;
use walletwatch::monitor::WalletMonitor;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;

    init_logging();

    info!(
        wallets = cfg.wallets.len(),
        interval_secs = cfg.monitor.interval_secs,
        cache_file = %cfg.cache.file,
        "walletwatch starting up"
    );

    let cache = CacheStore::with_retention(&cfg.cache.file, cfg.cache.max_entries_per_wallet);
    let monitor = WalletMonitor::new(
        cfg.monitor.clone(),
        cfg.scraping.clone(),
        Box::new(WebDriverLauncher),
        cache,
    );

    monitor.set_wallets(cfg.wallets.clone()).await;
    monitor.start(cfg.interval()).await;

    api::spawn_server(monitor.clone(), cfg.api.port).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    monitor.stop();

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,walletwatch=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
