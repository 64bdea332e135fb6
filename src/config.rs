//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The scraping timeouts, settle waits, and the plausibility floor are
//! empirically chosen from observed site behavior, so they live here
//! rather than being baked into the strategies.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::WalletConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// Initial wallet set; the hosting application may replace it wholesale
    /// at runtime via `WalletMonitor::set_wallets`.
    #[serde(default)]
    pub wallets: Vec<WalletConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Periodic re-scrape interval.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Fixed delay between consecutive wallets within one pass.
    /// Sequential spacing is an anti-detection measure, keep it a few seconds.
    #[serde(default = "default_wallet_delay_secs")]
    pub wallet_delay_secs: u64,
    /// Wait before the first pass after startup or a forced refresh,
    /// giving sites a moment before the burst of navigations.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapingConfig {
    /// Values parsing below this are treated as noise, not balances.
    #[serde(default = "default_min_plausible")]
    pub min_plausible_value: f64,
    /// Hard wall-clock budget per strategy, by platform family.
    #[serde(default = "default_debank_timeout")]
    pub debank_timeout_secs: u64,
    #[serde(default = "default_jupiter_portfolio_timeout")]
    pub jupiter_portfolio_timeout_secs: u64,
    #[serde(default = "default_jupiter_timeout")]
    pub jupiter_timeout_secs: u64,
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
    #[serde(default = "default_explorer_timeout")]
    pub explorer_timeout_secs: u64,
    #[serde(default = "default_generic_timeout")]
    pub generic_timeout_secs: u64,
    /// Settle wait after navigation, letting client-side rendering finish.
    #[serde(default = "default_debank_settle")]
    pub debank_settle_secs: u64,
    #[serde(default = "default_jupiter_settle")]
    pub jupiter_settle_secs: u64,
    #[serde(default = "default_generic_settle")]
    pub generic_settle_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_file")]
    pub file: String,
    /// Retained entries per wallet; oldest beyond this are evicted.
    #[serde(default = "default_max_entries")]
    pub max_entries_per_wallet: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_interval_secs() -> u64 {
    3600
}
fn default_wallet_delay_secs() -> u64 {
    5
}
fn default_startup_delay_secs() -> u64 {
    15
}
fn default_min_plausible() -> f64 {
    10.0
}
fn default_debank_timeout() -> u64 {
    60
}
fn default_jupiter_portfolio_timeout() -> u64 {
    30
}
fn default_jupiter_timeout() -> u64 {
    45
}
fn default_ready_timeout() -> u64 {
    45
}
fn default_explorer_timeout() -> u64 {
    30
}
fn default_generic_timeout() -> u64 {
    30
}
fn default_debank_settle() -> u64 {
    10
}
fn default_jupiter_settle() -> u64 {
    3
}
fn default_generic_settle() -> u64 {
    2
}
fn default_cache_file() -> String {
    "wallet-cache.json".to_string()
}
fn default_max_entries() -> usize {
    20
}
fn default_api_port() -> u16 {
    8090
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            min_plausible_value: default_min_plausible(),
            debank_timeout_secs: default_debank_timeout(),
            jupiter_portfolio_timeout_secs: default_jupiter_portfolio_timeout(),
            jupiter_timeout_secs: default_jupiter_timeout(),
            ready_timeout_secs: default_ready_timeout(),
            explorer_timeout_secs: default_explorer_timeout(),
            generic_timeout_secs: default_generic_timeout(),
            debank_settle_secs: default_debank_settle(),
            jupiter_settle_secs: default_jupiter_settle(),
            generic_settle_secs: default_generic_settle(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file: default_cache_file(),
            max_entries_per_wallet: default_max_entries(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            wallet_delay_secs: default_wallet_delay_secs(),
            startup_delay_secs: default_startup_delay_secs(),
        }
    }
}

impl AppConfig {
    /// Load and parse configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .context(format!("Failed to read config file: {path}"))?;
        let cfg: AppConfig =
            toml::from_str(&raw).context(format!("Failed to parse config file: {path}"))?;
        Ok(cfg)
    }

    /// Defaults for tests and embedded use, no file required.
    pub fn default_config() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            scraping: ScrapingConfig::default(),
            cache: CacheConfig::default(),
            api: ApiConfig::default(),
            wallets: Vec::new(),
        }
    }

    pub fn wallet_delay(&self) -> Duration {
        Duration::from_secs(self.monitor.wallet_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_secs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
