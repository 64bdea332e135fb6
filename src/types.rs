//! Shared types for the wallet monitor.
//!
//! These types form the data model used across all modules: the wallet
//! configuration consumed from the hosting application, the transient
//! scrape result, the latest-value display entry, and the durable cache
//! record. They are designed to be stable so that platform, monitor,
//! and cache modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Display placeholders
// ---------------------------------------------------------------------------

/// Shown before the very first pass has touched a wallet.
pub const PLACEHOLDER_LOADING_EN: &str = "Loading...";
/// Shown while a forced refresh is in flight.
pub const PLACEHOLDER_LOADING: &str = "Carregando...";
/// Shown when the page loaded but no plausible balance was found.
pub const PLACEHOLDER_UNAVAILABLE: &str = "Indisponível";
/// Shown when navigation or extraction failed outright.
pub const PLACEHOLDER_ERROR: &str = "Erro ao carregar";

/// Whether a display string is a placeholder rather than a real balance.
/// Placeholders must never enter the durable history.
pub fn is_placeholder(balance: &str) -> bool {
    matches!(
        balance,
        "" | PLACEHOLDER_LOADING_EN
            | PLACEHOLDER_LOADING
            | "Carregando"
            | PLACEHOLDER_UNAVAILABLE
            | PLACEHOLDER_ERROR
    )
}

// ---------------------------------------------------------------------------
// Wallet configuration
// ---------------------------------------------------------------------------

/// Identity of a tracked wallet. Immutable once registered; the active set
/// is replaced as a whole, never diffed incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// URL of a balance-showing page on some platform.
    pub link: String,
}

impl WalletConfig {
    pub fn new(name: &str, link: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            link: link.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// The extraction strategy family that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Debank,
    Jupiter,
    Ready,
    Aptoscan,
    Seiscan,
    Generic,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Debank => "debank",
            Platform::Jupiter => "jupiter",
            Platform::Ready => "ready",
            Platform::Aptoscan => "aptoscan",
            Platform::Seiscan => "seiscan",
            Platform::Generic => "generic",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scrape result
// ---------------------------------------------------------------------------

/// Outcome of one extraction attempt. Transient — feeds both the
/// latest-value map and the cache store, never persisted as-is.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// Currency-formatted balance string (e.g. `"$1,250.00"`), if found.
    pub value: Option<String>,
    pub success: bool,
    pub platform: Platform,
    pub error: Option<String>,
    /// The page loaded but nothing plausible matched — distinct from an
    /// error so operators can tell "site changed/empty" from "unreachable".
    pub unavailable: bool,
}

impl ScrapeResult {
    pub fn found(platform: Platform, value: String) -> Self {
        Self {
            value: Some(value),
            success: true,
            platform,
            error: None,
            unavailable: false,
        }
    }

    /// A transient failure: navigation timeout, page crash, driver error.
    pub fn failed(platform: Platform, error: impl Into<String>) -> Self {
        Self {
            value: None,
            success: false,
            platform,
            error: Some(error.into()),
            unavailable: false,
        }
    }

    /// A loaded page with no extractable value.
    pub fn not_found(platform: Platform, error: impl Into<String>) -> Self {
        Self {
            value: None,
            success: false,
            platform,
            error: Some(error.into()),
            unavailable: true,
        }
    }

    pub fn no_value(platform: Platform) -> Self {
        Self::not_found(platform, "No portfolio value found")
    }

    /// How this attempt classifies for the durable history.
    pub fn status(&self) -> EntryStatus {
        if self.success {
            EntryStatus::Success
        } else if self.unavailable {
            EntryStatus::Unavailable
        } else {
            EntryStatus::TemporaryError
        }
    }
}

// ---------------------------------------------------------------------------
// Latest-value entry
// ---------------------------------------------------------------------------

/// Per-wallet current display state. Owned exclusively by the monitor and
/// overwritten on every scrape attempt, so stale "loading" placeholders
/// never persist past a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub link: String,
    /// A currency string, or one of the placeholder strings.
    pub balance: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WalletBalance {
    pub fn placeholder(wallet: &WalletConfig, balance: &str) -> Self {
        Self {
            id: wallet.id.clone(),
            name: wallet.name.clone(),
            link: wallet.link.clone(),
            balance: balance.to_string(),
            last_updated: Utc::now(),
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Durable cache records
// ---------------------------------------------------------------------------

/// Classification of a cache entry. `Unavailable` entries are never
/// persisted; the variant exists so callers can attempt the append and let
/// the store enforce the rule in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Success,
    TemporaryError,
    Unavailable,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryStatus::Success => "success",
            EntryStatus::TemporaryError => "temporary_error",
            EntryStatus::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// A durable, validated balance observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub wallet_name: String,
    /// Currency string; guaranteed to parse to a finite value > 0.
    pub balance: String,
    pub platform: Platform,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    pub status: EntryStatus,
}

/// The full persisted store, ordered oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHistory {
    pub last_updated: String,
    pub entries: Vec<CacheEntry>,
}

impl CacheHistory {
    pub fn empty() -> Self {
        Self {
            last_updated: Utc::now().to_rfc3339(),
            entries: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Derived statistics
// ---------------------------------------------------------------------------

/// Computed on demand from a wallet's entries; never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStats {
    pub wallet_name: String,
    pub current_balance: f64,
    pub min_balance: f64,
    pub max_balance: f64,
    pub avg_balance: f64,
    /// Absolute change from the first to the latest entry.
    pub change: f64,
    pub change_percent: f64,
    pub total_entries: usize,
    pub first_entry: String,
    pub last_entry: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_placeholders() {
        for s in [
            "",
            "Loading...",
            "Carregando...",
            "Carregando",
            "Indisponível",
            "Erro ao carregar",
        ] {
            assert!(is_placeholder(s), "{s:?} should be a placeholder");
        }
        assert!(!is_placeholder("$1,250.00"));
        assert!(!is_placeholder("$10"));
    }

    #[test]
    fn test_platform_serializes_lowercase() {
        let json = serde_json::to_string(&Platform::Debank).unwrap();
        assert_eq!(json, "\"debank\"");
        assert_eq!(Platform::Seiscan.to_string(), "seiscan");
    }

    #[test]
    fn test_entry_status_snake_case() {
        let json = serde_json::to_string(&EntryStatus::TemporaryError).unwrap();
        assert_eq!(json, "\"temporary_error\"");
        let back: EntryStatus = serde_json::from_str("\"unavailable\"").unwrap();
        assert_eq!(back, EntryStatus::Unavailable);
    }

    #[test]
    fn test_cache_entry_round_trip() {
        let entry = CacheEntry {
            wallet_name: "Main".to_string(),
            balance: "$1,911.36".to_string(),
            platform: Platform::Jupiter,
            timestamp: Utc::now().to_rfc3339(),
            status: EntryStatus::Success,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"walletName\":\"Main\""));
        let back: CacheEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.balance, entry.balance);
        assert_eq!(back.platform, Platform::Jupiter);
    }
}
