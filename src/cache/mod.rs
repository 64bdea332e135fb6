//! Durable balance history cache.
//!
//! Remembers only trustworthy observations: an entry is persisted iff its
//! balance parses to a finite number > 0 and its status is not
//! unavailable. Placeholder and error strings never enter the store, so
//! consumers can chart the history without scrubbing it first.
//!
//! The store is a single JSON document, read fully and written fully on
//! each append — acceptable because retention is capped per wallet. Writes
//! go to a temp sibling and rename over the target so a crash can't leave
//! a truncated document.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::extract::parse_currency;
use crate::types::{is_placeholder, CacheEntry, CacheHistory, EntryStatus, Platform, WalletStats};

/// Default retained entries per wallet.
pub const DEFAULT_MAX_ENTRIES_PER_WALLET: usize = 20;

/// Cap on cross-wallet history reads.
const ALL_HISTORY_DEFAULT_LIMIT: usize = 500;

pub struct CacheStore {
    path: PathBuf,
    max_entries_per_wallet: usize,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_entries_per_wallet: DEFAULT_MAX_ENTRIES_PER_WALLET,
        }
    }

    pub fn with_retention(path: impl Into<PathBuf>, max_entries_per_wallet: usize) -> Self {
        Self {
            path: path.into(),
            max_entries_per_wallet,
        }
    }

    // -- Document IO -----------------------------------------------------

    /// Read the full document, creating an empty one if absent. A corrupt
    /// document is replaced by an empty one rather than poisoning every
    /// caller — history is best-effort by design.
    fn read(&self) -> CacheHistory {
        if !Path::new(&self.path).exists() {
            let fresh = CacheHistory::empty();
            if let Err(e) = self.write(&fresh) {
                warn!(error = %e, "Failed to initialize cache file");
            } else {
                info!(path = %self.path.display(), "Initialized wallet cache file");
            }
            return fresh;
        }

        match std::fs::read_to_string(&self.path)
            .context("read cache file")
            .and_then(|raw| serde_json::from_str(&raw).context("parse cache file"))
        {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Unreadable cache, starting empty");
                CacheHistory::empty()
            }
        }
    }

    /// Whole-document atomic overwrite: serialize, write a temp sibling,
    /// rename into place.
    fn write(&self, history: &CacheHistory) -> Result<()> {
        let json = serde_json::to_string_pretty(history)
            .context("Failed to serialize cache history")?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .context(format!("Failed to write cache temp file {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).context(format!(
            "Failed to move cache into place at {}",
            self.path.display()
        ))?;

        Ok(())
    }

    // -- Mutation --------------------------------------------------------

    /// Append a validated observation.
    ///
    /// No-op (logged) when the balance is a placeholder string, does not
    /// parse to a finite value > 0, or the status is unavailable. On
    /// success, evicts this wallet's oldest entries beyond the retention
    /// cap; other wallets' history is untouched.
    pub fn append(
        &self,
        wallet_name: &str,
        balance: &str,
        platform: Platform,
        status: EntryStatus,
    ) {
        if status == EntryStatus::Unavailable || is_placeholder(balance) {
            debug!(
                wallet = %wallet_name,
                %balance,
                %status,
                "Skipping invalid value, not saving to history"
            );
            return;
        }

        let numeric = parse_currency(balance);
        if !numeric.map_or(false, |v| v.is_finite() && v > 0.0) {
            debug!(
                wallet = %wallet_name,
                %balance,
                "Skipping non-numeric or non-positive value"
            );
            return;
        }

        let mut history = self.read();

        history.entries.push(CacheEntry {
            wallet_name: wallet_name.to_string(),
            balance: balance.to_string(),
            platform,
            timestamp: Utc::now().to_rfc3339(),
            status,
        });
        history.last_updated = Utc::now().to_rfc3339();

        self.evict_oldest(&mut history, wallet_name);

        if let Err(e) = self.write(&history) {
            warn!(error = %e, wallet = %wallet_name, "Failed to persist cache entry");
            return;
        }
        debug!(wallet = %wallet_name, %balance, "Cache entry added");
    }

    /// FIFO eviction scoped to one wallet: drop its oldest entries until
    /// at most `max_entries_per_wallet` remain.
    fn evict_oldest(&self, history: &mut CacheHistory, wallet_name: &str) {
        let count = history
            .entries
            .iter()
            .filter(|e| e.wallet_name == wallet_name)
            .count();

        let mut excess = count.saturating_sub(self.max_entries_per_wallet);
        if excess == 0 {
            return;
        }

        history.entries.retain(|e| {
            if excess > 0 && e.wallet_name == wallet_name {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    // -- Queries ---------------------------------------------------------

    /// One wallet's entries, most recent first, capped at `limit`.
    pub fn history(&self, wallet_name: &str, limit: usize) -> Vec<CacheEntry> {
        let history = self.read();
        let mut entries: Vec<CacheEntry> = history
            .entries
            .into_iter()
            .filter(|e| e.wallet_name == wallet_name)
            .collect();
        entries.reverse();
        entries.truncate(limit);
        entries
    }

    /// All wallets' entries interleaved, most recent first.
    pub fn all_history(&self, limit: Option<usize>) -> Vec<CacheEntry> {
        let history = self.read();
        let mut entries = history.entries;
        entries.reverse();
        entries.truncate(limit.unwrap_or(ALL_HISTORY_DEFAULT_LIMIT));
        entries
    }

    /// The most recent entry for every wallet that has at least one.
    pub fn latest_by_wallet(&self) -> HashMap<String, CacheEntry> {
        let history = self.read();
        let mut latest: HashMap<String, CacheEntry> = HashMap::new();
        for entry in history.entries.into_iter().rev() {
            latest
                .entry(entry.wallet_name.clone())
                .or_insert(entry);
        }
        latest
    }

    /// Derived statistics for one wallet, or None when it has no entries
    /// with parseable values. Entries that fail to parse are skipped.
    pub fn stats(&self, wallet_name: &str) -> Option<WalletStats> {
        let history = self.read();
        let entries: Vec<&CacheEntry> = history
            .entries
            .iter()
            .filter(|e| e.wallet_name == wallet_name)
            .collect();

        if entries.is_empty() {
            return None;
        }

        let values: Vec<f64> = entries
            .iter()
            .filter_map(|e| parse_currency(&e.balance))
            .collect();

        if values.is_empty() {
            return None;
        }

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        let current = *values.last().unwrap_or(&0.0);
        let first = *values.first().unwrap_or(&0.0);
        let change = current - first;
        let change_percent = if first != 0.0 {
            change / first * 100.0
        } else {
            0.0
        };

        Some(WalletStats {
            wallet_name: wallet_name.to_string(),
            current_balance: current,
            min_balance: min,
            max_balance: max,
            avg_balance: avg,
            change,
            change_percent,
            total_entries: entries.len(),
            first_entry: entries.first().map(|e| e.timestamp.clone()).unwrap_or_default(),
            last_entry: entries.last().map(|e| e.timestamp.clone()).unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
