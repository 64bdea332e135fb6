//! Sequential wallet monitor.
//!
//! Decides when and in what order wallets are scraped, and owns the shared
//! browser session's lifecycle. Wallets are always processed one at a time
//! with a fixed inter-wallet delay — sequential spacing is a deliberate
//! anti-detection measure, not an incidental limitation.
//!
//! The monitor is the single writer of both the in-memory latest-value map
//! and the durable cache store; the API layer only reads. Cancellation is
//! cooperative: each pass carries a token it observes between wallets, so a
//! cancelled pass always closes its browser session on the way out instead
//! of being torn down mid-flight. A pass gate serializes passes — a new
//! pass waits until its cancelled predecessor has finished cleanup.

use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::browser::BrowserLauncher;
use crate::cache::CacheStore;
use crate::config::{MonitorConfig, ScrapingConfig};
use crate::platforms::{select_and_scrape, select_platform};
use crate::types::{
    EntryStatus, ScrapeResult, WalletBalance, WalletConfig, PLACEHOLDER_ERROR,
    PLACEHOLDER_LOADING, PLACEHOLDER_LOADING_EN, PLACEHOLDER_UNAVAILABLE,
};

/// Wallet balance monitor. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct WalletMonitor {
    inner: Arc<MonitorInner>,
}

/// A spawned pass and the token that cancels it cooperatively.
struct PassHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct MonitorInner {
    monitor_cfg: MonitorConfig,
    scraping_cfg: ScrapingConfig,
    launcher: Box<dyn BrowserLauncher>,
    cache: CacheStore,
    /// Active wallet set; replaced wholesale, never diffed.
    wallets: RwLock<Vec<WalletConfig>>,
    /// Latest-value map: one slot per wallet that has been seen.
    balances: RwLock<HashMap<String, WalletBalance>>,
    /// The periodic schedule task, if the monitor is started.
    schedule: Mutex<Option<JoinHandle<()>>>,
    /// The in-flight sequential pass, if any.
    current_pass: Mutex<Option<PassHandle>>,
    /// Held for the duration of every pass: at most one browser session is
    /// scraping at any moment, including across concurrent forced refreshes.
    pass_gate: AsyncMutex<()>,
    /// Interval of the active schedule; None when stopped.
    active_interval: Mutex<Option<Duration>>,
}

impl WalletMonitor {
    pub fn new(
        monitor_cfg: MonitorConfig,
        scraping_cfg: ScrapingConfig,
        launcher: Box<dyn BrowserLauncher>,
        cache: CacheStore,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                monitor_cfg,
                scraping_cfg,
                launcher,
                cache,
                wallets: RwLock::new(Vec::new()),
                balances: RwLock::new(HashMap::new()),
                schedule: Mutex::new(None),
                current_pass: Mutex::new(None),
                pass_gate: AsyncMutex::new(()),
                active_interval: Mutex::new(None),
            }),
        }
    }

    /// Read access to the durable history store.
    pub fn cache(&self) -> &CacheStore {
        &self.inner.cache
    }

    // -- Configuration ---------------------------------------------------

    /// Replace the active wallet set. Takes effect on the next pass; an
    /// in-flight pass completes against the snapshot it started with.
    pub async fn set_wallets(&self, wallets: Vec<WalletConfig>) {
        info!(count = wallets.len(), "Wallet configuration replaced");
        *self.inner.wallets.write().await = wallets;
    }

    // -- Read API --------------------------------------------------------

    /// Current display state for every configured wallet. Always has a
    /// slot per wallet — readers never see "missing".
    pub async fn get_balances(&self) -> HashMap<String, String> {
        let wallets = self.inner.wallets.read().await;
        let balances = self.inner.balances.read().await;

        wallets
            .iter()
            .map(|w| {
                let display = balances
                    .get(&w.name)
                    .map(|b| b.balance.clone())
                    .unwrap_or_else(|| PLACEHOLDER_LOADING_EN.to_string());
                (w.name.clone(), display)
            })
            .collect()
    }

    /// Like [`get_balances`](Self::get_balances) but with link, timestamp,
    /// and error detail, in configuration order.
    pub async fn get_detailed_balances(&self) -> Vec<WalletBalance> {
        let wallets = self.inner.wallets.read().await;
        let balances = self.inner.balances.read().await;

        wallets
            .iter()
            .map(|w| {
                balances
                    .get(&w.name)
                    .cloned()
                    .unwrap_or_else(|| WalletBalance::placeholder(w, PLACEHOLDER_LOADING_EN))
            })
            .collect()
    }

    // -- Lifecycle -------------------------------------------------------

    /// Start periodic monitoring. Seeds every wallet's slot with a loading
    /// placeholder, runs an initial pass after the startup delay, then
    /// re-runs on `interval`. Starting again cancels the previous schedule.
    pub async fn start(&self, interval: Duration) {
        self.stop();

        let wallets = self.inner.wallets.read().await.clone();
        {
            let mut balances = self.inner.balances.write().await;
            for wallet in &wallets {
                balances.insert(
                    wallet.name.clone(),
                    WalletBalance::placeholder(wallet, PLACEHOLDER_LOADING_EN),
                );
            }
        }

        info!(
            interval_secs = interval.as_secs(),
            wallets = wallets.len(),
            "Starting wallet monitor"
        );

        *self.inner.active_interval.lock().unwrap() = Some(interval);
        let startup_delay = Duration::from_secs(self.inner.monitor_cfg.startup_delay_secs);
        let handle = Self::spawn_schedule(self.inner.clone(), interval, startup_delay);
        if let Some(old) = self.inner.schedule.lock().unwrap().replace(handle) {
            old.abort();
        }
    }

    /// Stop periodic monitoring and cancel any in-flight pass. The pass
    /// winds down on its own after closing its browser session.
    pub fn stop(&self) {
        *self.inner.active_interval.lock().unwrap() = None;
        if let Some(handle) = self.inner.schedule.lock().unwrap().take() {
            handle.abort();
        }
        self.inner.cancel_current_pass();
        info!("Wallet monitor stopped");
    }

    /// Cancel pending periodic work, mark every wallet as loading, run one
    /// sequential pass inline, and return the resolved balances. The
    /// periodic schedule (if one was active) resumes afterwards with a
    /// fresh interval.
    pub async fn force_refresh_and_wait(&self) -> Vec<WalletBalance> {
        info!("Force refresh requested");

        let resume_interval = *self.inner.active_interval.lock().unwrap();
        if let Some(handle) = self.inner.schedule.lock().unwrap().take() {
            handle.abort();
        }
        self.inner.cancel_current_pass();

        {
            let wallets = self.inner.wallets.read().await.clone();
            let mut balances = self.inner.balances.write().await;
            for wallet in &wallets {
                balances.insert(
                    wallet.name.clone(),
                    WalletBalance::placeholder(wallet, PLACEHOLDER_LOADING),
                );
            }
        }

        // The pass gate makes this wait for the cancelled pass (if any) to
        // close its session first, and serializes concurrent refreshes.
        MonitorInner::run_pass(&self.inner, CancellationToken::new()).await;

        if let Some(interval) = resume_interval {
            let handle = Self::spawn_schedule(self.inner.clone(), interval, interval);
            if let Some(old) = self.inner.schedule.lock().unwrap().replace(handle) {
                old.abort();
            }
        }

        self.get_detailed_balances().await
    }

    /// Run one pass immediately without touching the schedule. Mostly for
    /// embedding and tests.
    pub async fn run_single_pass(&self) {
        MonitorInner::run_pass(&self.inner, CancellationToken::new()).await;
    }

    // -- Scheduling internals --------------------------------------------

    fn spawn_schedule(
        inner: Arc<MonitorInner>,
        interval: Duration,
        first_delay: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(first_delay).await;
            loop {
                MonitorInner::launch_pass(&inner);
                tokio::time::sleep(interval).await;
            }
        })
    }
}

impl MonitorInner {
    /// Cancel the tracked pass, if any. Cancellation is a signal, not a
    /// teardown: the pass observes its token, closes its browser session,
    /// and releases the pass gate on its own.
    fn cancel_current_pass(&self) {
        if let Some(pass) = self.current_pass.lock().unwrap().take() {
            if !pass.task.is_finished() {
                info!("Cancelling in-flight pass");
            }
            pass.cancel.cancel();
        }
    }

    /// Spawn a pass as a task, cancelling any pass still pending from a
    /// previous tick first. The pass gate keeps the new pass from touching
    /// a browser until the superseded one has cleaned up.
    fn launch_pass(inner: &Arc<MonitorInner>) {
        let mut guard = inner.current_pass.lock().unwrap();
        if let Some(old) = guard.take() {
            if !old.task.is_finished() {
                warn!("Previous pass still running at tick, cancelling it");
            }
            old.cancel.cancel();
        }
        let cancel = CancellationToken::new();
        let task_inner = inner.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            MonitorInner::run_pass(&task_inner, task_cancel).await;
        });
        *guard = Some(PassHandle { cancel, task });
    }

    /// One sequential sweep over the configured wallets.
    ///
    /// Launches a single browser session for the whole pass and closes it
    /// on every exit path, including cancellation. Failures are isolated
    /// per wallet: one wallet's error never aborts the pass for the rest.
    async fn run_pass(inner: &Arc<MonitorInner>, cancel: CancellationToken) {
        let _gate = inner.pass_gate.lock().await;
        if cancel.is_cancelled() {
            return;
        }

        let wallets = inner.wallets.read().await.clone();
        if wallets.is_empty() {
            info!("No wallets configured, skipping pass");
            return;
        }

        info!(wallets = wallets.len(), "Starting sequential pass");

        // A failed launch is not fatal: API-backed strategies still work
        // without a session, the rest report "Browser not available".
        let session = match inner.launcher.launch().await {
            Ok(s) => Some(s),
            Err(e) => {
                error!(error = %e, "Failed to launch browser session");
                None
            }
        };

        let delay = Duration::from_secs(inner.monitor_cfg.wallet_delay_secs);

        'wallets: for (index, wallet) in wallets.iter().enumerate() {
            if index > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => break 'wallets,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            // Catch panics at the per-wallet boundary so a misbehaving
            // extractor can't take down the remaining wallets.
            let scrape = tokio::select! {
                _ = cancel.cancelled() => break 'wallets,
                outcome = AssertUnwindSafe(select_and_scrape(
                    session.as_deref(),
                    &wallet.link,
                    &wallet.name,
                    &inner.scraping_cfg,
                ))
                .catch_unwind() => outcome,
            };

            let result = scrape.unwrap_or_else(|_| {
                error!(wallet = %wallet.name, "Extractor panicked");
                ScrapeResult::failed(select_platform(&wallet.link), "Extractor panicked")
            });

            inner.apply_result(wallet, result).await;
        }

        // Guaranteed cleanup: every exit path of the loop, cancellation
        // included, falls through to here while the gate is still held.
        if let Some(session) = session {
            session.close().await;
        }

        if cancel.is_cancelled() {
            info!("Sequential pass cancelled");
        } else {
            info!("Sequential pass complete");
        }
    }

    /// Fold one scrape outcome into the latest-value map and the durable
    /// cache. The slot is overwritten on success *and* failure, so a
    /// loading placeholder never outlives the attempt.
    async fn apply_result(&self, wallet: &WalletConfig, result: ScrapeResult) {
        let status = result.status();
        // Named to stay clear of `tracing::field::display`, which the
        // `%` sigil expands to inside the macros below.
        let display_value = match (&result.value, status) {
            (Some(value), _) => value.clone(),
            (None, EntryStatus::Unavailable) => PLACEHOLDER_UNAVAILABLE.to_string(),
            (None, _) => PLACEHOLDER_ERROR.to_string(),
        };

        if result.success {
            info!(
                wallet = %wallet.name,
                platform = %result.platform,
                balance = %display_value,
                "Balance updated"
            );
        } else {
            warn!(
                wallet = %wallet.name,
                platform = %result.platform,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Scrape failed"
            );
        }

        self.balances.write().await.insert(
            wallet.name.clone(),
            WalletBalance {
                id: wallet.id.clone(),
                name: wallet.name.clone(),
                link: wallet.link.clone(),
                balance: display_value.clone(),
                last_updated: chrono::Utc::now(),
                error: result.error.clone(),
            },
        );

        // The store enforces the validity rules; placeholder or failed
        // values are rejected there in one place.
        self.cache
            .append(&wallet.name, &display_value, result.platform, status);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
