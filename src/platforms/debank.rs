//! DeBank EVM portfolio strategy: API first, DOM scan fallback.
//!
//! DeBank exposes a public total-balance endpoint keyed by the EVM address
//! embedded in the profile link. The API is cheap and fast but frequently
//! rate-limited or blocked, so a failed or non-2xx response drops to
//! rendering the page and scanning its text for the Net Worth figure.

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{browser_unavailable, ExtractionStrategy};
use crate::browser::BrowserSession;
use crate::config::ScrapingConfig;
use crate::extract;
use crate::types::{Platform, ScrapeResult};

const API_BASE: &str = "https://api.debank.com/v1/user/total_balance";

/// Navigation gets most of the budget; the rest covers settle + extraction.
const NAV_HEADROOM: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct TotalBalanceResponse {
    #[serde(default)]
    total_usd_value: f64,
}

pub struct DebankStrategy {
    http: reqwest::Client,
}

impl DebankStrategy {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Direct API probe. Any failure here is recoverable — the caller
    /// falls back to DOM scraping.
    async fn try_api(&self, address: &str) -> Result<String> {
        let url = format!("{API_BASE}?id={address}");
        debug!(%url, "Trying DeBank balance API");

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("DeBank API request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!("DeBank API returned status {}", response.status()));
        }

        let body: TotalBalanceResponse = response
            .json()
            .await
            .context("Failed to parse DeBank API response")?;

        Ok(format!("${:.2}", body.total_usd_value))
    }

    async fn scrape_dom(
        &self,
        session: &dyn BrowserSession,
        link: &str,
        cfg: &ScrapingConfig,
    ) -> ScrapeResult {
        let budget = Duration::from_secs(cfg.debank_timeout_secs);
        let nav_timeout = budget.saturating_sub(NAV_HEADROOM).max(Duration::from_secs(5));
        let settle = Duration::from_secs(cfg.debank_settle_secs);

        let mut page = match session.open_page().await {
            Ok(p) => p,
            Err(e) => return ScrapeResult::failed(Platform::Debank, e.to_string()),
        };

        let outcome = tokio::time::timeout(budget, async {
            // A navigation timeout is a warning, not a failure: client-side
            // rendering often keeps the load event from ever firing, and a
            // partial DOM is acceptable extraction input.
            if let Err(e) = page.navigate(link, nav_timeout).await {
                warn!(error = %e, "DeBank navigation warning");
            }
            tokio::time::sleep(settle).await;
            page.body_text().await
        })
        .await;

        let result = match outcome {
            Ok(Ok(text)) => match extract::evm_net_worth(&text) {
                Some(value) => ScrapeResult::found(Platform::Debank, value),
                None => {
                    ScrapeResult::not_found(Platform::Debank, "Net Worth not found in DOM")
                }
            },
            Ok(Err(e)) => ScrapeResult::failed(Platform::Debank, e.to_string()),
            Err(_) => ScrapeResult::failed(
                Platform::Debank,
                format!("Scrape timed out after {}s", budget.as_secs()),
            ),
        };

        page.close().await;
        result
    }
}

impl Default for DebankStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionStrategy for DebankStrategy {
    fn platform(&self) -> Platform {
        Platform::Debank
    }

    async fn scrape(
        &self,
        session: Option<&dyn BrowserSession>,
        link: &str,
        cfg: &ScrapingConfig,
    ) -> ScrapeResult {
        // API first — works even without a browser session.
        if let Some(address) = extract::extract_address(link) {
            match self.try_api(address).await {
                Ok(value) => {
                    info!(%value, "DeBank API hit");
                    return ScrapeResult::found(Platform::Debank, value);
                }
                Err(e) => {
                    debug!(error = %e, "DeBank API miss, falling back to DOM");
                }
            }
        } else {
            debug!(%link, "No EVM address in link, skipping API probe");
        }

        let Some(session) = session else {
            return browser_unavailable(Platform::Debank);
        };

        self.scrape_dom(session, link, cfg).await
    }
}
