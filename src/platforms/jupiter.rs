//! Jupiter portfolio strategy: semantic Net-Worth extraction.
//!
//! `jup.ag/portfolio` pages show the net worth alongside PnL, holdings
//! breakdowns, and claimable rewards, all formatted as dollar amounts —
//! and in the viewer's locale, so `$1.911,36` and `$1,911.36` both occur.
//! A plain largest-value scan would happily pick an unrealized-PnL figure,
//! so this strategy filters candidates by their surrounding text before
//! taking the largest survivor.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use super::{browser_unavailable, ExtractionStrategy};
use crate::browser::BrowserSession;
use crate::config::ScrapingConfig;
use crate::extract;
use crate::types::{Platform, ScrapeResult};

const NAV_HEADROOM: Duration = Duration::from_secs(5);

pub struct NetWorthStrategy;

#[async_trait]
impl ExtractionStrategy for NetWorthStrategy {
    fn platform(&self) -> Platform {
        Platform::Jupiter
    }

    async fn scrape(
        &self,
        session: Option<&dyn BrowserSession>,
        link: &str,
        cfg: &ScrapingConfig,
    ) -> ScrapeResult {
        let Some(session) = session else {
            return browser_unavailable(Platform::Jupiter);
        };

        let budget = Duration::from_secs(cfg.jupiter_portfolio_timeout_secs);
        let nav_timeout = budget.saturating_sub(NAV_HEADROOM).max(Duration::from_secs(5));
        let settle = Duration::from_secs(cfg.jupiter_settle_secs);

        let mut page = match session.open_page().await {
            Ok(p) => p,
            Err(e) => return ScrapeResult::failed(Platform::Jupiter, e.to_string()),
        };

        let outcome = tokio::time::timeout(budget, async {
            if let Err(e) = page.navigate(link, nav_timeout).await {
                warn!(error = %e, "Jupiter navigation warning");
            }
            tokio::time::sleep(settle).await;
            page.body_text().await
        })
        .await;

        let result = match outcome {
            Ok(Ok(text)) => {
                match extract::net_worth_value(&text, cfg.min_plausible_value) {
                    Some(value) => ScrapeResult::found(Platform::Jupiter, value),
                    None => ScrapeResult::not_found(
                        Platform::Jupiter,
                        "No valid portfolio value found",
                    ),
                }
            }
            Ok(Err(e)) => ScrapeResult::failed(Platform::Jupiter, e.to_string()),
            Err(_) => ScrapeResult::failed(
                Platform::Jupiter,
                format!("Scrape timed out after {}s", budget.as_secs()),
            ),
        };

        page.close().await;
        result
    }
}
