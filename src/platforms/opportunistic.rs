//! Opportunistic largest-value strategy.
//!
//! The workhorse for chain explorers and anything unrecognized: render the
//! page, wait a fixed settle interval for client-side rendering, collect
//! every dollar amount in the text, drop sub-floor noise, and keep the
//! largest. Balance displays are reliably the dominant monetary figure on
//! a portfolio page; fees, PnL, and rewards are smaller or signed.
//!
//! Known platforms get tuned budgets (Jupiter pages render slowly, the Sei
//! and Aptos explorers are quick). The generic fallback also checks the
//! page title as a last resort before declaring the wallet unavailable.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{browser_unavailable, ExtractionStrategy};
use crate::browser::BrowserSession;
use crate::config::ScrapingConfig;
use crate::extract;
use crate::types::{Platform, ScrapeResult};

const NAV_HEADROOM: Duration = Duration::from_secs(5);

pub struct OpportunisticStrategy {
    platform: Platform,
}

impl OpportunisticStrategy {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    fn budget(&self, cfg: &ScrapingConfig) -> Duration {
        let secs = match self.platform {
            Platform::Jupiter => cfg.jupiter_timeout_secs,
            Platform::Ready => cfg.ready_timeout_secs,
            Platform::Aptoscan | Platform::Seiscan => cfg.explorer_timeout_secs,
            _ => cfg.generic_timeout_secs,
        };
        Duration::from_secs(secs)
    }

    fn settle(&self, cfg: &ScrapingConfig) -> Duration {
        let secs = match self.platform {
            Platform::Jupiter | Platform::Ready => cfg.jupiter_settle_secs,
            _ => cfg.generic_settle_secs,
        };
        Duration::from_secs(secs)
    }

    /// Only the generic fallback digs into the page title; on known
    /// explorers a missing value means the page layout is empty, not that
    /// the balance moved into the title.
    fn title_fallback(&self) -> bool {
        self.platform == Platform::Generic
    }
}

#[async_trait]
impl ExtractionStrategy for OpportunisticStrategy {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn scrape(
        &self,
        session: Option<&dyn BrowserSession>,
        link: &str,
        cfg: &ScrapingConfig,
    ) -> ScrapeResult {
        let Some(session) = session else {
            return browser_unavailable(self.platform);
        };

        let budget = self.budget(cfg);
        let nav_timeout = budget.saturating_sub(NAV_HEADROOM).max(Duration::from_secs(5));
        let settle = self.settle(cfg);
        let floor = cfg.min_plausible_value;
        let with_title = self.title_fallback();

        let mut page = match session.open_page().await {
            Ok(p) => p,
            Err(e) => return ScrapeResult::failed(self.platform, e.to_string()),
        };

        let outcome = tokio::time::timeout(budget, async {
            if let Err(e) = page.navigate(link, nav_timeout).await {
                warn!(platform = %self.platform, error = %e, "Navigation warning");
            }
            tokio::time::sleep(settle).await;

            let text = page.body_text().await?;
            if let Some(value) = extract::largest_dollar_value(&text, floor) {
                return Ok(Some(value));
            }

            if with_title {
                let title = page.title().await.unwrap_or_default();
                if let Some(value) = extract::title_dollar_value(&title) {
                    debug!(%value, "Found balance in page title");
                    return Ok(Some(value));
                }
            }

            anyhow::Ok(None)
        })
        .await;

        let result = match outcome {
            Ok(Ok(Some(value))) => ScrapeResult::found(self.platform, value),
            Ok(Ok(None)) => ScrapeResult::no_value(self.platform),
            Ok(Err(e)) => ScrapeResult::failed(self.platform, e.to_string()),
            Err(_) => ScrapeResult::failed(
                self.platform,
                format!("Scrape timed out after {}s", budget.as_secs()),
            ),
        };

        page.close().await;
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budgets_follow_platform_tuning() {
        let cfg = ScrapingConfig::default();
        let jup = OpportunisticStrategy::new(Platform::Jupiter);
        let sei = OpportunisticStrategy::new(Platform::Seiscan);
        let gen = OpportunisticStrategy::new(Platform::Generic);

        assert_eq!(jup.budget(&cfg), Duration::from_secs(45));
        assert_eq!(sei.budget(&cfg), Duration::from_secs(30));
        assert_eq!(gen.budget(&cfg), Duration::from_secs(30));

        assert_eq!(jup.settle(&cfg), Duration::from_secs(3));
        assert_eq!(sei.settle(&cfg), Duration::from_secs(2));
    }

    #[test]
    fn test_only_generic_uses_title_fallback() {
        assert!(OpportunisticStrategy::new(Platform::Generic).title_fallback());
        assert!(!OpportunisticStrategy::new(Platform::Ready).title_fallback());
        assert!(!OpportunisticStrategy::new(Platform::Jupiter).title_fallback());
    }
}
