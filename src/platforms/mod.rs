//! Platform extraction strategies.
//!
//! Routes a wallet link to the extraction strategy for its platform and
//! runs it. Routing is a pure function of the link, so a given wallet is
//! always scraped the same way. An unrecognized platform is never a hard
//! failure — it falls through to the generic opportunistic strategy.
//!
//! Strategies:
//! - DeBank (EVM portfolios) — balance API first, DOM scan fallback
//! - Jupiter portfolio (jup.ag/portfolio) — semantic Net-Worth extraction
//! - Everything else — opportunistic largest-value, with per-platform
//!   timeout and settle tuning for known chain explorers

pub mod debank;
pub mod jupiter;
pub mod opportunistic;

use async_trait::async_trait;

use crate::browser::BrowserSession;
use crate::config::ScrapingConfig;
use crate::types::{Platform, ScrapeResult};
use tracing::info;

/// One extraction algorithm. Implementations own their page lifecycle and
/// wall-clock budget; `scrape` never panics past this boundary and never
/// hangs — expiry closes the page and resolves as a failure.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn platform(&self) -> Platform;

    async fn scrape(
        &self,
        session: Option<&dyn BrowserSession>,
        link: &str,
        cfg: &ScrapingConfig,
    ) -> ScrapeResult;
}

/// Pure routing: which platform family handles this link.
/// Checked in order, first match wins.
pub fn select_platform(link: &str) -> Platform {
    if link.contains("debank.com") {
        Platform::Debank
    } else if link.contains("jup.ag") {
        Platform::Jupiter
    } else if link.contains("portfolio.ready.co") {
        Platform::Ready
    } else if link.contains("aptoscan.com") {
        Platform::Aptoscan
    } else if link.contains("seiscan.io") {
        Platform::Seiscan
    } else {
        Platform::Generic
    }
}

/// Build the strategy for a link. `jup.ag/portfolio` gets the semantic
/// Net-Worth scraper; other jup.ag pages get the tuned opportunistic one.
pub fn strategy_for(link: &str) -> Box<dyn ExtractionStrategy> {
    match select_platform(link) {
        Platform::Debank => Box::new(debank::DebankStrategy::new()),
        Platform::Jupiter => {
            if link.contains("jup.ag/portfolio") {
                Box::new(jupiter::NetWorthStrategy)
            } else {
                Box::new(opportunistic::OpportunisticStrategy::new(Platform::Jupiter))
            }
        }
        platform => Box::new(opportunistic::OpportunisticStrategy::new(platform)),
    }
}

/// Select and run the extraction strategy for a wallet link.
///
/// This is the single entry point the monitor uses. It always produces a
/// `ScrapeResult`; strategy errors are already captured as failed results
/// inside the strategies themselves.
pub async fn select_and_scrape(
    session: Option<&dyn BrowserSession>,
    link: &str,
    wallet_name: &str,
    cfg: &ScrapingConfig,
) -> ScrapeResult {
    let strategy = strategy_for(link);
    info!(
        wallet = %wallet_name,
        platform = %strategy.platform(),
        link = %link,
        "Selected extraction strategy"
    );
    strategy.scrape(session, link, cfg).await
}

/// The failure result for a strategy that needs a live browser session and
/// didn't get one. Local and non-fatal.
pub(crate) fn browser_unavailable(platform: Platform) -> ScrapeResult {
    ScrapeResult::failed(platform, "Browser not available")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
