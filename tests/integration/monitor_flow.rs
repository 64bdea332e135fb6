//! End-to-end monitor scenarios against the mock browser: sequential
//! ordering, per-wallet failure isolation, placeholder lifecycle, and the
//! durable cache's validity and retention guarantees across passes.

use std::time::Duration;

use walletwatch::cache::CacheStore;
use walletwatch::config::{MonitorConfig, ScrapingConfig};
use walletwatch::monitor::WalletMonitor;
use walletwatch::types::{EntryStatus, Platform, WalletConfig};

use super::mock_browser::{MockBrowser, PageBehavior};

fn fast_monitor_config() -> MonitorConfig {
    MonitorConfig {
        interval_secs: 3600,
        wallet_delay_secs: 0,
        startup_delay_secs: 0,
    }
}

fn fast_scraping_config() -> ScrapingConfig {
    ScrapingConfig {
        debank_settle_secs: 0,
        jupiter_settle_secs: 0,
        generic_settle_secs: 0,
        ..ScrapingConfig::default()
    }
}

fn temp_cache() -> CacheStore {
    let mut p = std::env::temp_dir();
    p.push(format!(
        "walletwatch_integration_{}.json",
        uuid::Uuid::new_v4()
    ));
    CacheStore::new(p)
}

fn monitor_with(browser: MockBrowser) -> WalletMonitor {
    WalletMonitor::new(
        fast_monitor_config(),
        fast_scraping_config(),
        Box::new(browser),
        temp_cache(),
    )
}

#[tokio::test]
async fn test_wallets_processed_in_configuration_order() {
    let browser = MockBrowser::new()
        .with_page("a.example", "Total $100.00")
        .with_page("b.example", "Total $200.00")
        .with_page("c.example", "Total $300.00");
    let monitor = monitor_with(browser.clone());

    monitor
        .set_wallets(vec![
            WalletConfig::new("A", "https://a.example/w"),
            WalletConfig::new("B", "https://b.example/w"),
            WalletConfig::new("C", "https://c.example/w"),
        ])
        .await;

    let detailed = monitor.force_refresh_and_wait().await;
    assert_eq!(detailed.len(), 3);
    assert_eq!(detailed[0].balance, "$100.00");
    assert_eq!(detailed[1].balance, "$200.00");
    assert_eq!(detailed[2].balance, "$300.00");

    let visited = browser.visited();
    assert_eq!(
        visited,
        vec![
            "https://a.example/w".to_string(),
            "https://b.example/w".to_string(),
            "https://c.example/w".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_one_browser_session_per_pass_and_always_closed() {
    let browser = MockBrowser::new().with_page("example", "$50.00");
    let monitor = monitor_with(browser.clone());

    monitor
        .set_wallets(vec![
            WalletConfig::new("A", "https://example.com/a"),
            WalletConfig::new("B", "https://example.com/b"),
        ])
        .await;

    monitor.force_refresh_and_wait().await;
    assert_eq!(browser.launches(), 1);
    assert_eq!(browser.closes(), 1);

    monitor.force_refresh_and_wait().await;
    assert_eq!(browser.launches(), 2);
    assert_eq!(browser.closes(), 2);
}

#[tokio::test]
async fn test_failing_wallet_does_not_abort_the_pass() {
    let browser = MockBrowser::new()
        .with_page("good-one", "Total $1,000.00")
        .with_behavior("broken", PageBehavior::Fail("page crashed".to_string()))
        .with_page("good-two", "Total $2,000.00");
    let monitor = monitor_with(browser);

    monitor
        .set_wallets(vec![
            WalletConfig::new("First", "https://good-one.example/w"),
            WalletConfig::new("Broken", "https://broken.example/w"),
            WalletConfig::new("Last", "https://good-two.example/w"),
        ])
        .await;

    let detailed = monitor.force_refresh_and_wait().await;
    assert_eq!(detailed.len(), 3);
    assert_eq!(detailed[0].balance, "$1,000.00");
    assert_eq!(detailed[1].balance, "Erro ao carregar");
    assert!(detailed[1].error.is_some());
    assert_eq!(detailed[2].balance, "$2,000.00");
}

#[tokio::test]
async fn test_panicking_wallet_does_not_abort_the_pass() {
    let browser = MockBrowser::new()
        .with_behavior("landmine", PageBehavior::Panic)
        .with_page("safe", "Total $750.00");
    let monitor = monitor_with(browser);

    monitor
        .set_wallets(vec![
            WalletConfig::new("Mine", "https://landmine.example/w"),
            WalletConfig::new("Safe", "https://safe.example/w"),
        ])
        .await;

    let detailed = monitor.force_refresh_and_wait().await;
    assert_eq!(detailed.len(), 2);
    assert_eq!(detailed[0].balance, "Erro ao carregar");
    assert_eq!(detailed[1].balance, "$750.00");
}

#[tokio::test]
async fn test_unavailable_and_error_states_are_distinct() {
    let browser = MockBrowser::new()
        .with_page("empty", "no dollar signs on this page")
        .with_behavior("down", PageBehavior::Fail("connection refused".to_string()));
    let monitor = monitor_with(browser);

    monitor
        .set_wallets(vec![
            WalletConfig::new("Empty", "https://empty.example/w"),
            WalletConfig::new("Down", "https://down.example/w"),
        ])
        .await;

    let detailed = monitor.force_refresh_and_wait().await;
    assert_eq!(detailed[0].balance, "Indisponível");
    assert_eq!(detailed[1].balance, "Erro ao carregar");
}

#[tokio::test]
async fn test_only_valid_values_reach_history() {
    let browser = MockBrowser::new()
        .with_page("good", "Total $425.50")
        .with_page("empty", "nothing here")
        .with_behavior("down", PageBehavior::Fail("timeout".to_string()));
    let monitor = monitor_with(browser);

    monitor
        .set_wallets(vec![
            WalletConfig::new("Good", "https://good.example/w"),
            WalletConfig::new("Empty", "https://empty.example/w"),
            WalletConfig::new("Down", "https://down.example/w"),
        ])
        .await;

    monitor.force_refresh_and_wait().await;

    let all = monitor.cache().all_history(None);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].wallet_name, "Good");
    assert_eq!(all[0].balance, "$425.50");
    assert_eq!(all[0].status, EntryStatus::Success);
}

#[tokio::test]
async fn test_repeated_passes_respect_retention_cap() {
    let browser = MockBrowser::new().with_page("example", "Total $99.00");
    let monitor = monitor_with(browser);
    monitor
        .set_wallets(vec![WalletConfig::new("W", "https://example.com/w")])
        .await;

    // 25 valid appends via the store directly (pass-driven appends would
    // be identical but slower); the last 20 survive.
    for i in 1..=25 {
        monitor
            .cache()
            .append("W", &format!("${i}.00"), Platform::Generic, EntryStatus::Success);
    }
    let history = monitor.cache().history("W", 100);
    assert_eq!(history.len(), 20);
    assert_eq!(history.first().unwrap().balance, "$25.00");
    assert_eq!(history.last().unwrap().balance, "$6.00");
}

#[tokio::test]
async fn test_semantic_strategy_skips_pnl_values() {
    let padding = " ".repeat(150);
    let body = format!("$5 PnL -2%{padding}Net Worth $1,250.00");
    let browser = MockBrowser::new().with_page("jup.ag/portfolio", &body);
    let monitor = monitor_with(browser);

    monitor
        .set_wallets(vec![WalletConfig::new("Sol", "https://jup.ag/portfolio/abc")])
        .await;

    let detailed = monitor.force_refresh_and_wait().await;
    assert_eq!(detailed[0].balance, "$1250.00");
}

#[tokio::test]
async fn test_generic_title_fallback() {
    let browser = MockBrowser::new().with_behavior(
        "titled",
        PageBehavior::TextWithTitle(
            "no body value".to_string(),
            "Portfolio — $3,333.00".to_string(),
        ),
    );
    let monitor = monitor_with(browser);

    monitor
        .set_wallets(vec![WalletConfig::new("T", "https://titled.example/w")])
        .await;

    let detailed = monitor.force_refresh_and_wait().await;
    assert_eq!(detailed[0].balance, "$3,333.00");
}

#[tokio::test]
async fn test_concurrent_refreshes_never_overlap_passes() {
    let browser = MockBrowser::new()
        .with_page("a.example", "Total $100.00")
        .with_page("b.example", "Total $200.00");
    let monitor = WalletMonitor::new(
        MonitorConfig {
            interval_secs: 3600,
            wallet_delay_secs: 1,
            startup_delay_secs: 0,
        },
        fast_scraping_config(),
        Box::new(browser.clone()),
        temp_cache(),
    );
    monitor
        .set_wallets(vec![
            WalletConfig::new("A", "https://a.example/w"),
            WalletConfig::new("B", "https://b.example/w"),
        ])
        .await;

    let (first, second) = tokio::join!(
        monitor.force_refresh_and_wait(),
        monitor.force_refresh_and_wait()
    );
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);

    // Passes are serialized: one full sweep finishes before the next
    // starts, so the visit order never interleaves.
    let visited = browser.visited();
    assert_eq!(
        visited,
        vec![
            "https://a.example/w".to_string(),
            "https://b.example/w".to_string(),
            "https://a.example/w".to_string(),
            "https://b.example/w".to_string(),
        ]
    );
    assert_eq!(browser.launches(), 2);
    assert_eq!(browser.closes(), 2);
}

#[tokio::test]
async fn test_new_tick_cancels_still_running_pass() {
    let browser = MockBrowser::new()
        .with_page("a.example", "Total $100.00")
        .with_page("b.example", "Total $200.00");
    // A long inter-wallet delay keeps every pass stuck between wallets A
    // and B, so each short tick supersedes a still-running pass.
    let monitor = WalletMonitor::new(
        MonitorConfig {
            interval_secs: 3600,
            wallet_delay_secs: 5,
            startup_delay_secs: 0,
        },
        fast_scraping_config(),
        Box::new(browser.clone()),
        temp_cache(),
    );
    monitor
        .set_wallets(vec![
            WalletConfig::new("A", "https://a.example/w"),
            WalletConfig::new("B", "https://b.example/w"),
        ])
        .await;

    monitor.start(Duration::from_millis(100)).await;
    tokio::time::sleep(Duration::from_millis(350)).await;
    monitor.stop();
    // Let the last cancelled pass wind down.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Multiple ticks fired, and every superseded pass was cancelled
    // during its inter-wallet delay — wallet B is never reached.
    let visited = browser.visited();
    assert!(visited.len() >= 2, "expected several ticks, saw {visited:?}");
    assert!(visited.iter().all(|u| u.contains("a.example")));
    // Cancelled passes still close their browser session on the way out.
    assert_eq!(browser.closes(), browser.launches());
}

#[tokio::test]
async fn test_periodic_monitor_runs_and_stops() {
    let browser = MockBrowser::new().with_page("example", "Total $80.00");
    let monitor = monitor_with(browser);
    monitor
        .set_wallets(vec![WalletConfig::new("W", "https://example.com/w")])
        .await;

    monitor.start(Duration::from_secs(3600)).await;
    // Startup delay is zero in the test config; give the first pass a
    // moment to run.
    tokio::time::sleep(Duration::from_millis(200)).await;
    monitor.stop();

    let balances = monitor.get_balances().await;
    assert_eq!(balances["W"], "$80.00");
}
