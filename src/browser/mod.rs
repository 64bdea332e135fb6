//! Browser automation seam.
//!
//! The monitor needs a headless browsing capability: launch an isolated
//! session, open pages, navigate with a timeout, and read rendered text.
//! The concrete engine is a collaborator, so it sits behind a trait pair —
//! production uses the WebDriver/geckodriver implementation in
//! [`webdriver`], tests use an in-memory mock.

pub mod webdriver;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Browser-level failures that strategies may want to inspect.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The page never finished loading within its deadline. Strategies
    /// treat this as a warning and extract against the partial DOM.
    #[error("Navigation timed out after {0:?}")]
    NavigationTimeout(Duration),
}

/// One open page within a browser session.
///
/// Navigation failures on heavy client-rendered sites are common and
/// non-fatal: callers typically log them and proceed to extraction against
/// whatever DOM did render.
#[async_trait]
pub trait BrowserPage: Send {
    /// Navigate to `url`, giving up after `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// The rendered text content of the page body.
    async fn body_text(&mut self) -> Result<String>;

    /// The document title.
    async fn title(&mut self) -> Result<String>;

    /// Close the page. Errors are swallowed; a page that refuses to close
    /// is abandoned to the session teardown.
    async fn close(self: Box<Self>);
}

/// A live browser session: a factory for pages plus a teardown handle.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>>;

    /// Tear the session down, releasing the underlying engine. Must be
    /// infallible from the caller's perspective — cleanup always completes.
    async fn close(self: Box<Self>);
}

/// Launches browser sessions. The monitor launches one session per
/// sequential pass and closes it when the pass ends, however it ends.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}
