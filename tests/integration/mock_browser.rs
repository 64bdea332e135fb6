//! Mock browser for integration testing.
//!
//! Provides a deterministic `BrowserLauncher`/`BrowserSession`/`BrowserPage`
//! stack that serves canned page text per URL — all in-memory with no
//! external dependencies. Individual URLs can be made to fail or panic to
//! exercise the monitor's isolation guarantees.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use walletwatch::browser::{BrowserLauncher, BrowserPage, BrowserSession};

/// Per-URL behavior of the mock.
#[derive(Clone)]
pub enum PageBehavior {
    /// Serve this body text.
    Text(String),
    /// Serve this body text and this document title.
    TextWithTitle(String, String),
    /// Fail the body-text read with this message.
    Fail(String),
    /// Panic during the body-text read.
    Panic,
}

#[derive(Default)]
struct MockState {
    /// URL substring → behavior; first match wins.
    pages: Vec<(String, PageBehavior)>,
    /// URLs navigated to, in order — lets tests assert sequential order.
    visited: Vec<String>,
    /// Number of sessions launched and closed.
    launches: usize,
    closes: usize,
}

/// A deterministic browser for monitor tests. Cheap to clone; all clones
/// share state.
#[derive(Clone, Default)]
pub struct MockBrowser {
    state: Arc<Mutex<MockState>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register canned body text for URLs containing `url_part`.
    pub fn with_page(self, url_part: &str, body: &str) -> Self {
        self.register(url_part, PageBehavior::Text(body.to_string()));
        self
    }

    pub fn with_behavior(self, url_part: &str, behavior: PageBehavior) -> Self {
        self.register(url_part, behavior);
        self
    }

    fn register(&self, url_part: &str, behavior: PageBehavior) {
        self.state
            .lock()
            .unwrap()
            .pages
            .push((url_part.to_string(), behavior));
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn launches(&self) -> usize {
        self.state.lock().unwrap().launches
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    fn behavior_for(&self, url: &str) -> PageBehavior {
        let state = self.state.lock().unwrap();
        state
            .pages
            .iter()
            .find(|(part, _)| url.contains(part.as_str()))
            .map(|(_, b)| b.clone())
            .unwrap_or_else(|| PageBehavior::Text(String::new()))
    }
}

#[async_trait]
impl BrowserLauncher for MockBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        self.state.lock().unwrap().launches += 1;
        Ok(Box::new(MockSession {
            browser: self.clone(),
        }))
    }
}

struct MockSession {
    browser: MockBrowser,
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        Ok(Box::new(MockPage {
            browser: self.browser.clone(),
            url: None,
        }))
    }

    async fn close(self: Box<Self>) {
        self.browser.state.lock().unwrap().closes += 1;
    }
}

struct MockPage {
    browser: MockBrowser,
    url: Option<String>,
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        self.browser
            .state
            .lock()
            .unwrap()
            .visited
            .push(url.to_string());
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn body_text(&mut self) -> Result<String> {
        let url = self.url.clone().unwrap_or_default();
        match self.browser.behavior_for(&url) {
            PageBehavior::Text(body) => Ok(body),
            PageBehavior::TextWithTitle(body, _) => Ok(body),
            PageBehavior::Fail(msg) => Err(anyhow!(msg)),
            PageBehavior::Panic => panic!("mock page panic for {url}"),
        }
    }

    async fn title(&mut self) -> Result<String> {
        let url = self.url.clone().unwrap_or_default();
        match self.browser.behavior_for(&url) {
            PageBehavior::TextWithTitle(_, title) => Ok(title),
            _ => Ok(String::new()),
        }
    }

    async fn close(self: Box<Self>) {}
}
