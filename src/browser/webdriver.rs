//! WebDriver-backed browser implementation.
//!
//! Spawns a geckodriver process on a random port and drives a headless
//! Firefox through `fantoccini`. One session owns one driver process;
//! pages share the session's client, which is fine because the monitor
//! scrapes strictly sequentially.

use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, warn};

use super::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession};

/// Desktop user agent presented to scraped sites.
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Wait after spawning geckodriver before connecting to it.
const DRIVER_STARTUP_WAIT: Duration = Duration::from_secs(1);

fn random_port() -> u16 {
    rand::random::<u16>() % (65535 - 1024) + 1024
}

fn spawn_geckodriver(port: u16) -> Result<Child> {
    Command::new("geckodriver")
        .arg("--port")
        .arg(port.to_string())
        .arg("--log")
        .arg("fatal")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to start geckodriver")
}

async fn connect_client(port: u16) -> Result<Client> {
    let caps = json!({
        "moz:firefoxOptions": { "args": ["-headless"] }
    });
    let caps = caps
        .as_object()
        .cloned()
        .ok_or_else(|| anyhow!("Invalid capabilities object"))?;

    let client = ClientBuilder::native()
        .capabilities(caps)
        .connect(&format!("http://localhost:{port}"))
        .await
        .context(format!("Failed to connect to WebDriver on port {port}"))?;

    client
        .set_ua(USER_AGENT)
        .await
        .context("Failed to set user agent")?;

    Ok(client)
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct WebDriverSession {
    driver_process: Option<Child>,
    client: Client,
}

impl WebDriverSession {
    /// Spawn a geckodriver and connect a fresh headless session to it.
    pub async fn new() -> Result<Self> {
        let port = random_port();
        let mut process = spawn_geckodriver(port)?;
        tokio::time::sleep(DRIVER_STARTUP_WAIT).await;

        let client = match connect_client(port).await {
            Ok(c) => c,
            Err(e) => {
                // Driver came up but the session didn't; don't leak it.
                let _ = process.kill();
                return Err(e);
            }
        };

        debug!(port, "WebDriver session started");
        Ok(Self {
            driver_process: Some(process),
            client,
        })
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn open_page(&self) -> Result<Box<dyn BrowserPage>> {
        Ok(Box::new(WebDriverPage {
            client: self.client.clone(),
        }))
    }

    async fn close(mut self: Box<Self>) {
        if let Err(e) = self.client.clone().close().await {
            warn!(error = %e, "Failed to close WebDriver client");
        }
        if let Some(mut process) = self.driver_process.take() {
            if let Err(e) = process.kill() {
                warn!(error = %e, "Failed to kill geckodriver process");
            }
        }
        debug!("WebDriver session closed");
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        // Backstop for panics that unwind past `close`. Normal teardown,
        // cancellation included, goes through `close`, which ends the
        // WebDriver session (and its browser) before killing the driver.
        if let Some(mut process) = self.driver_process.take() {
            let _ = process.kill();
        }
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

struct WebDriverPage {
    client: Client,
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.client.goto(url))
            .await
            .map_err(|_| BrowserError::NavigationTimeout(timeout))?
            .context(format!("Navigation to {url} failed"))
    }

    async fn body_text(&mut self) -> Result<String> {
        let value = self
            .client
            .execute("return document.body.innerText;", vec![])
            .await
            .context("Failed to read page body text")?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn title(&mut self) -> Result<String> {
        let value = self
            .client
            .execute("return document.title;", vec![])
            .await
            .context("Failed to read page title")?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn close(self: Box<Self>) {
        // Pages share the session client; nothing to release per page.
        // Parking on about:blank stops background rendering between wallets.
        if let Err(e) = self.client.goto("about:blank").await {
            debug!(error = %e, "Failed to park page on about:blank");
        }
    }
}

// ---------------------------------------------------------------------------
// Launcher
// ---------------------------------------------------------------------------

/// Launches one [`WebDriverSession`] per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebDriverLauncher;

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let session = WebDriverSession::new().await?;
        Ok(Box::new(session))
    }
}
