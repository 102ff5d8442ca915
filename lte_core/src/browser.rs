//! The automation session shared by all rendered-page adapters of one
//! harvest run.
//!
//! Exactly one WebDriver session is launched per run. Adapters borrow
//! the session for the duration of a single call and open one isolated
//! [`Page`] each, which they must close on every exit path: repeated
//! failure to close would exhaust the session's window capacity across
//! long-running or repeated harvest runs.

use std::time::Duration;

use anyhow::{Context, Result};
use fantoccini::{error::CmdError, wd::WindowHandle, Client, ClientBuilder, Locator};
use serde_json::json;
use tracing::debug;

/// Upper bound for one page navigation.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(90);
/// Upper bound for one selector wait.
pub const ELEMENT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Some listing platforms serve rendered pages only to a browser that
/// looks like a desktop one.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One headless browser session, exclusively owned by the harvest
/// aggregator for the duration of a run.
pub struct Browser {
    client: Client,
}

impl Browser {
    /// Launch one headless session against a WebDriver endpoint,
    /// configured for unattended execution.
    ///
    /// Failure here is fatal to the whole harvest run; every other
    /// failure is scoped to a single source.
    pub async fn launch(webdriver_url: &str) -> Result<Self> {
        let mut capabilities = serde_json::Map::new();
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            json!({
                "args": [
                    "--headless=new",
                    "--no-sandbox",
                    "--disable-setuid-sandbox",
                    "--disable-dev-shm-usage",
                    "--disable-gpu",
                    format!("--user-agent={USER_AGENT}"),
                ],
            }),
        );
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(webdriver_url)
            .await
            .with_context(|| format!("connecting to webdriver at {webdriver_url}"))?;
        Ok(Self { client })
    }

    /// Open an isolated page. The page is exclusively owned by the
    /// calling adapter invocation and must be closed before it returns,
    /// on success and failure paths alike.
    pub async fn new_page(&self) -> Result<Page<'_>> {
        let home = self.client.window().await?;
        let window = self.client.new_window(true).await?;
        self.client.switch_to_window(window.handle).await?;
        Ok(Page {
            client: &self.client,
            home,
        })
    }

    /// Tear the session down. Teardown errors are swallowed.
    pub async fn shutdown(self) {
        if let Err(err) = self.client.close().await {
            debug!(error = %err, "browser session teardown failed");
        }
    }
}

/// One isolated page context of the shared session.
pub struct Page<'a> {
    client: &'a Client,
    home: WindowHandle,
}

impl Page<'_> {
    /// Navigate, bounded by [`NAVIGATION_TIMEOUT`].
    pub async fn goto(&self, url: &str) -> Result<()> {
        tokio::time::timeout(NAVIGATION_TIMEOUT, self.client.goto(url))
            .await
            .with_context(|| format!("navigation to {url} timed out"))??;
        Ok(())
    }

    /// Wait for an element to appear, bounded by
    /// [`ELEMENT_WAIT_TIMEOUT`]. A timeout is tolerated and reported
    /// as `false`: the caller proceeds with whatever the page shows.
    pub async fn wait_for(&self, css: &str) -> Result<bool> {
        match self
            .client
            .wait()
            .at_most(ELEMENT_WAIT_TIMEOUT)
            .for_element(Locator::Css(css))
            .await
        {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Snapshot of the rendered document.
    pub async fn source(&self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    /// Close the page window and return to the session's home window.
    /// Close errors are swallowed so this can sit on error paths.
    pub async fn close(self) {
        if let Err(err) = self.client.close_window().await {
            debug!(error = %err, "closing page window failed");
        }
        if let Err(err) = self.client.switch_to_window(self.home).await {
            debug!(error = %err, "returning to home window failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Browser;

    /// Needs a WebDriver (chromedriver) listening on the default port.
    ///
    /// This is an online test!
    #[tokio::test]
    #[ignore = "requires a running chromedriver"]
    async fn test_launch_page_and_shutdown() {
        let browser = Browser::launch("http://localhost:9515").await.unwrap();
        let page = browser.new_page().await.unwrap();
        page.goto("about:blank").await.unwrap();
        assert!(!page.source().await.unwrap().is_empty());
        page.close().await;
        browser.shutdown().await;
    }
}
