//! Chromium-backed page sessions (CDP via chromiumoxide).

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dom::DomNode;
use crate::pool::{Session, SessionFactory};
use crate::scanner::{PageDriver, ScanError};
use crate::scripts;

/// How long one navigation may take before the record is failed.
const NAV_TIMEOUT: Duration = Duration::from_secs(30);
/// Pause after front-door authentication before the session is used.
const AUTH_SETTLE: Duration = Duration::from_secs(5);

/// Launches headless Chromium sessions, each authenticated through the CRM
/// front-door URL carrying the run's session token.
pub struct ChromeSessionFactory {
    frontdoor_url: String,
    chrome_bin: Option<String>,
}

impl ChromeSessionFactory {
    pub fn new(frontdoor_url: String, chrome_bin: Option<String>) -> Self {
        Self {
            frontdoor_url,
            chrome_bin,
        }
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn open(&self) -> Result<Box<dyn Session>> {
        let session =
            ChromeSession::launch(&self.frontdoor_url, self.chrome_bin.as_deref()).await?;
        Ok(Box::new(session))
    }
}

/// One exclusive browser instance plus its page. Owned by a single worker for
/// the duration of its chunk.
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    async fn launch(frontdoor_url: &str, chrome_bin: Option<&str>) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if let Some(bin) = chrome_bin {
            builder = builder.chrome_executable(bin);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch Chromium")?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open page")?;

        // Exchange the CRM session token for a browser-side session cookie.
        page.goto(frontdoor_url)
            .await
            .context("Front-door authentication navigation failed")?;
        let _ = page.wait_for_navigation().await;
        tokio::time::sleep(AUTH_SETTLE).await;
        debug!("Browser session authenticated");

        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    async fn eval<T>(&self, script: &str) -> Result<T, ScanError>
    where
        T: serde::de::DeserializeOwned,
    {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScanError::Evaluation(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| ScanError::Evaluation(e.to_string()))
    }
}

#[async_trait]
impl PageDriver for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), ScanError> {
        let nav = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| ScanError::Navigation(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| ScanError::Navigation(e.to_string()))?;
            Ok::<(), ScanError>(())
        };
        tokio::time::timeout(NAV_TIMEOUT, nav)
            .await
            .map_err(|_| ScanError::Navigation(format!("navigation to {url} timed out")))?
    }

    async fn eval_bool(&self, script: &str) -> Result<bool, ScanError> {
        self.eval(script).await
    }

    async fn snapshot(&self) -> Result<DomNode, ScanError> {
        self.eval(scripts::SNAPSHOT_JS).await
    }

    async fn press(&self, path: &[usize]) -> Result<bool, ScanError> {
        self.eval(&scripts::press_script(path)).await
    }

    async fn scroll_to_end(&self) -> Result<(), ScanError> {
        let _: bool = self.eval(scripts::SCROLL_JS).await?;
        Ok(())
    }
}

#[async_trait]
impl Session for ChromeSession {
    async fn shutdown(self: Box<Self>) -> Result<()> {
        let ChromeSession {
            mut browser,
            page,
            handler,
        } = *self;

        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close page");
        }
        if let Err(e) = browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        let _ = browser.wait().await;
        handler.abort();
        Ok(())
    }
}
