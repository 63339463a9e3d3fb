//! Browser session management
//!
//! Checks talk to a [`BrowserSession`], which wraps a boxed [`BrowserDriver`].
//! The driver is produced by a [`BrowserLauncher`]; the default launcher
//! starts headless Chromium (see [`chromium`]).

pub mod chromium;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

pub use chromium::ChromiumLauncher;

/// Delay between presence polls in bounded waits
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const MOBILE: Viewport = Viewport { width: 375, height: 667 };
    pub const TABLET: Viewport = Viewport { width: 768, height: 1024 };
    pub const DESKTOP: Viewport = Viewport { width: 1920, height: 1080 };

    pub fn is_mobile(&self) -> bool {
        self.width < Self::TABLET.width
    }
}

/// Browser launch options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,

    /// `--no-sandbox`, needed in most containers
    pub sandbox_disabled: bool,

    /// `--disable-dev-shm-usage`
    pub shared_memory_workaround: bool,

    /// `--disable-gpu`
    pub gpu_disabled: bool,

    pub viewport: Viewport,

    /// Explicit Chrome/Chromium binary (auto-detected when unset)
    pub chrome_executable: Option<PathBuf>,

    /// Delay between presence polls in bounded waits
    pub wait_poll_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox_disabled: true,
            shared_memory_workaround: true,
            gpu_disabled: true,
            viewport: Viewport::DESKTOP,
            chrome_executable: None,
            wait_poll_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

/// Page-level operations a check can perform
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate the page to an absolute URL
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    /// Serialized DOM of the current page
    async fn content(&mut self) -> E2eResult<String>;

    async fn current_url(&mut self) -> E2eResult<String>;

    /// Whether any text node on the page contains `text`
    async fn has_text(&mut self, text: &str) -> E2eResult<bool>;

    /// Number of elements matching a CSS selector
    async fn count(&mut self, selector: &str) -> E2eResult<usize>;

    async fn set_viewport(&mut self, viewport: Viewport) -> E2eResult<()>;

    /// Click the first `tag` element whose own text contains `text`
    async fn click_text(&mut self, tag: &str, text: &str) -> E2eResult<()>;

    /// Focus the element matching `selector` and type `value` into it
    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()>;

    /// Release the browser. Must tolerate repeated calls.
    async fn close(&mut self) -> E2eResult<()>;
}

/// Produces drivers for a given configuration
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, config: &BrowserConfig) -> E2eResult<Box<dyn BrowserDriver>>;
}

/// An open browser session
pub struct BrowserSession {
    driver: Box<dyn BrowserDriver>,
    closed: bool,
    poll_interval: Duration,
}

impl BrowserSession {
    pub fn new(driver: Box<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            closed: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn driver(&mut self) -> E2eResult<&mut Box<dyn BrowserDriver>> {
        if self.closed {
            return Err(E2eError::SessionClosed);
        }
        Ok(&mut self.driver)
    }

    pub async fn goto(&mut self, url: &str) -> E2eResult<()> {
        debug!("Navigating to {}", url);
        self.driver()?.goto(url).await
    }

    pub async fn content(&mut self) -> E2eResult<String> {
        self.driver()?.content().await
    }

    pub async fn current_url(&mut self) -> E2eResult<String> {
        self.driver()?.current_url().await
    }

    pub async fn has_text(&mut self, text: &str) -> E2eResult<bool> {
        self.driver()?.has_text(text).await
    }

    pub async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        self.driver()?.count(selector).await
    }

    pub async fn exists(&mut self, selector: &str) -> E2eResult<bool> {
        Ok(self.count(selector).await? > 0)
    }

    pub async fn set_viewport(&mut self, viewport: Viewport) -> E2eResult<()> {
        debug!(width = viewport.width, height = viewport.height, "Resizing viewport");
        self.driver()?.set_viewport(viewport).await
    }

    pub async fn click_text(&mut self, tag: &str, text: &str) -> E2eResult<()> {
        self.driver()?.click_text(tag, text).await
    }

    pub async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        self.driver()?.fill(selector, value).await
    }

    /// Wait until `text` is present on the page
    pub async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> E2eResult<()> {
        self.wait_for_any_text(&[text], timeout).await.map(|_| ())
    }

    /// Wait until one of `texts` is present and return the first one found
    pub async fn wait_for_any_text<'a>(&mut self, texts: &[&'a str], timeout: Duration) -> E2eResult<&'a str> {
        let start = Instant::now();

        loop {
            for text in texts {
                if self.has_text(text).await? {
                    return Ok(*text);
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(E2eError::Timeout(format!("text {:?} after {:?}", texts, timeout)));
            }
            sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }

    /// Release the session. Safe to call more than once.
    pub async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.close().await
    }
}

/// Owns the browser session for the duration of a run
pub struct BrowserManager {
    config: BrowserConfig,
    launcher: Arc<dyn BrowserLauncher>,
    session: Option<BrowserSession>,
}

impl BrowserManager {
    pub fn new(config: BrowserConfig) -> Self {
        Self::with_launcher(config, Arc::new(ChromiumLauncher))
    }

    pub fn with_launcher(config: BrowserConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config,
            launcher,
            session: None,
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Launch the browser, or return the already open session
    pub async fn open(&mut self) -> E2eResult<&mut BrowserSession> {
        if self.session.is_none() {
            info!(
                headless = self.config.headless,
                width = self.config.viewport.width,
                height = self.config.viewport.height,
                "Launching browser"
            );
            let driver = self.launcher.launch(&self.config).await?;
            let poll = Duration::from_millis(self.config.wait_poll_ms);
            self.session = Some(BrowserSession::new(driver).with_poll_interval(poll));
        }
        self.session_mut()
    }

    pub fn session_mut(&mut self) -> E2eResult<&mut BrowserSession> {
        self.session.as_mut().ok_or(E2eError::SessionClosed)
    }

    /// Close the session if one is open. Idempotent.
    pub async fn close(&mut self) -> E2eResult<()> {
        if let Some(mut session) = self.session.take() {
            info!("Closing browser");
            if let Err(e) = session.close().await {
                warn!("Browser close failed: {}", e);
                return Err(e);
            }
        }
        Ok(())
    }
}
