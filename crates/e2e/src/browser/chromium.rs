//! Headless Chromium backend over the DevTools protocol

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BrowserConfig, BrowserDriver, BrowserLauncher, Viewport};
use crate::error::{E2eError, E2eResult};

/// Launches a local Chrome/Chromium
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, config: &BrowserConfig) -> E2eResult<Box<dyn BrowserDriver>> {
        Ok(Box::new(ChromiumDriver::launch(config).await?))
    }
}

pub struct ChromiumDriver {
    browser: Option<Browser>,
    page: Page,
    handler: Option<JoinHandle<()>>,
}

impl ChromiumDriver {
    pub async fn launch(config: &BrowserConfig) -> E2eResult<Self> {
        let Viewport { width, height } = config.viewport;

        let mut builder = chromiumoxide::BrowserConfig::builder()
            .window_size(width, height)
            .viewport(CdpViewport {
                width,
                height,
                ..Default::default()
            });

        if !config.headless {
            builder = builder.with_head();
        }
        if config.sandbox_disabled {
            builder = builder.no_sandbox();
        }
        if config.shared_memory_workaround {
            builder = builder.arg("--disable-dev-shm-usage");
        }
        if config.gpu_disabled {
            builder = builder.arg("--disable-gpu");
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(E2eError::BrowserLaunch)?;
        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| E2eError::BrowserLaunch(e.to_string()))?;

        // The handler must be polled for the connection to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser event loop ended: {}", e);
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(E2eError::BrowserLaunch(e.to_string()));
            }
        };

        Ok(Self {
            browser: Some(browser),
            page,
            handler: Some(handler),
        })
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> E2eResult<T> {
        Ok(self.page.evaluate(script).await?.into_value()?)
    }
}

/// Quote a Rust string as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn has_text_script(text: &str) -> String {
    format!(
        r#"(() => {{
  const needle = {needle};
  const root = document.body || document.documentElement;
  if (!root) return false;
  const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT);
  while (walker.nextNode()) {{
    const node = walker.currentNode;
    if (node.parentElement && node.parentElement.closest('script, style')) continue;
    if (node.nodeValue.includes(needle)) return true;
  }}
  return false;
}})()"#,
        needle = js_string(text)
    )
}

fn count_script(selector: &str) -> String {
    format!("document.querySelectorAll({}).length", js_string(selector))
}

fn click_text_script(tag: &str, text: &str) -> String {
    format!(
        r#"(() => {{
  const needle = {needle};
  const el = Array.from(document.querySelectorAll({tag})).find(e =>
    Array.from(e.childNodes).some(n => n.nodeType === Node.TEXT_NODE && n.nodeValue.includes(needle)));
  if (!el) return false;
  el.scrollIntoView({{ block: 'center' }});
  el.click();
  return true;
}})()"#,
        needle = js_string(text),
        tag = js_string(tag)
    )
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn content(&mut self) -> E2eResult<String> {
        Ok(self.page.content().await?)
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn has_text(&mut self, text: &str) -> E2eResult<bool> {
        self.eval(has_text_script(text)).await
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        self.eval(count_script(selector)).await
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> E2eResult<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(viewport.width))
            .height(i64::from(viewport.height))
            .device_scale_factor(1.0)
            .mobile(viewport.is_mobile())
            .build()
            .map_err(E2eError::Browser)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn click_text(&mut self, tag: &str, text: &str) -> E2eResult<()> {
        let clicked: bool = self.eval(click_text_script(tag, text)).await?;
        if !clicked {
            return Err(E2eError::AssertionFailed(format!(
                "no <{}> element containing {:?}",
                tag, text
            )));
        }
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        let element = self.page.find_element(selector).await?;
        element.click().await?.type_str(value).await?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser did not close cleanly: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to reap browser process: {}", e);
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        Ok(())
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        // Dropping the Browser kills the child process
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}
