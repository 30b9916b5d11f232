use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::Browser as OxideBrowser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::page::{Page, ScreenshotParamsBuilder};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use tracing::warn;

use crate::capture::Dashboard;
use crate::config::{CLICK_SETTLE, PAGE_NAV_TIMEOUT};
use crate::discovery::{self, Locator, PageDescriptor};
use crate::readiness;

#[derive(Clone)]
pub struct BrowserConfig {
    pub headless: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self { headless: true }
    }
}

/// One Chromium instance with a single page, reused sequentially across all
/// reports in a run.
pub struct Browser {
    page: Page,
    browser: OxideBrowser,
}

impl Browser {
    pub async fn launch(cfg: BrowserConfig) -> Result<Self> {
        let mut builder = chromiumoxide::browser::BrowserConfig::builder();
        if !cfg.headless {
            builder = builder.with_head();
        }
        // Use a unique user data dir per run to avoid ProcessSingleton profile
        // lock conflicts when Chromium is restarted rapidly.
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let mut profile_dir: PathBuf = std::env::temp_dir();
        profile_dir.push(format!("dashscribe-profile-{}-{}", std::process::id(), ts));
        let _ = std::fs::create_dir_all(&profile_dir);
        builder = builder.user_data_dir(profile_dir.clone());
        builder = builder
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        let bcfg = builder.build().map_err(|e| anyhow::anyhow!(e))?;
        let (browser, mut handler) = OxideBrowser::launch(bcfg).await?;
        tokio::spawn(async move {
            while let Some(_ev) = handler.next().await {}
        });
        let page = browser.new_page("about:blank").await?;
        // Ensure a non-zero viewport to avoid screenshot 0-width errors.
        let _ = page
            .execute(
                SetDeviceMetricsOverrideParams::builder()
                    .width(1280)
                    .height(800)
                    .device_scale_factor(1.0)
                    .mobile(false)
                    .build()
                    .map_err(|e| anyhow::anyhow!(e))?,
            )
            .await;
        Ok(Self { page, browser })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        let _ = self.browser.wait().await;
        Ok(())
    }

    async fn click_descriptor(&self, descriptor: &PageDescriptor) -> Result<()> {
        match &descriptor.locator {
            Locator::Handle(element) => {
                element.click().await?;
            }
            Locator::Selector { css, index } => {
                // Re-resolve against freshly queried elements; the DOM may
                // have re-rendered since discovery.
                let elements = self.page.find_elements(css.as_str()).await?;
                match elements.get(*index) {
                    Some(element) => {
                        element.click().await?;
                    }
                    None => bail!(
                        "selector {css:?} matched {} elements, wanted index {index}",
                        elements.len()
                    ),
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Dashboard for Browser {
    async fn open_report(&self, url: &str) -> Result<()> {
        // Wait only for the initial document; readiness is the detector's job.
        self.page
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        Ok(())
    }

    async fn wait_until_settled(&self, budget: Duration) {
        readiness::wait_until_settled(&self.page, budget).await;
    }

    async fn discover_pages(&self) -> Vec<PageDescriptor> {
        discovery::discover_pages(&self.page).await
    }

    async fn open_page(&self, descriptor: &PageDescriptor) -> bool {
        if let Err(e) = self.click_descriptor(descriptor).await {
            warn!(
                page = %descriptor.display_name,
                strategy = ?descriptor.strategy,
                error = %e,
                "page navigation failed"
            );
            return false;
        }
        sleep(CLICK_SETTLE).await;
        self.wait_until_settled(PAGE_NAV_TIMEOUT).await;
        true
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let bytes = self
            .page
            .screenshot(ScreenshotParamsBuilder::default().full_page(true).build())
            .await?;
        Ok(bytes)
    }

    async fn cleaned_html(&self) -> Result<String> {
        // Clone the body and strip script/style/noscript subtrees so the
        // artifact stays readable and bounded for the generation request.
        let html = self
            .page
            .evaluate(
                "(() => { const clone = document.body.cloneNode(true); \
                 clone.querySelectorAll('script, style, noscript').forEach(n => n.remove()); \
                 return clone.outerHTML; })()",
            )
            .await?
            .into_value::<String>()?;
        Ok(html)
    }
}
