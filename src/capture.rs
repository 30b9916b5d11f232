use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs as async_fs;
use tracing::{info, warn};

use crate::config::PAGE_LOAD_TIMEOUT;
use crate::discovery::PageDescriptor;
use crate::report::sanitize_filename;

/// The browser capability set the orchestration layer consumes. Implemented
/// by the chromiumoxide wrapper; faked in tests.
#[async_trait]
pub trait Dashboard: Send + Sync {
    async fn open_report(&self, url: &str) -> Result<()>;
    async fn wait_until_settled(&self, budget: Duration);
    async fn discover_pages(&self) -> Vec<PageDescriptor>;
    /// Bring a discovered sub-page into view. Soft failure: `false` means
    /// "skip this page, continue with the rest".
    async fn open_page(&self, descriptor: &PageDescriptor) -> bool;
    async fn screenshot(&self) -> Result<Vec<u8>>;
    async fn cleaned_html(&self) -> Result<String>;
}

/// Persisted artifacts for one captured page, plus the raw HTML retained in
/// memory for prompt assembly. Immutable after creation.
#[derive(Clone, Debug)]
pub struct PageCapture {
    pub page_number: usize,
    pub page_name: String,
    pub screenshot_path: PathBuf,
    pub html_path: PathBuf,
    pub html_content: String,
}

/// Capture the currently displayed page: full-page screenshot plus cleaned
/// HTML, both written under `out_dir`. Write failures propagate; the
/// per-report boundary turns them into a skip.
pub async fn write_capture<D: Dashboard + ?Sized>(
    dashboard: &D,
    out_dir: &Path,
    base_name: &str,
    page_number: usize,
    page_name: &str,
    is_multi_page: bool,
) -> Result<PageCapture> {
    let file_base = if is_multi_page {
        format!("{base_name}_page{page_number}")
    } else {
        base_name.to_string()
    };

    let screenshot_path = out_dir.join(format!("{file_base}.png"));
    let png = dashboard.screenshot().await?;
    async_fs::write(&screenshot_path, &png)
        .await
        .with_context(|| format!("failed to write {}", screenshot_path.display()))?;

    let html_path = out_dir.join(format!("{file_base}.html"));
    let html_content = dashboard.cleaned_html().await?;
    async_fs::write(&html_path, &html_content)
        .await
        .with_context(|| format!("failed to write {}", html_path.display()))?;

    info!(page = page_name, file = %file_base, "page captured");
    Ok(PageCapture {
        page_number,
        page_name: page_name.to_string(),
        screenshot_path,
        html_path,
        html_content,
    })
}

/// Capture one report end to end: navigate, wait for readiness, discover the
/// page set, and capture every reachable page in discovery order.
///
/// Page numbers are the 1-based discovery ordinals; a failed interior
/// navigation leaves a gap rather than renumbering the pages after it. The
/// first discovered page is already on-screen from the initial load and is
/// captured without a navigation step.
pub async fn capture_report<D: Dashboard + ?Sized>(
    dashboard: &D,
    name: &str,
    url: &str,
    out_dir: &Path,
) -> Result<Vec<PageCapture>> {
    dashboard.open_report(url).await?;
    dashboard.wait_until_settled(PAGE_LOAD_TIMEOUT).await;

    let base_name = sanitize_filename(name);
    let pages = dashboard.discover_pages().await;

    if pages.is_empty() {
        let capture = write_capture(dashboard, out_dir, &base_name, 1, "Main", false).await?;
        return Ok(vec![capture]);
    }

    info!(report = name, pages = pages.len(), "multi-page report");
    let mut captures = Vec::with_capacity(pages.len());
    for (position, descriptor) in pages.iter().enumerate() {
        let page_number = position + 1;
        if position > 0 && !dashboard.open_page(descriptor).await {
            warn!(
                report = name,
                page = %descriptor.display_name,
                page_number,
                "skipping unreachable page"
            );
            continue;
        }
        let capture = write_capture(
            dashboard,
            out_dir,
            &base_name,
            page_number,
            &descriptor.display_name,
            true,
        )
        .await?;
        captures.push(capture);
    }
    Ok(captures)
}
