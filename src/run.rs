use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::fs as async_fs;
use tracing::{info, warn};

use crate::capture::{capture_report, Dashboard};
use crate::describe::{describe_report, DescriptionModel};
use crate::report::{sanitize_filename, ReportDescriptor};

#[derive(Clone, Copy, Debug, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub described: usize,
    pub skipped: usize,
}

/// Process the report list sequentially, one browser context for the whole
/// run. Per-report failures are logged and isolated; the run always reaches
/// the end of the list.
pub async fn run_batch<D: Dashboard + ?Sized>(
    dashboard: &D,
    model: &dyn DescriptionModel,
    reports: &[ReportDescriptor],
    out_dir: &Path,
) -> Result<RunSummary> {
    async_fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut summary = RunSummary::default();
    let total = reports.len();
    for (i, report) in reports.iter().enumerate() {
        info!("[{}/{}] processing {}", i + 1, total, report.name);
        summary.processed += 1;
        if report.url.is_empty() {
            warn!(report = %report.name, "skipping report with no url");
            summary.skipped += 1;
            continue;
        }
        match process_report(dashboard, model, report, out_dir).await {
            Ok(path) => {
                summary.described += 1;
                info!(report = %report.name, description = %path.display(), "report described");
            }
            Err(e) => {
                warn!(report = %report.name, error = %e, "report failed, continuing");
                summary.skipped += 1;
            }
        }
    }
    info!(
        processed = summary.processed,
        described = summary.described,
        skipped = summary.skipped,
        "run complete"
    );
    Ok(summary)
}

async fn process_report<D: Dashboard + ?Sized>(
    dashboard: &D,
    model: &dyn DescriptionModel,
    report: &ReportDescriptor,
    out_dir: &Path,
) -> Result<PathBuf> {
    let captures = capture_report(dashboard, &report.name, &report.url, out_dir).await?;
    if captures.is_empty() {
        bail!("no pages captured");
    }
    let text = describe_report(model, &report.name, &report.description, &captures).await?;
    let path = out_dir.join(format!("{}.txt", sanitize_filename(&report.name)));
    async_fs::write(&path, text)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
