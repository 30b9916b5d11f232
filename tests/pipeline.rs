use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use dashscribe::capture::{capture_report, Dashboard};
use dashscribe::describe::DescriptionModel;
use dashscribe::discovery::{DiscoveryStrategy, Locator, PageDescriptor};
use dashscribe::report::ReportDescriptor;
use dashscribe::run::run_batch;

/// In-memory dashboard: a fixed page set, optional navigation failures,
/// and synthetic HTML/screenshot content keyed by the displayed page.
struct FakeDashboard {
    page_names: Vec<String>,
    failing_ordinals: HashSet<usize>,
    failing_urls: HashSet<String>,
    displayed: Mutex<usize>,
}

impl FakeDashboard {
    fn new(page_names: &[&str]) -> Self {
        Self {
            page_names: page_names.iter().map(|s| s.to_string()).collect(),
            failing_ordinals: HashSet::new(),
            failing_urls: HashSet::new(),
            displayed: Mutex::new(0),
        }
    }

    fn failing_ordinal(mut self, ordinal: usize) -> Self {
        self.failing_ordinals.insert(ordinal);
        self
    }

    fn failing_url(mut self, url: &str) -> Self {
        self.failing_urls.insert(url.to_string());
        self
    }
}

#[async_trait]
impl Dashboard for FakeDashboard {
    async fn open_report(&self, url: &str) -> Result<()> {
        if self.failing_urls.contains(url) {
            bail!("navigation to {url} failed");
        }
        *self.displayed.lock().unwrap() = 0;
        Ok(())
    }

    async fn wait_until_settled(&self, _budget: Duration) {}

    async fn discover_pages(&self) -> Vec<PageDescriptor> {
        self.page_names
            .iter()
            .enumerate()
            .map(|(ordinal, name)| PageDescriptor {
                display_name: name.clone(),
                strategy: DiscoveryStrategy::SidebarNav,
                locator: Locator::Selector {
                    css: ".dashboard-page-navigator button".to_string(),
                    index: ordinal,
                },
                ordinal,
            })
            .collect()
    }

    async fn open_page(&self, descriptor: &PageDescriptor) -> bool {
        if self.failing_ordinals.contains(&descriptor.ordinal) {
            return false;
        }
        *self.displayed.lock().unwrap() = descriptor.ordinal;
        true
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let displayed = *self.displayed.lock().unwrap();
        Ok(format!("png-of-page-{displayed}").into_bytes())
    }

    async fn cleaned_html(&self) -> Result<String> {
        let displayed = *self.displayed.lock().unwrap();
        Ok(format!("<div>page {displayed}</div>"))
    }
}

struct StubModel {
    reply: String,
    fail_when_prompt_contains: Option<String>,
    seen_image_counts: Mutex<Vec<usize>>,
}

impl StubModel {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_when_prompt_contains: None,
            seen_image_counts: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, marker: &str) -> Self {
        self.fail_when_prompt_contains = Some(marker.to_string());
        self
    }
}

#[async_trait]
impl DescriptionModel for StubModel {
    async fn generate(&self, prompt: &str, images: &[Vec<u8>]) -> Result<String> {
        if let Some(marker) = &self.fail_when_prompt_contains {
            if prompt.contains(marker.as_str()) {
                bail!("generation unavailable");
            }
        }
        self.seen_image_counts.lock().unwrap().push(images.len());
        Ok(self.reply.clone())
    }
}

fn report(name: &str, url: &str, description: &str) -> ReportDescriptor {
    ReportDescriptor {
        name: name.to_string(),
        url: url.to_string(),
        description: description.to_string(),
    }
}

fn file_exists(dir: &Path, name: &str) -> bool {
    dir.join(name).exists()
}

#[tokio::test]
async fn multi_page_report_captures_all_pages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = FakeDashboard::new(&["Overview", "Revenue", "Churn"]);

    let captures = capture_report(&dashboard, "Metrics", "https://x/dash/1", dir.path())
        .await
        .unwrap();

    assert_eq!(captures.len(), 3);
    for (i, capture) in captures.iter().enumerate() {
        assert_eq!(capture.page_number, i + 1);
    }
    assert_eq!(captures[0].page_name, "Overview");
    assert_eq!(captures[2].page_name, "Churn");
    for n in 1..=3 {
        assert!(file_exists(dir.path(), &format!("Metrics_page{n}.png")));
        assert!(file_exists(dir.path(), &format!("Metrics_page{n}.html")));
    }
}

#[tokio::test]
async fn failed_interior_navigation_leaves_an_ordinal_gap() {
    let dir = tempfile::tempdir().unwrap();
    // Second page (ordinal 1) is unreachable.
    let dashboard = FakeDashboard::new(&["Overview", "Revenue", "Churn"]).failing_ordinal(1);

    let captures = capture_report(&dashboard, "Metrics", "https://x/dash/1", dir.path())
        .await
        .unwrap();

    assert_eq!(captures.len(), 2);
    let numbers: Vec<usize> = captures.iter().map(|c| c.page_number).collect();
    assert_eq!(numbers, vec![1, 3]);
    assert!(file_exists(dir.path(), "Metrics_page1.png"));
    assert!(!file_exists(dir.path(), "Metrics_page2.png"));
    assert!(file_exists(dir.path(), "Metrics_page3.png"));
}

#[tokio::test]
async fn single_page_report_is_captured_as_main_without_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = FakeDashboard::new(&[]);

    let captures = capture_report(&dashboard, "Daily Ops", "https://x/dash/2", dir.path())
        .await
        .unwrap();

    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].page_number, 1);
    assert_eq!(captures[0].page_name, "Main");
    assert!(file_exists(dir.path(), "Daily_Ops.png"));
    assert!(file_exists(dir.path(), "Daily_Ops.html"));
    assert!(!file_exists(dir.path(), "Daily_Ops_page1.png"));
}

#[tokio::test]
async fn batch_writes_description_artifacts_for_sanitized_names() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = FakeDashboard::new(&[]);
    let model = StubModel::new("Generated description of the sales report.");
    let reports = vec![report("Sales/Q1", "https://x", "d")];

    let summary = run_batch(&dashboard, &model, &reports, dir.path())
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.described, 1);
    assert!(file_exists(dir.path(), "Sales_Q1.png"));
    assert!(file_exists(dir.path(), "Sales_Q1.html"));
    let text = std::fs::read_to_string(dir.path().join("Sales_Q1.txt")).unwrap();
    assert_eq!(text, "Generated description of the sales report.");
}

#[tokio::test]
async fn rows_without_url_are_skipped_with_no_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = FakeDashboard::new(&[]);
    let model = StubModel::new("text");
    let reports = vec![report("No Url", "", "d"), report("Has Url", "https://x", "d")];

    let summary = run_batch(&dashboard, &model, &reports, dir.path())
        .await
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.described, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!file_exists(dir.path(), "No_Url.txt"));
    assert!(file_exists(dir.path(), "Has_Url.txt"));
}

#[tokio::test]
async fn one_failing_report_does_not_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = FakeDashboard::new(&[]).failing_url("https://x/broken");
    let model = StubModel::new("text");
    let reports = vec![
        report("Broken", "https://x/broken", "d"),
        report("Fine", "https://x/fine", "d"),
    ];

    let summary = run_batch(&dashboard, &model, &reports, dir.path())
        .await
        .unwrap();

    assert_eq!(summary.described, 1);
    assert_eq!(summary.skipped, 1);
    assert!(!file_exists(dir.path(), "Broken.txt"));
    assert!(file_exists(dir.path(), "Fine.txt"));
}

#[tokio::test]
async fn generation_failure_is_isolated_per_report() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = FakeDashboard::new(&[]);
    let model = StubModel::new("text").failing_on("Cursed");
    let reports = vec![
        report("Cursed", "https://x/1", "d"),
        report("Blessed", "https://x/2", "d"),
    ];

    let summary = run_batch(&dashboard, &model, &reports, dir.path())
        .await
        .unwrap();

    assert_eq!(summary.described, 1);
    assert!(!file_exists(dir.path(), "Cursed.txt"));
    assert!(file_exists(dir.path(), "Blessed.txt"));
}

#[tokio::test]
async fn model_receives_one_image_per_captured_page() {
    let dir = tempfile::tempdir().unwrap();
    let dashboard = FakeDashboard::new(&["A", "B", "C"]).failing_ordinal(2);
    let model = StubModel::new("text");
    let reports = vec![report("Multi", "https://x", "d")];

    run_batch(&dashboard, &model, &reports, dir.path())
        .await
        .unwrap();

    let counts = model.seen_image_counts.lock().unwrap().clone();
    assert_eq!(counts, vec![2]);
}
