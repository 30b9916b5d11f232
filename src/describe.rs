use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::fs as async_fs;

use crate::capture::PageCapture;
use crate::config::Config;

/// Total HTML character budget per generation request. Divided evenly
/// across pages for multi-page reports.
pub const HTML_BUDGET: usize = 50_000;
/// Even division can shrink the per-page share to near zero for very large
/// page counts; keep at least this much context per page.
pub const MIN_PAGE_BUDGET: usize = 500;
pub const TRUNCATION_MARKER: &str = "\n... [HTML truncated]";

const SINGLE_PAGE_PROMPT: &str = "You are analyzing a Looker dashboard/report. Based on the provided information, write a detailed description of this report.

**Report Name:** {name}

**Initial Description:** {description}

**Page HTML:** (provided below)

**Screenshot:** (provided as image)

Please provide a comprehensive description that includes:
1. The purpose and main function of this report
2. Key metrics, KPIs, or data points displayed
3. Any filters, date ranges, or parameters visible
4. The types of visualizations used (charts, tables, etc.)
5. Who would likely use this report and for what decisions
6. Any notable features or sections of the dashboard

Write the description in clear, professional language suitable for documentation.
";

const MULTI_PAGE_PROMPT: &str = "You are analyzing a multi-page Looker dashboard/report. Based on the provided information, write a detailed description of this report.

**Report Name:** {name}

**Initial Description:** {description}

**Pages:** {page_count} pages: {page_names}

**Page HTML:** (one section per page below)

**Screenshots:** (provided as images, one per page in order)

Please provide a comprehensive description that includes:
1. The purpose and main function of this report
2. What each page covers and how the pages relate
3. Key metrics, KPIs, or data points displayed
4. Any filters, date ranges, or parameters visible
5. The types of visualizations used (charts, tables, etc.)
6. Who would likely use this report and for what decisions

Write the description in clear, professional language suitable for documentation.
";

/// The generation collaborator, consumed as a black box:
/// (prompt text, ordered images) in, text out.
#[async_trait]
pub trait DescriptionModel: Send + Sync {
    async fn generate(&self, prompt: &str, images: &[Vec<u8>]) -> Result<String>;
}

/// Truncate to a `budget`-character prefix plus marker; shorter content is
/// passed through untouched.
pub fn truncate_html(html: &str, budget: usize) -> String {
    match html.char_indices().nth(budget) {
        None => html.to_string(),
        Some((byte_idx, _)) => format!("{}{}", &html[..byte_idx], TRUNCATION_MARKER),
    }
}

pub fn per_page_budget(page_count: usize) -> usize {
    (HTML_BUDGET / page_count.max(1)).max(MIN_PAGE_BUDGET)
}

/// Build the prompt text for one report from its ordered captures.
pub fn assemble_prompt(name: &str, description: &str, captures: &[PageCapture]) -> String {
    if captures.len() == 1 {
        let prompt = SINGLE_PAGE_PROMPT
            .replace("{name}", name)
            .replace("{description}", description);
        let html = truncate_html(&captures[0].html_content, HTML_BUDGET);
        return format!("{prompt}\n\n---\n\n**HTML Content:**\n```html\n{html}\n```");
    }

    let page_names: Vec<&str> = captures.iter().map(|c| c.page_name.as_str()).collect();
    let mut prompt = MULTI_PAGE_PROMPT
        .replace("{name}", name)
        .replace("{description}", description)
        .replace("{page_count}", &captures.len().to_string())
        .replace("{page_names}", &page_names.join(", "));
    let budget = per_page_budget(captures.len());
    for capture in captures {
        let html = truncate_html(&capture.html_content, budget);
        prompt.push_str(&format!(
            "\n\n---\n\n**Page {}: {}**\n```html\n{}\n```",
            capture.page_number, capture.page_name, html
        ));
    }
    prompt
}

/// Assemble one generation request from the ordered captures and dispatch
/// it. Failures from the collaborator propagate to the per-report boundary.
pub async fn describe_report(
    model: &dyn DescriptionModel,
    name: &str,
    description: &str,
    captures: &[PageCapture],
) -> Result<String> {
    if captures.is_empty() {
        bail!("no captures to describe for report {name:?}");
    }
    let prompt = assemble_prompt(name, description, captures);
    let mut images = Vec::with_capacity(captures.len());
    for capture in captures {
        let png = async_fs::read(&capture.screenshot_path)
            .await
            .with_context(|| format!("failed to read {}", capture.screenshot_path.display()))?;
        images.push(png);
    }
    model.generate(&prompt, &images).await
}

/// Gemini on Vertex AI over REST.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    access_token: String,
}

impl GeminiClient {
    pub fn new(cfg: &Config) -> Self {
        let api_base = format!("https://{}-aiplatform.googleapis.com", cfg.location);
        Self::with_api_base(cfg, &api_base)
    }

    /// The API base is injectable so tests can point at a local stub.
    pub fn with_api_base(cfg: &Config, api_base: &str) -> Self {
        let endpoint = format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            api_base.trim_end_matches('/'),
            cfg.project_id,
            cfg.location,
            cfg.model
        );
        Self {
            http: Client::new(),
            endpoint,
            access_token: cfg.access_token.clone(),
        }
    }
}

#[async_trait]
impl DescriptionModel for GeminiClient {
    async fn generate(&self, prompt: &str, images: &[Vec<u8>]) -> Result<String> {
        let mut parts = vec![json!({ "text": prompt })];
        for png in images {
            parts.push(json!({
                "inlineData": { "mimeType": "image/png", "data": STANDARD.encode(png) }
            }));
        }
        let body = json!({ "contents": [{ "role": "user", "parts": parts }] });

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            bail!("Vertex AI error {}: {}", status, text);
        }
        let v: Value =
            serde_json::from_str(&text).context("failed to parse Vertex AI response JSON")?;
        let parts = v
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .context("Vertex AI response missing candidates")?;
        let out: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        if out.is_empty() {
            bail!("Vertex AI response contained no text");
        }
        Ok(out)
    }
}
