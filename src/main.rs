use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dashscribe::{auth, load_reports, run_batch, AuthStore, Browser, BrowserConfig, Config, GeminiClient};

#[derive(Debug, Parser)]
#[command(
    name = "dashscribe",
    version,
    about = "Capture BI dashboard pages and generate descriptions with Gemini via Vertex AI"
)]
struct Cli {
    /// CSV file with columns: name, url, description
    #[arg(value_name = "CSV_FILE")]
    csv_file: PathBuf,

    /// Force re-authentication even if saved auth state exists
    #[arg(long)]
    reauth: bool,

    /// Directory for screenshots, HTML snapshots, and descriptions
    #[arg(long, value_name = "DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Run the capture browser with a visible window
    #[arg(long)]
    headful: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    // Configuration errors are fatal before any browser or network work.
    let config = Config::from_env()?;
    info!(project = %config.project_id, location = %config.location, model = %config.model, "configured");
    let model = GeminiClient::new(&config);

    let reports = load_reports(&cli.csv_file)?;
    info!(reports = reports.len(), "loaded report list");

    let store = AuthStore::new(&config.auth_state_path);
    if cli.reauth && store.exists() {
        store.remove()?;
        info!("removed existing auth state");
    }
    if !store.exists() {
        auth::interactive_login(&store, config.base_url.as_deref()).await?;
    }

    let browser = Browser::launch(BrowserConfig { headless: !cli.headful }).await?;
    store.restore(browser.page()).await?;

    let summary = run_batch(&browser, &model, &reports, &cli.output_dir).await?;
    browser.close().await?;
    info!(
        output = %cli.output_dir.display(),
        described = summary.described,
        skipped = summary.skipped,
        "all done"
    );
    Ok(())
}
