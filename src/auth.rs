use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::page::Page;
use tokio::fs as async_fs;
use tracing::info;

use crate::browser::{Browser, BrowserConfig};

/// The serialized authenticated session: the cookie set of the logged-in
/// browser context, stored as JSON at a fixed path. Written once by the
/// interactive flow, reloaded at startup, reused read-only for the run.
pub struct AuthStore {
    path: PathBuf,
}

impl AuthStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Operator-requested reset (`--reauth`).
    pub fn remove(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }

    pub async fn save(&self, page: &Page) -> Result<()> {
        let cookies = page.get_cookies().await?;
        let blob = serde_json::to_vec_pretty(&cookies)?;
        async_fs::write(&self.path, blob)
            .await
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(path = %self.path.display(), cookies = cookies.len(), "authentication state saved");
        Ok(())
    }

    pub async fn restore(&self, page: &Page) -> Result<()> {
        let blob = async_fs::read(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let cookies: Vec<CookieParam> =
            serde_json::from_slice(&blob).context("malformed authentication state file")?;
        let count = cookies.len();
        if count > 0 {
            page.set_cookies(cookies).await?;
        }
        info!(path = %self.path.display(), cookies = count, "authentication state restored");
        Ok(())
    }
}

/// Open a visible browser, let the operator log in manually, then serialize
/// the resulting session. Blocks on stdin for operator confirmation.
pub async fn interactive_login(store: &AuthStore, base_url: Option<&str>) -> Result<()> {
    println!("\n=== Authentication Required ===");
    println!("A browser window will open. Please log in.");

    let url = match base_url {
        Some(u) => u.to_string(),
        None => prompt("Enter your Looker base URL (e.g. https://company.looker.com): ").await?,
    };

    let browser = Browser::launch(BrowserConfig { headless: false }).await?;
    browser.goto(&url).await?;

    prompt("\nPress Enter after you have successfully logged in...").await?;

    store.save(browser.page()).await?;
    browser.close().await?;
    println!("Authentication complete!");
    Ok(())
}

async fn prompt(message: &str) -> Result<String> {
    let message = message.to_string();
    tokio::task::spawn_blocking(move || -> Result<String> {
        print!("{message}");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
    .await?
}
