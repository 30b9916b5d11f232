use std::time::{Duration, Instant};

use chromiumoxide::page::Page;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{INDICATOR_TIMEOUT, SETTLE_DELAY};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Loading-indicator patterns observed across Looker front-end versions,
/// most common first. Absence of a selector is not an error.
const LOADING_INDICATORS: &[&str] = &[
    ".lk-loading",
    ".loading-spinner",
    "[data-testid='loading']",
    ".dashboard-loading",
    ".viz-loading",
    "lk-spinner",
];

/// Block until the page is judged ready for capture, or until the budget
/// runs out. Best effort: never errors, never waits forever. The readiness
/// poll owns the budget; indicator waits and the settle delay add bounded
/// extra time only.
pub async fn wait_until_settled(page: &Page, budget: Duration) {
    if !wait_for_ready_state(page, budget).await {
        warn!(budget_secs = budget.as_secs(), "page load wait timed out, capturing as-is");
    }
    for selector in LOADING_INDICATORS {
        if !wait_for_hidden(page, selector, INDICATOR_TIMEOUT).await {
            debug!(selector, "loading indicator still visible after its budget");
        }
    }
    sleep(SETTLE_DELAY).await;
}

async fn wait_for_ready_state(page: &Page, budget: Duration) -> bool {
    let deadline = Instant::now() + budget;
    loop {
        // Evaluation can fail mid-navigation (execution context destroyed);
        // treat that the same as "not ready yet".
        let ready = page
            .evaluate("document.readyState === 'complete'")
            .await
            .ok()
            .and_then(|v| v.into_value::<bool>().ok())
            .unwrap_or(false);
        if ready {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Wait for the selector to be hidden or absent. Returns false only when the
/// element stayed visible for the whole budget.
async fn wait_for_hidden(page: &Page, selector: &str, budget: Duration) -> bool {
    let quoted = match serde_json::to_string(selector) {
        Ok(q) => q,
        Err(_) => return true,
    };
    let expr = format!(
        "(() => {{ const el = document.querySelector({quoted}); \
         if (!el) return true; const cs = getComputedStyle(el); \
         return cs.display === 'none' || cs.visibility === 'hidden' || el.offsetParent === null; }})()"
    );
    let deadline = Instant::now() + budget;
    loop {
        let hidden = page
            .evaluate(expr.as_str())
            .await
            .ok()
            .and_then(|v| v.into_value::<bool>().ok())
            .unwrap_or(true);
        if hidden {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}
