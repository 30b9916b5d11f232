use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Full-load budget for the first render of a report.
pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(60);
/// Tightened budget for in-report page switches.
pub const PAGE_NAV_TIMEOUT: Duration = Duration::from_secs(30);
/// Per-selector budget when waiting for a loading indicator to hide.
pub const INDICATOR_TIMEOUT: Duration = Duration::from_secs(5);
/// Fixed delay after readiness to absorb late animation/render work.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Short pause between a navigation click and the readiness wait.
pub const CLICK_SETTLE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; check your environment")]
    MissingVar(&'static str),
}

/// Process configuration, resolved once at startup and passed by reference
/// into the orchestration chain. A missing required identifier is fatal
/// before any browser work starts.
#[derive(Clone, Debug)]
pub struct Config {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub access_token: String,
    /// Base URL of the BI instance, used by the interactive login flow.
    pub base_url: Option<String>,
    pub auth_state_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };
        Ok(Self {
            project_id: required("VERTEX_PROJECT_ID")?,
            location: lookup("VERTEX_LOCATION").unwrap_or_else(|| "us-central1".into()),
            model: lookup("VERTEX_MODEL").unwrap_or_else(|| "gemini-2.5-flash".into()),
            access_token: required("VERTEX_ACCESS_TOKEN")?,
            base_url: lookup("LOOKER_BASE_URL").filter(|v| !v.trim().is_empty()),
            auth_state_path: PathBuf::from("auth_state.json"),
        })
    }
}
