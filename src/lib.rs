pub mod auth;
pub mod browser;
pub mod capture;
pub mod config;
pub mod describe;
pub mod discovery;
pub mod readiness;
pub mod report;
pub mod run;

pub use auth::AuthStore;
pub use browser::{Browser, BrowserConfig};
pub use capture::{Dashboard, PageCapture};
pub use config::{Config, ConfigError};
pub use describe::{DescriptionModel, GeminiClient};
pub use discovery::{DiscoveryStrategy, Locator, PageDescriptor};
pub use report::{load_reports, sanitize_filename, ReportDescriptor};
pub use run::{run_batch, RunSummary};
