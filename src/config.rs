//! Ingestion configuration.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of workers draining the media queue.
pub const DEFAULT_MEDIA_WORKERS: usize = 10;
/// Default retention window before an unseen record is deleted.
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Settings for one ingestion process.
///
/// Every value has a working default for the production endpoint; a TOML
/// file can override any subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Scheme + host the relative CMS paths hang off.
    pub base_url: String,
    /// Listing path per content category (`brug`, `kade`, ...).
    pub project_paths: HashMap<String, String>,
    /// Path of the city-office listing page.
    pub office_path: String,
    /// Query suffix for listing endpoints.
    pub listing_query: String,
    /// Query suffix for single-page endpoints.
    pub page_query: String,
    /// User agent for all HTTP requests.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// Size of the media worker pool.
    pub media_workers: usize,
    /// Days a record may go unseen before it is deleted.
    pub retention_days: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let mut project_paths = HashMap::new();
        project_paths.insert(
            "brug".to_string(),
            "/projecten/bruggen/maatregelen-vernieuwen-bruggen/".to_string(),
        );
        project_paths.insert(
            "kade".to_string(),
            "/projecten/kademuren/maatregelen-vernieuwing/".to_string(),
        );

        Self {
            base_url: "https://www.amsterdam.nl".to_string(),
            project_paths,
            office_path: "/contact/".to_string(),
            listing_query: "?new_json=true&pager_rows=1000".to_string(),
            page_query: "?AppIdt=app-pagetype&reload=true".to_string(),
            user_agent: "iprox-ingest/0.3 (content mirror)".to_string(),
            request_timeout: 30,
            media_workers: DEFAULT_MEDIA_WORKERS,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl IngestConfig {
    /// Parse a TOML override file on top of the defaults.
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Absolute listing URL for a content category, if configured.
    pub fn listing_url(&self, project_type: &str) -> Option<String> {
        self.project_paths
            .get(project_type)
            .map(|path| format!("{}{}{}", self.base_url, path, self.listing_query))
    }

    /// Absolute office-listing URL.
    pub fn office_url(&self) -> String {
        format!("{}{}{}", self.base_url, self.office_path, self.page_query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_both_categories() {
        let config = IngestConfig::default();
        assert!(config.listing_url("brug").unwrap().contains("pager_rows=1000"));
        assert!(config.listing_url("kade").is_some());
        assert!(config.listing_url("tunnel").is_none());
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config = IngestConfig::from_toml(
            r#"
            base_url = "http://localhost:8000"
            media_workers = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.media_workers, 2);
        assert_eq!(config.retention_days, DEFAULT_RETENTION_DAYS);
    }
}
