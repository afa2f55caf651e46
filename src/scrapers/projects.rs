//! Project listing scraper.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};

use crate::config::IngestConfig;
use crate::models::{content_id, ProjectSummary};
use crate::text;

use super::DocumentFetcher;

/// Fetches the project listing for one content category and maps every row
/// onto a [`ProjectSummary`].
pub struct ProjectListScraper {
    fetcher: Arc<dyn DocumentFetcher>,
    config: IngestConfig,
}

impl ProjectListScraper {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, config: IngestConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch and parse the listing. Any transport or decode failure yields
    /// an empty list; a row that cannot be parsed is skipped.
    pub async fn fetch(&self, project_type: &str) -> Vec<ProjectSummary> {
        let Some(url) = self.config.listing_url(project_type) else {
            warn!(project_type, "no listing path configured");
            return Vec::new();
        };

        let raw = match self.fetcher.get_json(&url).await {
            Ok(value) => value,
            Err(err) => {
                error!(%url, error = %err, "failed fetching project listing");
                return Vec::new();
            }
        };

        let rows = raw.as_array().cloned().unwrap_or_default();
        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            match self.parse_row(row, project_type) {
                Some(summary) => summaries.push(summary),
                None => warn!(%url, "skipping listing row without feed id"),
            }
        }
        summaries
    }

    fn parse_row(&self, row: &Value, project_type: &str) -> Option<ProjectSummary> {
        let feed_id = row.get("feedid").and_then(Value::as_str)?;
        let (title, subtitle) = text::split_title(row.get("title").and_then(Value::as_str).unwrap_or_default());
        let content_html = row.get("content").and_then(Value::as_str).unwrap_or_default();

        let mut summary = ProjectSummary::new(content_id(feed_id), project_type.to_string());
        summary.title = title;
        summary.subtitle = subtitle;
        summary.content_html = content_html.to_string();
        summary.content_text = text::strip_html(content_html);
        summary.publication_date = row
            .get("publication_date")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        summary.modification_date = row
            .get("modification_date")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        summary.source_url = row
            .get("source_url")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(summary)
    }
}
