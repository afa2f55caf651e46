//! Normalized record types produced by the scrapers.
//!
//! Every persistent entity carries a content-derived identifier (a hash of
//! its canonical source URL), a `last_seen` timestamp stamped by the
//! repository on every successful upsert, and an `active` flag owned by the
//! lifecycle collector. Scrapers create and update content fields; they
//! never touch `active`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive a stable identifier from a source URL.
///
/// Repeated calls for the same input yield the same output, which is what
/// makes re-ingestion idempotent: a page keeps its identity across runs.
pub fn content_id(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

/// An HTML fragment together with its sanitized plain-text rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HtmlText {
    pub html: String,
    pub text: String,
}

/// A titled body section (one `Omschrijving` block on a detail page).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub title: String,
    pub html: String,
    pub text: String,
}

/// WGS84 position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lon: f64,
    pub lat: f64,
}

/// One resolution of a published image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub url: String,
    pub image_id: String,
    pub filename: String,
    pub description: String,
}

/// A published image with its per-resolution sources, keyed by size label
/// (`"orig"`, `"80px"`, `"220px"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSet {
    /// Placement hint from the source page: `"banner"`, `"additional"`, or empty.
    #[serde(rename = "type")]
    pub kind: String,
    pub sources: BTreeMap<String, ImageSource>,
}

/// Summary row from a project listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub identifier: String,
    pub project_type: String,
    pub district_id: i32,
    pub district_name: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub content_html: String,
    pub content_text: String,
    pub images: Vec<ImageSet>,
    pub publication_date: String,
    pub modification_date: String,
    pub source_url: String,
    pub last_seen: DateTime<Utc>,
    pub active: bool,
}

impl ProjectSummary {
    pub fn new(identifier: String, project_type: String) -> Self {
        Self {
            identifier,
            project_type,
            district_id: -1,
            district_name: String::new(),
            title: String::new(),
            subtitle: None,
            content_html: String::new(),
            content_text: String::new(),
            images: Vec::new(),
            publication_date: String::new(),
            modification_date: String::new(),
            source_url: String::new(),
            last_seen: Utc::now(),
            active: true,
        }
    }
}

/// Timeline entry on a detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub title: Option<HtmlText>,
    pub content: Option<HtmlText>,
    pub progress: String,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub title: HtmlText,
    pub intro: HtmlText,
    pub items: Vec<TimelineItem>,
}

/// Body sections of a project detail page, keyed by app category.
///
/// The fixed categories mirror the upstream vocabulary; anything the CMS
/// invents beyond those lands in `other` rather than being dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectBody {
    pub contact: Vec<TextBlock>,
    pub what: Vec<TextBlock>,
    pub when: Vec<TextBlock>,
    pub r#where: Vec<TextBlock>,
    pub work: Vec<TextBlock>,
    #[serde(rename = "more-info")]
    pub more_info: Vec<TextBlock>,
    pub timeline: Option<Timeline>,
    #[serde(default)]
    pub other: BTreeMap<String, Vec<TextBlock>>,
}

impl ProjectBody {
    /// Append a block under an app category.
    pub fn push(&mut self, category: &str, block: TextBlock) {
        match category {
            "contact" => self.contact.push(block),
            "what" => self.what.push(block),
            "when" => self.when.push(block),
            "where" => self.r#where.push(block),
            "work" => self.work.push(block),
            "more-info" => self.more_info.push(block),
            other => self.other.entry(other.to_string()).or_default().push(block),
        }
    }
}

/// Cross-link from a project detail page to one of its news articles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsReference {
    pub identifier: String,
    pub project_identifier: String,
    pub url: String,
}

/// Full detail record for a single project page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub identifier: String,
    pub project_type: String,
    pub body: ProjectBody,
    pub coordinates: Option<Coordinates>,
    pub district_id: i32,
    pub district_name: String,
    pub images: Vec<ImageSet>,
    pub news: Vec<NewsReference>,
    pub page_id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub rel_url: String,
    pub url: String,
    pub last_seen: DateTime<Utc>,
    pub active: bool,
}

impl ProjectDetail {
    pub fn new(identifier: String, project_type: String) -> Self {
        Self {
            identifier,
            project_type,
            body: ProjectBody::default(),
            coordinates: None,
            district_id: -1,
            district_name: String::new(),
            images: Vec::new(),
            news: Vec::new(),
            page_id: -1,
            title: String::new(),
            subtitle: None,
            rel_url: String::new(),
            url: String::new(),
            last_seen: Utc::now(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsBody {
    pub summary: HtmlText,
    pub preface: HtmlText,
    pub content: HtmlText,
}

/// A downloadable document attached to a news article (PDF and friends).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentAsset {
    pub identifier: String,
    pub mime_type: String,
    pub url: String,
    pub title: String,
    pub filename: String,
}

/// News article belonging to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub identifier: String,
    pub project_identifier: String,
    pub project_type: String,
    pub url: String,
    pub title: String,
    /// `YYYY-MM-DD`, from the page's source date.
    pub publication_date: String,
    pub body: NewsBody,
    pub images: Vec<ImageSet>,
    pub assets: Vec<DocumentAsset>,
    pub last_seen: DateTime<Utc>,
    pub active: bool,
}

impl NewsItem {
    pub fn new(identifier: String, project_identifier: String, project_type: String) -> Self {
        Self {
            identifier,
            project_identifier,
            project_type,
            url: String::new(),
            title: String::new(),
            publication_date: String::new(),
            body: NewsBody::default(),
            images: Vec::new(),
            assets: Vec::new(),
            last_seen: Utc::now(),
            active: true,
        }
    }
}

/// Link to a city office page, discovered on the office listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfficeRef {
    pub location: String,
    pub url: String,
    pub identifier: String,
}

/// The office listing: general contact sections plus the office links.
/// Stored as a single replaceable record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfficeIndex {
    pub contact: BTreeMap<String, HtmlText>,
    pub offices: Vec<OfficeRef>,
}

/// Detail record for one city office.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeRecord {
    pub identifier: String,
    pub location: String,
    /// Per-topic contact sections, keyed by section title.
    pub contact: BTreeMap<String, HtmlText>,
    pub info: Option<HtmlText>,
    pub address: Option<HtmlText>,
    pub images: Option<ImageSet>,
    pub last_seen: DateTime<Utc>,
    pub active: bool,
}

impl OfficeRecord {
    pub fn new(identifier: String) -> Self {
        Self {
            identifier,
            location: String::new(),
            contact: BTreeMap::new(),
            info: None,
            address: None,
            images: None,
            last_seen: Utc::now(),
            active: true,
        }
    }
}

/// A queued media download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaJob {
    pub url: String,
    pub identifier: String,
    pub filename: String,
    pub description: String,
    pub size_label: String,
}

impl MediaJob {
    /// Build the job list for one image set, one job per resolution.
    pub fn from_image_set(set: &ImageSet) -> Vec<MediaJob> {
        set.sources
            .iter()
            .map(|(size, source)| MediaJob {
                url: source.url.clone(),
                identifier: source.image_id.clone(),
                filename: source.filename.clone(),
                description: source.description.clone(),
                size_label: size.clone(),
            })
            .collect()
    }
}

/// One re-encoded resolution of a stored image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageVariant {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub landscape: bool,
    pub filename: String,
    pub mime_type: String,
}

/// Persisted media blob, keyed by content-derived identifier.
///
/// Written once by the media pool; never mutated afterwards, deleted only
/// through the lifecycle cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub identifier: String,
    pub url: String,
    pub size_label: String,
    pub filename: String,
    pub description: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub gps: Option<Coordinates>,
    #[serde(default)]
    pub variants: BTreeMap<String, ImageVariant>,
}

/// An environment manager and the projects assigned to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManager {
    pub identifier: Uuid,
    pub email: String,
    pub projects: Vec<String>,
}

/// Warning message published for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningMessage {
    pub identifier: Uuid,
    pub project_identifier: String,
    pub title: String,
    pub body: String,
    pub publication_date: DateTime<Utc>,
}

/// Push-notification record hanging off a warning message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub identifier: Uuid,
    pub warning_identifier: Uuid,
    pub project_identifier: String,
    pub title: String,
}

/// Aggregate counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub new: u32,
    pub updated: u32,
    pub unmodified: u32,
    pub failed: u32,
}

/// Which record family a lifecycle candidate belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Project,
    ProjectDetail,
    News,
    Office,
}

/// The view of a record the lifecycle collector operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleRecord {
    pub kind: RecordKind,
    pub identifier: String,
    pub last_seen: DateTime<Utc>,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_id_is_deterministic() {
        let a = content_id("https://www.amsterdam.nl/projecten/brug/");
        let b = content_id("https://www.amsterdam.nl/projecten/brug/");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn content_id_differs_per_url() {
        assert_ne!(content_id("https://a.example/"), content_id("https://b.example/"));
    }

    #[test]
    fn body_push_routes_known_and_unknown_categories() {
        let mut body = ProjectBody::default();
        body.push("contact", TextBlock { title: "t".into(), ..Default::default() });
        body.push("roadworks", TextBlock::default());
        assert_eq!(body.contact.len(), 1);
        assert_eq!(body.other.get("roadworks").map(Vec::len), Some(1));
    }

    #[test]
    fn media_jobs_cover_every_resolution() {
        let mut set = ImageSet::default();
        for label in ["orig", "80px", "220px"] {
            set.sources.insert(
                label.to_string(),
                ImageSource { url: format!("https://x/{label}"), ..Default::default() },
            );
        }
        let jobs = MediaJob::from_image_set(&set);
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().any(|j| j.size_label == "orig"));
    }
}
