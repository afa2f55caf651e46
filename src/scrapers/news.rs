//! News article scraper.
//!
//! Project detail pages surface news cross-links; those become queued jobs
//! here. The queue is drained sequentially (articles are few compared to
//! images), and the scraper runs its own nested media pool for the images
//! it discovers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::iprox::{filter, IproxNode};
use crate::media::MediaFetcher;
use crate::models::{
    content_id, DocumentAsset, HtmlText, MediaAsset, NewsItem, NewsReference,
};
use crate::repository::{MediaRepository, RecordRepository};
use crate::text;

use super::{image_set_from_entry, size_label_from_path, src_location, str_field, DocumentFetcher};

const NEWS_TARGETS: &[&str] = &["Meta", "Gegevens", "Inhoud", "Verwijzing", "Download"];

/// One queued article fetch.
#[derive(Debug, Clone)]
pub struct NewsJob {
    pub reference: NewsReference,
    pub project_type: String,
}

pub struct NewsScraper {
    fetcher: Arc<dyn DocumentFetcher>,
    records: Arc<dyn RecordRepository>,
    media_repository: Arc<dyn MediaRepository>,
    media: MediaFetcher,
    config: IngestConfig,
    queue: Mutex<VecDeque<NewsJob>>,
}

impl NewsScraper {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        records: Arc<dyn RecordRepository>,
        media_repository: Arc<dyn MediaRepository>,
        config: IngestConfig,
    ) -> Self {
        let media =
            MediaFetcher::new(Arc::clone(&fetcher), Arc::clone(&media_repository), config.media_workers);
        Self {
            fetcher,
            records,
            media_repository,
            media,
            config,
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn enqueue(&self, job: NewsJob) {
        self.queue.lock().expect("news queue poisoned").push_back(job);
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().expect("news queue poisoned").len()
    }

    /// Drain the queue, persisting every article that scrapes, then drain
    /// the nested image pool.
    pub async fn run(&self) -> u32 {
        let mut stored = 0;
        loop {
            let job = self.queue.lock().expect("news queue poisoned").pop_front();
            let Some(job) = job else { break };

            let Some(item) = self.scrape(&job).await else { continue };
            self.media.enqueue_sets(item.images.iter());

            if let Err(err) = self.records.upsert_news(item).await {
                error!(identifier = %job.reference.identifier, error = %err, "failed storing news item");
                continue;
            }
            stored += 1;
        }

        info!(stored, "news queue drained");
        self.media.run("news images").await;
        stored
    }

    async fn scrape(&self, job: &NewsJob) -> Option<NewsItem> {
        let url = format!("{}{}", job.reference.url, self.config.page_query);
        let raw = match self.fetcher.get_json(&url).await {
            Ok(value) => value,
            Err(err) => {
                error!(%url, error = %err, "failed fetching news article");
                return None;
            }
        };

        let page = raw.get("item").and_then(|i| i.get("page")).cloned().unwrap_or(Value::Null);

        let mut item = NewsItem::new(
            job.reference.identifier.clone(),
            job.reference.project_identifier.clone(),
            job.project_type.clone(),
        );
        item.url = job.reference.url.clone();
        item.title = page.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
        item.publication_date =
            format_date(page.get("CorDtm").and_then(Value::as_str).unwrap_or_default());

        let cluster = page.get("cluster").cloned().unwrap_or(Value::Array(Vec::new()));
        let tree = IproxNode::from_value(&cluster);

        for extracted in filter(&tree, NEWS_TARGETS) {
            match extracted.tag.as_str() {
                "Gegevens" => {
                    for entry in extracted.entries() {
                        match str_field(entry, "Nam") {
                            "Samenvatting" => {
                                item.body.summary = self.html_text(str_field(entry, "Txt"));
                            }
                            "Brondatum" => {
                                let date = format_date(str_field(entry, "Dtm"));
                                if !date.is_empty() {
                                    item.publication_date = date;
                                }
                            }
                            "Hero afbeelding" => {
                                let set =
                                    image_set_from_entry(&self.config.base_url, entry, "banner");
                                if !set.sources.is_empty() {
                                    item.images.push(set);
                                }
                            }
                            _ => {}
                        }
                    }
                }
                "Inhoud" => {
                    for entry in extracted.entries() {
                        match str_field(entry, "Nam") {
                            "Inleiding" => {
                                item.body.preface = self.html_text(str_field(entry, "Txt"));
                            }
                            "Tekst" => {
                                item.body.content = self.html_text(str_field(entry, "Txt"));
                                self.collect_inline_images(&mut item, entry);
                            }
                            _ => {}
                        }
                    }
                }
                "Verwijzing" => {
                    for entry in extracted.entries() {
                        if str_field(entry, "Nam") == "Bestand" {
                            if let Some(asset) = self.fetch_document_asset(entry).await {
                                item.assets.push(asset);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        Some(item)
    }

    fn html_text(&self, html: &str) -> HtmlText {
        let text = text::strip_html(html);
        let html = html.replace(
            "/publish/pages/",
            &format!("{}/publish/pages/", self.config.base_url),
        );
        HtmlText { html, text }
    }

    /// Images embedded in the article body: one single-resolution set each.
    fn collect_inline_images(&self, item: &mut NewsItem, entry: &serde_json::Map<String, Value>) {
        let Some(assets) = entry.get("asset").and_then(Value::as_array) else { return };
        for asset in assets.iter().filter_map(Value::as_object) {
            let location = src_location(asset.get("Src"));
            if location.is_empty() {
                continue;
            }
            // Inline assets come without the /publish prefix of the hero images.
            let location = if location.starts_with('/') {
                location.to_string()
            } else {
                format!("/publish/{location}")
            };
            let label = size_label_from_path(&location).to_string();
            let filename = location.rsplit('/').next().unwrap_or_default().to_string();
            let mut set = crate::models::ImageSet { kind: "additional".to_string(), ..Default::default() };
            set.sources.insert(
                label,
                super::image_source(&self.config.base_url, &location, &filename),
            );
            item.images.push(set);
        }
    }

    /// Download a referenced document once; re-runs find it by identifier
    /// and skip the fetch.
    async fn fetch_document_asset(
        &self,
        entry: &serde_json::Map<String, Value>,
    ) -> Option<DocumentAsset> {
        let location = src_location(entry.get("Src"));
        if location.is_empty() {
            return None;
        }
        let url = format!("{}{location}", self.config.base_url);
        let identifier = content_id(&url);
        let filename = str_field(entry, "FilNam").to_string();
        let extension = filename.rsplit('.').next().unwrap_or_default();
        let mime_type = format!("application/{extension}");

        let exists = match self.media_repository.media_exists(&identifier).await {
            Ok(exists) => exists,
            Err(err) => {
                error!(%url, error = %err, "asset existence check failed");
                return None;
            }
        };

        if !exists {
            match self.fetcher.get_bytes(&url).await {
                Ok(data) => {
                    let stored = MediaAsset {
                        identifier: identifier.clone(),
                        url: url.clone(),
                        size_label: String::new(),
                        filename: filename.clone(),
                        description: String::new(),
                        mime_type: mime_type.clone(),
                        data,
                        gps: None,
                        variants: Default::default(),
                    };
                    if let Err(err) = self.media_repository.upsert_media(stored).await {
                        error!(%url, error = %err, "failed storing document asset");
                        return None;
                    }
                }
                Err(err) => {
                    warn!(%url, error = %err, "failed downloading document asset");
                    return None;
                }
            }
        }

        Some(DocumentAsset {
            identifier,
            mime_type,
            url,
            title: str_field(entry, "Wrd").to_string(),
            filename,
        })
    }
}

/// `YYYYMMDD...` → `YYYY-MM-DD`; anything shorter stays empty.
fn format_date(raw: &str) -> String {
    if raw.len() < 8 || !raw[..8].chars().all(|c| c.is_ascii_digit()) {
        return String::new();
    }
    format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
}
