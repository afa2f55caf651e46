//! City office scrapers: the listing page and the per-office detail pages.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::config::IngestConfig;
use crate::iprox::{filter, IproxNode};
use crate::models::{content_id, HtmlText, OfficeIndex, OfficeRecord, OfficeRef};
use crate::text;

use super::{image_set_from_entry, str_field, DocumentFetcher};

const LISTING_TARGETS: &[&str] = &[
    "Meta",
    "Gegevens",
    "Samenvatting",
    "Blok",
    "Superlink",
    "Verwijzing",
    "Intern",
    "Link",
    "Lijst",
    "Omschrijving",
    "Titel",
    "Tekst",
    "Afbeelding",
];

pub struct OfficeScraper {
    fetcher: Arc<dyn DocumentFetcher>,
    config: IngestConfig,
}

impl OfficeScraper {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, config: IngestConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch the office listing: general contact sections plus the links to
    /// the individual offices.
    pub async fn fetch_index(&self) -> Option<OfficeIndex> {
        let url = self.config.office_url();
        let raw = match self.fetcher.get_json(&url).await {
            Ok(value) => value,
            Err(err) => {
                error!(%url, error = %err, "failed fetching office listing");
                return None;
            }
        };

        let page = raw.get("item").and_then(|i| i.get("page"))?;
        if page.get("pagetype").and_then(Value::as_str) != Some("subhome") {
            debug!(%url, "office listing is not a subhome page");
            return None;
        }

        let cluster = page.get("cluster").cloned().unwrap_or(Value::Array(Vec::new()));
        let tree = IproxNode::from_value(&cluster);

        let mut index = OfficeIndex::default();
        for extracted in filter(&tree, LISTING_TARGETS) {
            match extracted.tag.as_str() {
                "Omschrijving" => {
                    if let Some((title, section)) = text_section(&extracted) {
                        index.contact.insert(title, section);
                    }
                }
                "Verwijzing" => {
                    for entry in extracted.entries() {
                        if str_field(entry, "Nam") != "Link" {
                            continue;
                        }
                        let link_url = entry
                            .get("link")
                            .and_then(|l| l.get("Url"))
                            .and_then(Value::as_str)
                            .unwrap_or_default();
                        if link_url.is_empty() {
                            continue;
                        }
                        index.offices.push(OfficeRef {
                            location: str_field(entry, "Wrd").to_string(),
                            url: link_url.to_string(),
                            identifier: content_id(link_url),
                        });
                    }
                }
                _ => {}
            }
        }

        Some(index)
    }

    /// Fetch one office detail page.
    pub async fn fetch_office(&self, office: &OfficeRef) -> Option<OfficeRecord> {
        let url = format!("{}{}", office.url, self.config.page_query);
        let raw = match self.fetcher.get_json(&url).await {
            Ok(value) => value,
            Err(err) => {
                error!(%url, error = %err, "failed fetching office page");
                return None;
            }
        };

        let page = raw.get("item").and_then(|i| i.get("page"))?;

        let mut record = OfficeRecord::new(office.identifier.clone());
        record.location = page
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&office.location)
            .to_string();

        let cluster = page.get("cluster").cloned().unwrap_or(Value::Array(Vec::new()));
        let tree = IproxNode::from_value(&cluster);

        for extracted in filter(&tree, LISTING_TARGETS) {
            match extracted.tag.as_str() {
                "Omschrijving" => {
                    let Some((title, section)) = text_section(&extracted) else { continue };
                    match title.as_str() {
                        "Adres" => record.address = Some(section),
                        "Bijzonderheden" => record.info = Some(section),
                        _ => {
                            record.contact.insert(title, section);
                        }
                    }
                }
                "Afbeelding" => {
                    for entry in extracted.entries() {
                        let set = image_set_from_entry(&self.config.base_url, entry, "");
                        if !set.sources.is_empty() {
                            record.images = Some(set);
                        }
                    }
                }
                _ => {}
            }
        }

        Some(record)
    }
}

/// Title + text of one `Omschrijving` block; `None` without both parts.
fn text_section(extracted: &crate::iprox::Extracted) -> Option<(String, HtmlText)> {
    let mut title = None;
    let mut html = None;
    for entry in extracted.entries() {
        match str_field(entry, "Nam") {
            "Titel" => title = Some(str_field(entry, "Wrd").to_string()),
            "Tekst" => html = Some(str_field(entry, "Txt").to_string()),
            _ => {}
        }
    }
    let (title, html) = (title?, html?);
    Some((title, HtmlText { text: text::strip_html(&html), html }))
}
