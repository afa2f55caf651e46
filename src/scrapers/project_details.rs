//! Project detail scraper.
//!
//! A detail page carries the full body of a project: categorized text
//! sections, WGS84 coordinates, district attribution, image references,
//! cross-links to news articles and an optional timeline sub-document that
//! is fetched and filtered on its own.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::IngestConfig;
use crate::iprox::{filter, IproxNode};
use crate::models::{
    content_id, Coordinates, HtmlText, NewsReference, ProjectDetail, TextBlock, Timeline,
    TimelineItem,
};
use crate::text;

use super::{image_set_from_entry, str_field, DocumentFetcher};

/// Tags worth harvesting on a detail page.
const PAGE_TARGETS: &[&str] = &[
    "Afbeelding",
    "Afbeeldingen",
    "App categorie",
    "Auteur",
    "Basis afbeelding",
    "Blok",
    "Brondatum",
    "Coordinaten",
    "Fotoshow",
    "Gegevens",
    "Inhoud",
    "Kenmerk",
    "Kenmerken",
    "Koppeling",
    "Lijst",
    "Meta",
    "Nieuws",
    "Omschrijving",
    "Samenvatting",
];

/// Tags worth harvesting on a timeline sub-document.
const TIMELINE_TARGETS: &[&str] = &[
    "Meta",
    "Gegevens",
    "Inhoud",
    "Eigenschappen",
    "Instellingen",
    "Tijdlijn",
    "Hoofditem",
];

pub struct ProjectDetailScraper {
    fetcher: Arc<dyn DocumentFetcher>,
    config: IngestConfig,
}

impl ProjectDetailScraper {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, config: IngestConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetch and parse one project detail page.
    ///
    /// Returns `None` when the page could not be fetched or is not a
    /// detail ("subhome") page — news articles and other page types that
    /// share the URL space are skipped here and picked up elsewhere.
    pub async fn fetch(
        &self,
        source_url: &str,
        identifier: &str,
        project_type: &str,
    ) -> Option<ProjectDetail> {
        let url = format!("{source_url}{}", self.config.page_query);
        let raw = match self.fetcher.get_json(&url).await {
            Ok(value) => value,
            Err(err) => {
                error!(%url, error = %err, "failed fetching project detail");
                return None;
            }
        };

        let Some(item) = raw.get("item") else {
            // Should not happen: it means an erroneous feed upstream.
            warn!(%url, "detail document without item envelope");
            return None;
        };
        let page = item.get("page").cloned().unwrap_or_else(|| Value::Object(Default::default()));
        let page_type = page.get("pagetype").and_then(Value::as_str).unwrap_or_default();
        if page_type != "subhome" {
            debug!(%url, page_type, "skipping non-detail page");
            return None;
        }

        let mut detail = ProjectDetail::new(identifier.to_string(), project_type.to_string());

        let cluster = page.get("cluster").cloned().unwrap_or(Value::Array(Vec::new()));
        self.parse_page(&mut detail, &cluster).await;

        detail.url = item
            .get("Url")
            .and_then(Value::as_str)
            .unwrap_or(source_url)
            .to_string();
        detail.rel_url = item
            .get("relUrl")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| relative_url(&detail.url));
        detail.page_id = int_field(&page, "PagIdt");
        let (title, subtitle) =
            text::split_title(page.get("title").and_then(Value::as_str).unwrap_or_default());
        detail.title = title;
        detail.subtitle = subtitle;

        Some(detail)
    }

    async fn parse_page(&self, detail: &mut ProjectDetail, cluster: &Value) {
        let tree = IproxNode::from_value(cluster);
        for extracted in filter(&tree, PAGE_TARGETS) {
            match extracted.tag.as_str() {
                "Afbeelding" => {
                    for entry in extracted.entries() {
                        let set = image_set_from_entry(&self.config.base_url, entry, "");
                        if !set.sources.is_empty() {
                            detail.images.push(set);
                        }
                    }
                }
                "Omschrijving" => {
                    let mut block = TextBlock::default();
                    let mut app_category = None;
                    for entry in extracted.entries() {
                        match str_field(entry, "Nam") {
                            "App categorie" => {
                                app_category =
                                    entry.get("SelAka").and_then(Value::as_str).map(str::to_string)
                            }
                            "Titel" => block.title = str_field(entry, "Wrd").to_string(),
                            "Tekst" => {
                                block.html = str_field(entry, "Txt").to_string();
                                block.text = text::strip_html(&block.html);
                            }
                            _ => {}
                        }
                    }
                    // Sections without an app category are navigation chrome.
                    if let Some(category) = app_category {
                        if !block.html.is_empty() {
                            detail.body.push(&category, block);
                        }
                    }
                }
                "Koppeling" => {
                    let mut wants_timeline = false;
                    let mut wants_news = false;
                    let mut link_url = String::new();
                    for entry in extracted.entries() {
                        match str_field(entry, "Nam") {
                            "App categorie" => match str_field(entry, "SelAka") {
                                "when-timeline" => wants_timeline = true,
                                "news" => wants_news = true,
                                _ => {}
                            },
                            "Link" => {
                                link_url = entry
                                    .get("link")
                                    .and_then(|l| l.get("Url"))
                                    .and_then(Value::as_str)
                                    .unwrap_or_default()
                                    .to_string();
                            }
                            _ => {}
                        }
                    }
                    if wants_timeline && !link_url.is_empty() {
                        detail.body.timeline = self.fetch_timeline(&link_url).await;
                    } else if wants_news && !link_url.is_empty() {
                        let mut refs =
                            self.fetch_news_references(&link_url, &detail.identifier).await;
                        detail.news.append(&mut refs);
                    }
                }
                "Coordinaten" => {
                    for entry in extracted.entries() {
                        if let Some(coordinates) = parse_coordinates(entry) {
                            detail.coordinates = Some(coordinates);
                        }
                    }
                }
                "Kenmerken" => {
                    for entry in extracted.entries() {
                        if str_field(entry, "Src") == "Stadsdeel" {
                            detail.district_id = entry
                                .get("SelItmIdt")
                                .map(int_value)
                                .unwrap_or(-1)
                                as i32;
                            detail.district_name = str_field(entry, "Wrd").to_string();
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Fetch the timeline sub-document and fold it into a [`Timeline`].
    async fn fetch_timeline(&self, url: &str) -> Option<Timeline> {
        let full_url = format!("{url}{}", self.config.page_query);
        let raw = match self.fetcher.get_json(&full_url).await {
            Ok(value) => value,
            Err(err) => {
                error!(%full_url, error = %err, "failed fetching timeline");
                return None;
            }
        };
        let cluster = raw
            .get("item")
            .and_then(|i| i.get("page"))
            .and_then(|p| p.get("cluster"))
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));

        let tree = IproxNode::from_value(&cluster);
        let extracted = filter(&tree, TIMELINE_TARGETS);

        let mut timeline = Timeline::default();
        let mut pending_props: Option<Vec<Value>> = None;

        for item in &extracted {
            match item.tag.as_str() {
                "Gegevens" => {
                    if let Some(html) = first_text(item.fields.as_slice()) {
                        timeline.title = HtmlText { text: text::strip_html(&html), html };
                    }
                }
                "Inhoud" => {
                    if let Some(html) = first_text(item.fields.as_slice()) {
                        timeline.intro = HtmlText { text: text::strip_html(&html), html };
                    }
                }
                "Eigenschappen" => pending_props = Some(item.fields.clone()),
                "Instellingen" => {
                    if let Some(props) = pending_props.take() {
                        timeline.items.push(timeline_item(&props, &item.fields));
                    }
                }
                _ => {}
            }
        }

        Some(timeline)
    }

    /// Resolve a news cross-link into per-article references.
    async fn fetch_news_references(&self, url: &str, project_id: &str) -> Vec<NewsReference> {
        let listing_url = format!("{url}?new_json=true");
        debug!(%listing_url, "found news link");
        let raw = match self.fetcher.get_json(&listing_url).await {
            Ok(value) => value,
            Err(err) => {
                error!(%listing_url, error = %err, "failed fetching news references");
                return Vec::new();
            }
        };

        raw.as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("feedid").and_then(Value::as_str))
                    .map(|feed_id| NewsReference {
                        identifier: content_id(feed_id),
                        project_identifier: project_id.to_string(),
                        url: feed_id.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn timeline_item(props: &[Value], settings: &[Value]) -> TimelineItem {
    let mut item = TimelineItem::default();
    for entry in props.iter().filter_map(Value::as_object) {
        match str_field(entry, "Nam") {
            "Titel" => {
                let html = str_field(entry, "Wrd").to_string();
                item.title = Some(HtmlText { text: text::strip_html(&html), html });
            }
            "Inleiding" => {
                let html = str_field(entry, "Txt").to_string();
                item.content = Some(HtmlText { text: text::strip_html(&html), html });
            }
            _ => {}
        }
    }
    for entry in settings.iter().filter_map(Value::as_object) {
        match str_field(entry, "Nam") {
            "Status" => item.progress = str_field(entry, "SelWrd").to_string(),
            "Subitems initieel ingeklapt" => {
                item.collapsed = str_field(entry, "Wrd").trim().parse::<i64>().unwrap_or(0) != 0;
            }
            _ => {}
        }
    }
    item
}

/// Pull lon/lat from the embedded coordinate-reference payload, selecting
/// the WGS84 (`EPSG:4326`) entry specifically.
fn parse_coordinates(entry: &serde_json::Map<String, Value>) -> Option<Coordinates> {
    let references = entry.get("Txt")?.get("geo")?.get("json")?.as_array()?;
    let wgs84 = references
        .iter()
        .find(|reference| reference.get("type").and_then(Value::as_str) == Some("EPSG:4326"))?;
    let embedded = wgs84.get("_")?.as_str()?;
    let geometry: Value = serde_json::from_str(embedded).ok()?;
    let coordinates = geometry
        .get("features")?
        .get(0)?
        .get("geometry")?
        .get("coordinates")?
        .as_array()?;
    Some(Coordinates { lon: coordinates.first()?.as_f64()?, lat: coordinates.get(1)?.as_f64()? })
}

fn first_text(fields: &[Value]) -> Option<String> {
    fields
        .iter()
        .filter_map(Value::as_object)
        .find_map(|entry| entry.get("Txt").and_then(Value::as_str))
        .map(str::to_string)
}

fn int_field(value: &Value, key: &str) -> i64 {
    value.get(key).map(int_value).unwrap_or(-1)
}

/// The export is inconsistent about numbers-as-strings; accept both.
fn int_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(-1),
        Value::String(s) => s.trim().parse().unwrap_or(-1),
        _ => -1,
    }
}

fn relative_url(url: &str) -> String {
    let segments: Vec<&str> = url.split('/').collect();
    if segments.len() > 4 {
        segments[3..segments.len() - 1].join("/")
    } else {
        String::new()
    }
}
