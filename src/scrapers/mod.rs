//! Page-type-specific scrapers over the IPROX export.
//!
//! Each scraper knows one page family: which URL shape to fetch, which tag
//! vocabulary to filter with, and how to map the harvested payloads onto a
//! normalized record. They share the tree filter, the HTML sanitizer and
//! the image-reference helpers below. Transport and decode failures never
//! escape a scraper; the affected unit degrades to its zero value and the
//! problem is logged.

pub mod client;
pub mod news;
pub mod offices;
pub mod project_details;
pub mod projects;

pub use client::{DocumentFetcher, HttpFetcher};
pub use news::{NewsJob, NewsScraper};
pub use offices::OfficeScraper;
pub use project_details::ProjectDetailScraper;
pub use projects::ProjectListScraper;

use serde_json::Value;

use crate::models::{content_id, ImageSet, ImageSource};

/// String field of a payload entry, empty when absent or non-string.
pub(crate) fn str_field<'a>(entry: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// The `Src` location of an entry. Either `{"_": path}` or a bare string,
/// depending on where in the export the entry sits.
pub(crate) fn src_location(value: Option<&Value>) -> &str {
    match value {
        Some(Value::String(path)) => path,
        Some(Value::Object(map)) => map.get("_").and_then(Value::as_str).unwrap_or_default(),
        _ => "",
    }
}

/// Size label encoded in an asset path (`.../80px/name.jpg` → `80px`).
pub(crate) fn size_label_from_path(path: &str) -> &str {
    let mut segments = path.rsplit('/');
    segments.next();
    segments.next().unwrap_or_default()
}

/// Build one image source from a location path and filename.
pub(crate) fn image_source(base_url: &str, location: &str, filename: &str) -> ImageSource {
    let url = format!("{base_url}{location}");
    ImageSource {
        image_id: content_id(&url),
        url,
        filename: filename.to_string(),
        description: String::new(),
    }
}

/// Build an image set from one image entry: the entry's own `Src`/`FilNam`
/// becomes the `orig` source, each `asset` element one sized rendition.
pub(crate) fn image_set_from_entry(
    base_url: &str,
    entry: &serde_json::Map<String, Value>,
    kind: &str,
) -> ImageSet {
    let mut set = ImageSet { kind: kind.to_string(), ..Default::default() };

    if let Some(assets) = entry.get("asset").and_then(Value::as_array) {
        for asset in assets.iter().filter_map(Value::as_object) {
            let location = src_location(asset.get("Src"));
            if location.is_empty() {
                continue;
            }
            let label = size_label_from_path(location).to_string();
            let filename = str_field(asset, "FilNam");
            set.sources.insert(label, image_source(base_url, location, filename));
        }
    }

    let orig_location = src_location(entry.get("Src"));
    if !orig_location.is_empty() {
        let filename = str_field(entry, "FilNam");
        set.sources
            .insert("orig".to_string(), image_source(base_url, orig_location, filename));
    }

    set
}
