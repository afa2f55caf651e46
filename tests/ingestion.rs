//! End-to-end ingestion run against canned documents and the in-memory
//! repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use iprox_ingest::models::{content_id, ProjectSummary};
use iprox_ingest::repository::{MediaRepository, RecordRepository};
use iprox_ingest::{DocumentFetcher, IngestConfig, IngestError, IngestionService, MemoryRepository};

const NEW_FEED: &str = "https://www.amsterdam.nl/projecten/brug/nieuw/";
const KNOWN_FEED: &str = "https://www.amsterdam.nl/projecten/brug/bekend/";
const NEWS_FEED: &str = "https://www.amsterdam.nl/nieuws/brug-nieuw/artikel/";

/// Serves canned JSON documents by URL prefix and counts byte downloads.
struct SiteFixture {
    pages: HashMap<String, Value>,
    byte_fetches: AtomicU32,
}

impl SiteFixture {
    fn new() -> Self {
        let mut pages = HashMap::new();

        pages.insert(
            "https://www.amsterdam.nl/projecten/bruggen/maatregelen-vernieuwen-bruggen/"
                .to_string(),
            json!([
                {
                    "feedid": NEW_FEED,
                    "title": "Nieuwe brug: herstel",
                    "content": "<p>Nieuw project</p>",
                    "publication_date": "2023-03-01",
                    "modification_date": "2023-03-05",
                    "source_url": NEW_FEED
                },
                {
                    "feedid": KNOWN_FEED,
                    "title": "Bekende brug",
                    "content": "<p>Bestaand project</p>",
                    "publication_date": "2023-01-01",
                    "modification_date": "2023-01-15",
                    "source_url": KNOWN_FEED
                }
            ]),
        );

        // Only the new item has a detail page; the known item must not be
        // refetched under the modification-date policy.
        pages.insert(
            NEW_FEED.to_string(),
            json!({
                "item": {
                    "Url": NEW_FEED,
                    "relUrl": "projecten/brug/nieuw",
                    "page": {
                        "pagetype": "subhome",
                        "PagIdt": 77,
                        "title": "Nieuwe brug: herstel",
                        "cluster": [
                            {"Nam": "Blok", "cluster": [
                                {"Nam": "Omschrijving", "veld": [
                                    {"Nam": "App categorie", "SelAka": "what"},
                                    {"Nam": "Titel", "Wrd": "Wat"},
                                    {"Nam": "Tekst", "Txt": "<p>Herstelwerk</p>"}
                                ]},
                                {"Nam": "Afbeelding", "veld": [{
                                    "Nam": "Afbeelding",
                                    "Src": {"_": "/publish/pages/77/brug.jpg"},
                                    "FilNam": "brug.jpg",
                                    "asset": [
                                        {"Src": {"_": "/publish/pages/77/220px/brug.jpg"}, "FilNam": "brug.jpg"}
                                    ]
                                }]},
                                {"Nam": "Koppeling", "veld": [
                                    {"Nam": "App categorie", "SelAka": "news"},
                                    {"Nam": "Link", "link": {"Url": "https://www.amsterdam.nl/nieuws/brug-nieuw/"}}
                                ]}
                            ]}
                        ]
                    }
                }
            }),
        );

        pages.insert(
            KNOWN_FEED.to_string(),
            json!({
                "item": {
                    "Url": KNOWN_FEED,
                    "relUrl": "projecten/brug/bekend",
                    "page": {
                        "pagetype": "subhome",
                        "PagIdt": 78,
                        "title": "Bekende brug",
                        "cluster": []
                    }
                }
            }),
        );

        pages.insert(
            "https://www.amsterdam.nl/nieuws/brug-nieuw/?new_json=true".to_string(),
            json!([{"feedid": NEWS_FEED}]),
        );

        pages.insert(
            NEWS_FEED.to_string(),
            json!({
                "item": {
                    "page": {
                        "pagetype": "nieuwsartikel",
                        "title": "Artikel over de brug",
                        "CorDtm": "20230310",
                        "cluster": [
                            {"Nam": "Gegevens", "veld": [
                                {"Nam": "Samenvatting", "Txt": "<p>Kort verslag</p>"}
                            ]}
                        ]
                    }
                }
            }),
        );

        pages.insert(
            "https://www.amsterdam.nl/contact/".to_string(),
            json!({
                "item": {
                    "page": {
                        "pagetype": "subhome",
                        "title": "Contact",
                        "cluster": [
                            {"Nam": "Blok", "cluster": [
                                {"Nam": "Omschrijving", "veld": [
                                    {"Nam": "Titel", "Wrd": "Bellen"},
                                    {"Nam": "Tekst", "Txt": "<p>Bel 14 020</p>"}
                                ]},
                                {"Nam": "Verwijzing", "veld": [
                                    {"Nam": "Link", "Wrd": "Stadsloket Centrum",
                                     "link": {"Url": "https://www.amsterdam.nl/contact/centrum/"}}
                                ]}
                            ]}
                        ]
                    }
                }
            }),
        );

        pages.insert(
            "https://www.amsterdam.nl/contact/centrum/".to_string(),
            json!({
                "item": {
                    "page": {
                        "pagetype": "subhome",
                        "title": "Stadsloket Centrum",
                        "cluster": [
                            {"Nam": "Blok", "cluster": [
                                {"Nam": "Omschrijving", "veld": [
                                    {"Nam": "Titel", "Wrd": "Openingstijden"},
                                    {"Nam": "Tekst", "Txt": "<p>ma-vr 9-17</p>"}
                                ]}
                            ]}
                        ]
                    }
                }
            }),
        );

        Self { pages, byte_fetches: AtomicU32::new(0) }
    }
}

#[async_trait]
impl DocumentFetcher for SiteFixture {
    async fn get_json(&self, url: &str) -> Result<Value, IngestError> {
        // Longest matching prefix wins, so /contact/ and /contact/centrum/
        // can coexist.
        self.pages
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, page)| page.clone())
            .ok_or_else(|| IngestError::Status { status: 404, url: url.to_string() })
    }

    async fn get_bytes(&self, _url: &str) -> Result<Vec<u8>, IngestError> {
        self.byte_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0xFF, 0xD8, 0xFF, 0x00]) // JPEG-ish, too short to decode
    }
}

async fn seed_known_project(repository: &MemoryRepository) {
    let mut known = ProjectSummary::new(content_id(KNOWN_FEED), "brug".to_string());
    known.title = "Bekende brug".to_string();
    known.modification_date = "2023-01-15".to_string();
    known.source_url = KNOWN_FEED.to_string();
    repository.upsert_project(known).await.unwrap();
}

#[tokio::test]
async fn run_counts_new_and_unmodified_items() {
    let fixture = Arc::new(SiteFixture::new());
    let repository = Arc::new(MemoryRepository::new());
    seed_known_project(&repository).await;

    let service = IngestionService::new(
        IngestConfig::default(),
        fixture.clone(),
        repository.clone(),
        repository.clone(),
    );
    let report = service.ingest_projects("brug").await;

    assert_eq!(report.new, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(report.unmodified, 1);
    assert_eq!(report.failed, 0);

    // The unchanged item was not refetched: an always-refetch policy would
    // have stored a detail record for it.
    let known_id = content_id(KNOWN_FEED);
    assert!(repository.get_project_detail(&known_id).await.unwrap().is_none());
    let known = repository.get_project(&known_id).await.unwrap().expect("summary kept");
    assert!(known.active, "records seen by the run end active");
}

#[tokio::test]
async fn run_persists_details_news_and_media() {
    let fixture = Arc::new(SiteFixture::new());
    let repository = Arc::new(MemoryRepository::new());
    seed_known_project(&repository).await;

    let service = IngestionService::new(
        IngestConfig::default(),
        fixture.clone(),
        repository.clone(),
        repository.clone(),
    );
    service.ingest_projects("brug").await;

    let new_id = content_id(NEW_FEED);
    let detail = repository.get_project_detail(&new_id).await.unwrap().expect("detail stored");
    assert_eq!(detail.body.what.len(), 1);
    assert_eq!(detail.images.len(), 1);

    // The summary was enriched with the detail's image references.
    let summary = repository.get_project(&new_id).await.unwrap().expect("summary stored");
    assert_eq!(summary.images.len(), 1);

    // The news article discovered through the detail page was scraped.
    let news = repository.get_news(&content_id(NEWS_FEED)).await.unwrap().expect("news stored");
    assert_eq!(news.project_identifier, new_id);
    assert_eq!(news.publication_date, "2023-03-10");
    assert_eq!(news.body.summary.text, "Kort verslag");

    // Both image resolutions were downloaded and stored.
    let orig_id = &summary.images[0].sources["orig"].image_id;
    let sized_id = &summary.images[0].sources["220px"].image_id;
    assert!(repository.get_media(orig_id).await.unwrap().is_some());
    assert!(repository.get_media(sized_id).await.unwrap().is_some());
    assert_eq!(fixture.byte_fetches.load(Ordering::SeqCst), 2);

    // Undecodable "orig" bytes degrade to a variant-less stored asset.
    let orig = repository.get_media(orig_id).await.unwrap().unwrap();
    assert!(orig.variants.is_empty());
    assert_eq!(orig.mime_type, "image/jpeg");
}

#[tokio::test]
async fn second_run_skips_stored_media_and_keeps_counters_stable() {
    let fixture = Arc::new(SiteFixture::new());
    let repository = Arc::new(MemoryRepository::new());

    let service = IngestionService::new(
        IngestConfig::default(),
        fixture.clone(),
        repository.clone(),
        repository.clone(),
    );

    let first = service.ingest_projects("brug").await;
    assert_eq!(first.new, 2);
    let downloads_after_first = fixture.byte_fetches.load(Ordering::SeqCst);

    let second = service.ingest_projects("brug").await;
    assert_eq!(second.new, 0);
    assert_eq!(second.unmodified, 2);
    assert_eq!(
        fixture.byte_fetches.load(Ordering::SeqCst),
        downloads_after_first,
        "content-addressed media is never refetched"
    );
}

#[tokio::test]
async fn office_run_stores_index_and_records() {
    let fixture = Arc::new(SiteFixture::new());
    let repository = Arc::new(MemoryRepository::new());

    let service = IngestionService::new(
        IngestConfig::default(),
        fixture,
        repository.clone(),
        repository.clone(),
    );

    let report = service.ingest_offices().await;
    assert_eq!(report.new, 1);
    assert_eq!(report.failed, 0);

    let index = repository.get_office_index().await.unwrap().expect("index stored");
    assert_eq!(index.contact["Bellen"].text, "Bel 14 020");
    assert_eq!(index.offices.len(), 1);

    let office = repository
        .get_office(&index.offices[0].identifier)
        .await
        .unwrap()
        .expect("office stored");
    assert_eq!(office.location, "Stadsloket Centrum");
    assert_eq!(office.contact["Openingstijden"].text, "ma-vr 9-17");
    assert!(office.active);

    // A second pass over the same listing counts as an update.
    let second = service.ingest_offices().await;
    assert_eq!(second.new, 0);
    assert_eq!(second.updated, 1);
}

#[tokio::test]
async fn project_missing_from_listing_is_deactivated() {
    let fixture = Arc::new(SiteFixture::new());
    let repository = Arc::new(MemoryRepository::new());

    // A project the listing no longer mentions, seen before this run.
    let vanished = ProjectSummary::new("verdwenen".to_string(), "brug".to_string());
    repository.upsert_project(vanished).await.unwrap();

    let service = IngestionService::new(
        IngestConfig::default(),
        fixture,
        repository.clone(),
        repository.clone(),
    );
    service.ingest_projects("brug").await;

    let stored = repository.get_project("verdwenen").await.unwrap().expect("still within window");
    assert!(!stored.active, "unseen records are deactivated, not deleted");
}
