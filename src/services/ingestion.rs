//! The ingestion run: summaries, details, the two concurrent download
//! units, then the lifecycle pass.
//!
//! One run covers one content category. Stage 1 fetches the listing;
//! stage 2 walks the items, refetching details only when the listing's
//! modification date moved (new items always fetch); stage 3 drains the
//! media pool and the news scraper as two parallel units and joins both;
//! the lifecycle collector then reconciles against the run-start
//! timestamp. Per-item failures are tallied, never fatal.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::media::MediaFetcher;
use crate::models::{ProjectDetail, ProjectSummary, RunReport};
use crate::repository::{MediaRepository, RecordRepository};
use crate::scrapers::{
    DocumentFetcher, NewsJob, NewsScraper, OfficeScraper, ProjectDetailScraper,
    ProjectListScraper,
};
use crate::services::lifecycle::{GarbageCollector, LifecycleReport};

enum ItemOutcome {
    New,
    Updated,
    Unmodified,
    /// The detail fetch decided this is not a project page; nothing kept.
    NotAProject,
}

pub struct IngestionService {
    config: IngestConfig,
    fetcher: Arc<dyn DocumentFetcher>,
    records: Arc<dyn RecordRepository>,
    media: Arc<dyn MediaRepository>,
}

impl IngestionService {
    pub fn new(
        config: IngestConfig,
        fetcher: Arc<dyn DocumentFetcher>,
        records: Arc<dyn RecordRepository>,
        media: Arc<dyn MediaRepository>,
    ) -> Self {
        Self { config, fetcher, records, media }
    }

    /// Run one ingestion pass for a project category.
    pub async fn ingest_projects(&self, project_type: &str) -> RunReport {
        let run_started = Utc::now();
        info!(project_type, "ingestion run starting");

        let listing =
            ProjectListScraper::new(Arc::clone(&self.fetcher), self.config.clone());
        let details =
            ProjectDetailScraper::new(Arc::clone(&self.fetcher), self.config.clone());
        let media_pool = MediaFetcher::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.media),
            self.config.media_workers,
        );
        let news = NewsScraper::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.records),
            Arc::clone(&self.media),
            self.config.clone(),
        );

        let mut report = RunReport::default();
        for item in listing.fetch(project_type).await {
            let title = item.title.clone();
            match self
                .ingest_item(item, project_type, &details, &media_pool, &news)
                .await
            {
                Ok(ItemOutcome::New) => report.new += 1,
                Ok(ItemOutcome::Updated) => report.updated += 1,
                Ok(ItemOutcome::Unmodified) => report.unmodified += 1,
                Ok(ItemOutcome::NotAProject) => {}
                Err(err) => {
                    error!(project = %title, error = %err, "failed ingesting project");
                    report.failed += 1;
                }
            }
        }

        // The image queue filled up during stage 2; the news queue drains
        // into its own nested pool. Join both before reconciling.
        let (stored_news, media_report) =
            tokio::join!(news.run(), media_pool.run("project images"));

        let lifecycle = GarbageCollector::new(run_started)
            .with_retention_days(self.config.retention_days)
            .collect_projects(self.records.as_ref(), project_type)
            .await;

        info!(
            project_type,
            new = report.new,
            updated = report.updated,
            unmodified = report.unmodified,
            failed = report.failed,
            news = stored_news,
            images = media_report.processed(),
            reconciled = lifecycle.projects.len(),
            "ingestion run finished"
        );
        report
    }

    async fn ingest_item(
        &self,
        mut item: ProjectSummary,
        project_type: &str,
        details: &ProjectDetailScraper,
        media_pool: &MediaFetcher,
        news: &NewsScraper,
    ) -> Result<ItemOutcome, IngestError> {
        let existing = self.records.get_project(&item.identifier).await?;
        let existed = existing.is_some();

        if let Some(stored) = existing {
            if stored.modification_date == item.modification_date {
                self.touch_unmodified(stored).await?;
                return Ok(ItemOutcome::Unmodified);
            }
        }

        match details.fetch(&item.source_url, &item.identifier, project_type).await {
            Some(detail) => {
                self.persist_with_detail(item, detail, project_type, media_pool, news).await?;
                Ok(if existed { ItemOutcome::Updated } else { ItemOutcome::New })
            }
            None => {
                // The page is not (or no longer) a project page; drop any
                // summary we had for it.
                if existed {
                    self.records.delete_project(&item.identifier).await?;
                }
                Ok(ItemOutcome::NotAProject)
            }
        }
    }

    /// Persist a freshly fetched detail record plus the listing summary
    /// enriched with what only the detail page knows, and queue the
    /// follow-up work the detail discovered.
    async fn persist_with_detail(
        &self,
        mut item: ProjectSummary,
        detail: ProjectDetail,
        project_type: &str,
        media_pool: &MediaFetcher,
        news: &NewsScraper,
    ) -> Result<(), IngestError> {
        item.images = detail.images.clone();
        item.district_id = detail.district_id;
        item.district_name = detail.district_name.clone();

        media_pool.enqueue_sets(detail.images.iter());
        for reference in &detail.news {
            news.enqueue(NewsJob {
                reference: reference.clone(),
                project_type: project_type.to_string(),
            });
        }

        self.records.upsert_project_detail(detail).await?;
        self.records.upsert_project(item).await?;
        Ok(())
    }

    /// An unchanged listing row still proves the page exists upstream:
    /// re-upsert the stored records so the repository refreshes their
    /// `last_seen` and the lifecycle pass keeps them.
    async fn touch_unmodified(&self, stored: ProjectSummary) -> Result<(), IngestError> {
        let identifier = stored.identifier.clone();

        if let Some(detail) = self.records.get_project_detail(&identifier).await? {
            self.records.upsert_project_detail(detail).await?;
        }
        for news_item in self.records.list_news_for_project(&identifier).await? {
            self.records.upsert_news(news_item).await?;
        }
        self.records.upsert_project(stored).await?;
        Ok(())
    }

    /// Run one ingestion pass for the city-office pages.
    pub async fn ingest_offices(&self) -> RunReport {
        let run_started = Utc::now();
        info!("office ingestion run starting");

        let scraper = OfficeScraper::new(Arc::clone(&self.fetcher), self.config.clone());
        let media_pool = MediaFetcher::new(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.media),
            self.config.media_workers,
        );

        let mut report = RunReport::default();
        let Some(index) = scraper.fetch_index().await else {
            warn!("office listing unavailable, skipping run");
            report.failed += 1;
            return report;
        };

        for office_ref in &index.offices {
            let outcome: Result<Option<bool>, IngestError> = async {
                let existed = self.records.get_office(&office_ref.identifier).await?.is_some();
                let Some(record) = scraper.fetch_office(office_ref).await else {
                    return Ok(None); // nothing fetched, nothing counted
                };
                media_pool.enqueue_sets(record.images.iter());
                self.records.upsert_office(record).await?;
                Ok(Some(existed))
            }
            .await;

            match outcome {
                Ok(Some(true)) => report.updated += 1,
                Ok(Some(false)) => report.new += 1,
                Ok(None) => {}
                Err(err) => {
                    error!(location = %office_ref.location, error = %err, "failed ingesting office");
                    report.failed += 1;
                }
            }
        }

        if let Err(err) = self.records.set_office_index(index).await {
            error!(error = %err, "failed storing office index");
            report.failed += 1;
        }

        media_pool.run("office images").await;

        let lifecycle: LifecycleReport = GarbageCollector::new(run_started)
            .with_retention_days(self.config.retention_days)
            .collect_offices(self.records.as_ref())
            .await;

        info!(
            new = report.new,
            updated = report.updated,
            failed = report.failed,
            reconciled = lifecycle.offices.len(),
            "office ingestion run finished"
        );
        report
    }
}
