//! Bounded media download pool.
//!
//! One shared FIFO queue, a fixed set of workers draining it until empty.
//! Which worker claims which job is unspecified. A job whose identifier is
//! already stored is skipped without a network fetch; the existence check
//! and the write are not atomic, which is fine because the final upsert is
//! keyed by the same identifier either way.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::media::convert;
use crate::models::{ImageSet, MediaAsset, MediaJob};
use crate::repository::MediaRepository;
use crate::scrapers::DocumentFetcher;

/// Completion log of one worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerStats {
    pub worker: usize,
    pub processed: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Aggregate result of one pool run.
#[derive(Debug, Clone, Default)]
pub struct MediaRunReport {
    pub workers: Vec<WorkerStats>,
    pub elapsed_ms: u128,
}

impl MediaRunReport {
    pub fn processed(&self) -> u32 {
        self.workers.iter().map(|w| w.processed).sum()
    }

    pub fn skipped(&self) -> u32 {
        self.workers.iter().map(|w| w.skipped).sum()
    }

    pub fn failed(&self) -> u32 {
        self.workers.iter().map(|w| w.failed).sum()
    }
}

pub struct MediaFetcher {
    fetcher: Arc<dyn DocumentFetcher>,
    repository: Arc<dyn MediaRepository>,
    queue: Arc<Mutex<VecDeque<MediaJob>>>,
    workers: usize,
}

impl MediaFetcher {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        repository: Arc<dyn MediaRepository>,
        workers: usize,
    ) -> Self {
        Self {
            fetcher,
            repository,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            workers: workers.max(1),
        }
    }

    pub fn enqueue(&self, job: MediaJob) {
        self.queue.lock().expect("media queue poisoned").push_back(job);
    }

    /// Queue one job per resolution of every given image set.
    pub fn enqueue_sets<'a>(&self, sets: impl IntoIterator<Item = &'a ImageSet>) {
        for set in sets {
            for job in MediaJob::from_image_set(set) {
                self.enqueue(job);
            }
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().expect("media queue poisoned").len()
    }

    /// Drain the queue with the full worker pool; blocks until every worker
    /// has terminated.
    pub async fn run(&self, label: &str) -> MediaRunReport {
        let started = Instant::now();
        let mut join_set = JoinSet::new();

        for worker in 0..self.workers {
            let queue = Arc::clone(&self.queue);
            let fetcher = Arc::clone(&self.fetcher);
            let repository = Arc::clone(&self.repository);
            join_set.spawn(async move {
                let mut stats = WorkerStats { worker, ..Default::default() };
                loop {
                    let job = queue.lock().expect("media queue poisoned").pop_front();
                    let Some(job) = job else { break };
                    match process_job(fetcher.as_ref(), repository.as_ref(), &job).await {
                        Ok(true) => stats.processed += 1,
                        Ok(false) => stats.skipped += 1,
                        Err(err) => {
                            warn!(url = %job.url, error = %err, "media job failed");
                            stats.failed += 1;
                        }
                    }
                }
                debug!(worker, processed = stats.processed, "media worker out of jobs, terminating");
                stats
            });
        }

        let mut report = MediaRunReport::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(stats) => report.workers.push(stats),
                Err(err) => warn!(error = %err, "media worker panicked"),
            }
        }
        report.elapsed_ms = started.elapsed().as_millis();

        info!(
            label,
            processed = report.processed(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = report.elapsed_ms,
            "media pool drained"
        );
        report
    }
}

/// Returns `Ok(true)` when the asset was fetched and stored, `Ok(false)`
/// when it already existed.
async fn process_job(
    fetcher: &dyn DocumentFetcher,
    repository: &dyn MediaRepository,
    job: &MediaJob,
) -> Result<bool, crate::error::IngestError> {
    if repository.media_exists(&job.identifier).await? {
        return Ok(false);
    }

    let data = fetcher.get_bytes(&job.url).await?;
    let mime_type = mime_guess::from_path(&job.filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let mut asset = MediaAsset {
        identifier: job.identifier.clone(),
        url: job.url.clone(),
        size_label: job.size_label.clone(),
        filename: job.filename.clone(),
        description: job.description.clone(),
        mime_type,
        data,
        gps: None,
        variants: Default::default(),
    };

    // Only full-resolution sources get converted; the sized renditions the
    // CMS publishes are already what they are.
    if job.size_label == "orig" {
        let mut converted = convert(&asset.data, &asset.filename);
        converted.variants.remove("original"); // the raw payload already lives in `data`
        asset.gps = converted.gps;
        asset.variants = converted.variants;
    }

    repository.upsert_media(asset).await?;
    Ok(true)
}
