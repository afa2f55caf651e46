//! Ingestion core for the IPROX CMS export.
//!
//! The pipeline fetches the nested JSON export of the upstream CMS,
//! normalizes it into project, news and office records, downloads and
//! converts the referenced media through a bounded worker pool, and
//! reconciles record lifecycle across repeated runs. Storage is an
//! external collaborator behind the [`repository`] ports; transport,
//! authentication and serving the records to clients live elsewhere.

pub mod config;
pub mod error;
pub mod iprox;
pub mod media;
pub mod models;
pub mod repository;
pub mod scrapers;
pub mod services;
pub mod text;

pub use config::IngestConfig;
pub use error::{IngestError, StoreError};
pub use models::RunReport;
pub use repository::{MediaRepository, MemoryRepository, RecordRepository};
pub use scrapers::{DocumentFetcher, HttpFetcher};
pub use services::{GarbageCollector, IngestionService};

/// Install the process-wide tracing subscriber, honoring `RUST_LOG`.
///
/// Call once at startup; later calls are ignored so tests can race it.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
