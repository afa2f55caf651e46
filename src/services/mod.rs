//! Service layer: the staged ingestion run and the lifecycle pass.
//!
//! Services tie the scrapers, the media pipeline and the repository ports
//! together. They are invoked per content category by whatever scheduler
//! the surrounding system runs.

pub mod ingestion;
pub mod lifecycle;

pub use ingestion::IngestionService;
pub use lifecycle::{
    cascade_for_project, CascadeOp, GarbageCollector, LifecycleAction, LifecycleReport,
};
