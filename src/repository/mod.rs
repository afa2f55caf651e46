//! Storage ports for the ingestion pipeline.
//!
//! The pipeline does not own a storage engine; it talks to these traits and
//! the surrounding system plugs in whatever backend it runs. The in-memory
//! implementation in [`memory`] is the reference for the port's semantics:
//! `last_seen` is stamped on every successful upsert, `active` survives
//! upserts and is only ever flipped through [`RecordRepository::set_active`].

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    LifecycleRecord, MediaAsset, NewsItem, OfficeIndex, OfficeRecord, ProjectDetail,
    ProjectManager, ProjectSummary, RecordKind,
};

pub use memory::MemoryRepository;

/// Port for the normalized content records.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    // Project summaries
    async fn get_project(&self, id: &str) -> Result<Option<ProjectSummary>, StoreError>;
    async fn upsert_project(&self, project: ProjectSummary) -> Result<(), StoreError>;
    async fn delete_project(&self, id: &str) -> Result<(), StoreError>;
    async fn list_projects(&self, project_type: Option<&str>)
        -> Result<Vec<ProjectSummary>, StoreError>;

    // Project details
    async fn get_project_detail(&self, id: &str) -> Result<Option<ProjectDetail>, StoreError>;
    async fn upsert_project_detail(&self, detail: ProjectDetail) -> Result<(), StoreError>;
    async fn delete_project_detail(&self, id: &str) -> Result<(), StoreError>;

    // News
    async fn get_news(&self, id: &str) -> Result<Option<NewsItem>, StoreError>;
    async fn upsert_news(&self, item: NewsItem) -> Result<(), StoreError>;
    async fn delete_news(&self, id: &str) -> Result<(), StoreError>;
    async fn list_news_for_project(&self, project_id: &str) -> Result<Vec<NewsItem>, StoreError>;
    /// Delete every news item belonging to a project; returns how many went.
    async fn delete_news_for_project(&self, project_id: &str) -> Result<u32, StoreError>;

    // City offices
    async fn get_office(&self, id: &str) -> Result<Option<OfficeRecord>, StoreError>;
    async fn upsert_office(&self, office: OfficeRecord) -> Result<(), StoreError>;
    async fn delete_office(&self, id: &str) -> Result<(), StoreError>;
    async fn get_office_index(&self) -> Result<Option<OfficeIndex>, StoreError>;
    async fn set_office_index(&self, index: OfficeIndex) -> Result<(), StoreError>;

    // Managers, warnings, notifications (cascade support)
    async fn list_managers(&self) -> Result<Vec<ProjectManager>, StoreError>;
    async fn upsert_manager(&self, manager: ProjectManager) -> Result<(), StoreError>;
    /// Remove a project from every manager's assignment list.
    async fn unassign_project_from_managers(&self, project_id: &str) -> Result<u32, StoreError>;
    async fn delete_warnings_for_project(&self, project_id: &str) -> Result<u32, StoreError>;
    async fn delete_notifications_for_project(&self, project_id: &str)
        -> Result<u32, StoreError>;

    // Lifecycle support
    /// List the lifecycle view of a record family, optionally per category.
    async fn list_lifecycle(
        &self,
        kind: RecordKind,
        project_type: Option<&str>,
    ) -> Result<Vec<LifecycleRecord>, StoreError>;
    /// Flip the `active` flag without touching `last_seen`.
    async fn set_active(
        &self,
        kind: RecordKind,
        id: &str,
        active: bool,
    ) -> Result<(), StoreError>;
}

/// Port for persisted media blobs.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn media_exists(&self, id: &str) -> Result<bool, StoreError>;
    async fn get_media(&self, id: &str) -> Result<Option<MediaAsset>, StoreError>;
    async fn upsert_media(&self, asset: MediaAsset) -> Result<(), StoreError>;
    async fn delete_media(&self, id: &str) -> Result<(), StoreError>;
}
