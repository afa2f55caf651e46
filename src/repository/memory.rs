//! In-memory repository.
//!
//! Backs the test suite and doubles as the reference implementation of the
//! port semantics: upserts stamp `last_seen`, preserve the stored `active`
//! flag, and insert with `active = true` on first sight.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{
    LifecycleRecord, MediaAsset, NewsItem, OfficeIndex, OfficeRecord, ProjectDetail,
    ProjectManager, ProjectSummary, RecordKind,
};

use super::{MediaRepository, RecordRepository};

#[derive(Default)]
struct Tables {
    projects: HashMap<String, ProjectSummary>,
    details: HashMap<String, ProjectDetail>,
    news: HashMap<String, NewsItem>,
    offices: HashMap<String, OfficeRecord>,
    office_index: Option<OfficeIndex>,
    managers: HashMap<uuid::Uuid, ProjectManager>,
    warnings: Vec<crate::models::WarningMessage>,
    notifications: Vec<crate::models::Notification>,
    media: HashMap<String, MediaAsset>,
}

/// Hash-map backed implementation of both storage ports.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a warning message (test helper; warnings are written by a
    /// surface that is out of scope here, but the cascade must see them).
    pub async fn insert_warning(&self, warning: crate::models::WarningMessage) {
        self.tables.write().await.warnings.push(warning);
    }

    /// Seed a notification (test helper, as above).
    pub async fn insert_notification(&self, notification: crate::models::Notification) {
        self.tables.write().await.notifications.push(notification);
    }

    pub async fn warning_count(&self) -> usize {
        self.tables.read().await.warnings.len()
    }

    pub async fn notification_count(&self) -> usize {
        self.tables.read().await.notifications.len()
    }

    pub async fn media_count(&self) -> usize {
        self.tables.read().await.media.len()
    }
}

#[async_trait]
impl RecordRepository for MemoryRepository {
    async fn get_project(&self, id: &str) -> Result<Option<ProjectSummary>, StoreError> {
        Ok(self.tables.read().await.projects.get(id).cloned())
    }

    async fn upsert_project(&self, mut project: ProjectSummary) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.projects.get(&project.identifier) {
            project.active = existing.active;
        }
        project.last_seen = Utc::now();
        tables.projects.insert(project.identifier.clone(), project);
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        self.tables.write().await.projects.remove(id);
        Ok(())
    }

    async fn list_projects(
        &self,
        project_type: Option<&str>,
    ) -> Result<Vec<ProjectSummary>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .filter(|p| project_type.is_none_or(|t| p.project_type == t))
            .cloned()
            .collect())
    }

    async fn get_project_detail(&self, id: &str) -> Result<Option<ProjectDetail>, StoreError> {
        Ok(self.tables.read().await.details.get(id).cloned())
    }

    async fn upsert_project_detail(&self, mut detail: ProjectDetail) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.details.get(&detail.identifier) {
            detail.active = existing.active;
        }
        detail.last_seen = Utc::now();
        tables.details.insert(detail.identifier.clone(), detail);
        Ok(())
    }

    async fn delete_project_detail(&self, id: &str) -> Result<(), StoreError> {
        self.tables.write().await.details.remove(id);
        Ok(())
    }

    async fn get_news(&self, id: &str) -> Result<Option<NewsItem>, StoreError> {
        Ok(self.tables.read().await.news.get(id).cloned())
    }

    async fn upsert_news(&self, mut item: NewsItem) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.news.get(&item.identifier) {
            item.active = existing.active;
        }
        item.last_seen = Utc::now();
        tables.news.insert(item.identifier.clone(), item);
        Ok(())
    }

    async fn delete_news(&self, id: &str) -> Result<(), StoreError> {
        self.tables.write().await.news.remove(id);
        Ok(())
    }

    async fn list_news_for_project(&self, project_id: &str) -> Result<Vec<NewsItem>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .news
            .values()
            .filter(|item| item.project_identifier == project_id)
            .cloned()
            .collect())
    }

    async fn delete_news_for_project(&self, project_id: &str) -> Result<u32, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.news.len();
        tables.news.retain(|_, item| item.project_identifier != project_id);
        Ok((before - tables.news.len()) as u32)
    }

    async fn get_office(&self, id: &str) -> Result<Option<OfficeRecord>, StoreError> {
        Ok(self.tables.read().await.offices.get(id).cloned())
    }

    async fn upsert_office(&self, mut office: OfficeRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.offices.get(&office.identifier) {
            office.active = existing.active;
        }
        office.last_seen = Utc::now();
        tables.offices.insert(office.identifier.clone(), office);
        Ok(())
    }

    async fn delete_office(&self, id: &str) -> Result<(), StoreError> {
        self.tables.write().await.offices.remove(id);
        Ok(())
    }

    async fn get_office_index(&self) -> Result<Option<OfficeIndex>, StoreError> {
        Ok(self.tables.read().await.office_index.clone())
    }

    async fn set_office_index(&self, index: OfficeIndex) -> Result<(), StoreError> {
        self.tables.write().await.office_index = Some(index);
        Ok(())
    }

    async fn list_managers(&self) -> Result<Vec<ProjectManager>, StoreError> {
        Ok(self.tables.read().await.managers.values().cloned().collect())
    }

    async fn upsert_manager(&self, manager: ProjectManager) -> Result<(), StoreError> {
        self.tables.write().await.managers.insert(manager.identifier, manager);
        Ok(())
    }

    async fn unassign_project_from_managers(&self, project_id: &str) -> Result<u32, StoreError> {
        let mut tables = self.tables.write().await;
        let mut touched = 0;
        for manager in tables.managers.values_mut() {
            let before = manager.projects.len();
            manager.projects.retain(|p| p != project_id);
            if manager.projects.len() != before {
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn delete_warnings_for_project(&self, project_id: &str) -> Result<u32, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.warnings.len();
        tables.warnings.retain(|w| w.project_identifier != project_id);
        Ok((before - tables.warnings.len()) as u32)
    }

    async fn delete_notifications_for_project(
        &self,
        project_id: &str,
    ) -> Result<u32, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.notifications.len();
        tables.notifications.retain(|n| n.project_identifier != project_id);
        Ok((before - tables.notifications.len()) as u32)
    }

    async fn list_lifecycle(
        &self,
        kind: RecordKind,
        project_type: Option<&str>,
    ) -> Result<Vec<LifecycleRecord>, StoreError> {
        let tables = self.tables.read().await;
        let records = match kind {
            RecordKind::Project => tables
                .projects
                .values()
                .filter(|p| project_type.is_none_or(|t| p.project_type == t))
                .map(|p| LifecycleRecord {
                    kind,
                    identifier: p.identifier.clone(),
                    last_seen: p.last_seen,
                    active: p.active,
                })
                .collect(),
            RecordKind::ProjectDetail => tables
                .details
                .values()
                .filter(|d| project_type.is_none_or(|t| d.project_type == t))
                .map(|d| LifecycleRecord {
                    kind,
                    identifier: d.identifier.clone(),
                    last_seen: d.last_seen,
                    active: d.active,
                })
                .collect(),
            RecordKind::News => tables
                .news
                .values()
                .filter(|n| project_type.is_none_or(|t| n.project_type == t))
                .map(|n| LifecycleRecord {
                    kind,
                    identifier: n.identifier.clone(),
                    last_seen: n.last_seen,
                    active: n.active,
                })
                .collect(),
            RecordKind::Office => tables
                .offices
                .values()
                .map(|o| LifecycleRecord {
                    kind,
                    identifier: o.identifier.clone(),
                    last_seen: o.last_seen,
                    active: o.active,
                })
                .collect(),
        };
        Ok(records)
    }

    async fn set_active(
        &self,
        kind: RecordKind,
        id: &str,
        active: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let found = match kind {
            RecordKind::Project => tables.projects.get_mut(id).map(|p| p.active = active),
            RecordKind::ProjectDetail => tables.details.get_mut(id).map(|d| d.active = active),
            RecordKind::News => tables.news.get_mut(id).map(|n| n.active = active),
            RecordKind::Office => tables.offices.get_mut(id).map(|o| o.active = active),
        };
        found.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl MediaRepository for MemoryRepository {
    async fn media_exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.media.contains_key(id))
    }

    async fn get_media(&self, id: &str) -> Result<Option<MediaAsset>, StoreError> {
        Ok(self.tables.read().await.media.get(id).cloned())
    }

    async fn upsert_media(&self, asset: MediaAsset) -> Result<(), StoreError> {
        self.tables.write().await.media.insert(asset.identifier.clone(), asset);
        Ok(())
    }

    async fn delete_media(&self, id: &str) -> Result<(), StoreError> {
        self.tables.write().await.media.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectSummary;

    #[tokio::test]
    async fn upsert_refreshes_last_seen_and_preserves_active() {
        let repo = MemoryRepository::new();
        let project = ProjectSummary::new("p1".into(), "brug".into());
        repo.upsert_project(project.clone()).await.unwrap();

        repo.set_active(RecordKind::Project, "p1", false).await.unwrap();
        let seen_before = repo.get_project("p1").await.unwrap().unwrap().last_seen;

        repo.upsert_project(project).await.unwrap();
        let stored = repo.get_project("p1").await.unwrap().unwrap();
        assert!(!stored.active, "active flag must survive upserts");
        assert!(stored.last_seen >= seen_before);
    }

    #[tokio::test]
    async fn set_active_on_missing_record_is_an_error() {
        let repo = MemoryRepository::new();
        let err = repo.set_active(RecordKind::News, "nope", true).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
