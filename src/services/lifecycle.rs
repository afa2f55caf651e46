//! Record lifecycle: remove scraped data whose upstream source is gone,
//! and keep the `active` flag in sync with what the last run saw.
//!
//! Exactly one transition applies per record per pass:
//! unseen for the whole retention window → deleted; seen by the current
//! run → active; seen before the current run started → inactive.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::DEFAULT_RETENTION_DAYS;
use crate::models::{LifecycleRecord, RecordKind};
use crate::repository::RecordRepository;

/// What happened to one record during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Deleted,
    Activated,
    Deactivated,
}

/// Per-identifier outcome of one pass, per record family.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LifecycleReport {
    pub projects: BTreeMap<String, LifecycleAction>,
    pub project_details: BTreeMap<String, LifecycleAction>,
    pub news: BTreeMap<String, LifecycleAction>,
    pub offices: BTreeMap<String, LifecycleAction>,
}

/// One step of a project cascade, in execution order.
///
/// The cascade is explicit data rather than a storage-engine rule so the
/// policy stays visible and testable against any backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOp {
    DeleteDetail(String),
    DeleteNewsForProject(String),
    DeleteWarningsForProject(String),
    DeleteNotificationsForProject(String),
    UnassignFromManagers(String),
}

/// Ordered referential-integrity steps for deleting one root project.
pub fn cascade_for_project(project_id: &str) -> Vec<CascadeOp> {
    let id = project_id.to_string();
    vec![
        CascadeOp::DeleteDetail(id.clone()),
        CascadeOp::DeleteNewsForProject(id.clone()),
        CascadeOp::DeleteWarningsForProject(id.clone()),
        CascadeOp::DeleteNotificationsForProject(id.clone()),
        CascadeOp::UnassignFromManagers(id),
    ]
}

pub struct GarbageCollector {
    last_scrape_time: DateTime<Utc>,
    retention: Duration,
}

impl GarbageCollector {
    pub fn new(last_scrape_time: DateTime<Utc>) -> Self {
        Self { last_scrape_time, retention: Duration::days(DEFAULT_RETENTION_DAYS) }
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention = Duration::days(days);
        self
    }

    /// The transition for one record. Pure; exactly one branch applies.
    pub fn decide(&self, record: &LifecycleRecord) -> LifecycleAction {
        if record.last_seen + self.retention <= self.last_scrape_time {
            LifecycleAction::Deleted
        } else if record.last_seen >= self.last_scrape_time {
            LifecycleAction::Activated
        } else {
            LifecycleAction::Deactivated
        }
    }

    /// Run the pass for one project category: news first, then details,
    /// then the root projects (whose deletion cascades).
    pub async fn collect_projects(
        &self,
        repository: &dyn RecordRepository,
        project_type: &str,
    ) -> LifecycleReport {
        let mut report = LifecycleReport::default();
        report.news = self
            .collect_kind(repository, RecordKind::News, Some(project_type))
            .await;
        report.project_details = self
            .collect_kind(repository, RecordKind::ProjectDetail, Some(project_type))
            .await;
        report.projects = self
            .collect_kind(repository, RecordKind::Project, Some(project_type))
            .await;

        info!(
            project_type,
            projects = report.projects.len(),
            details = report.project_details.len(),
            news = report.news.len(),
            "lifecycle pass finished"
        );
        report
    }

    /// Run the pass for the office records.
    pub async fn collect_offices(&self, repository: &dyn RecordRepository) -> LifecycleReport {
        let mut report = LifecycleReport::default();
        report.offices = self.collect_kind(repository, RecordKind::Office, None).await;
        info!(offices = report.offices.len(), "office lifecycle pass finished");
        report
    }

    async fn collect_kind(
        &self,
        repository: &dyn RecordRepository,
        kind: RecordKind,
        project_type: Option<&str>,
    ) -> BTreeMap<String, LifecycleAction> {
        let mut report = BTreeMap::new();
        let candidates = match repository.list_lifecycle(kind, project_type).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(?kind, error = %err, "failed listing lifecycle candidates");
                return report;
            }
        };

        for record in candidates {
            let action = self.decide(&record);
            if let Err(err) = self.apply(repository, kind, &record, action).await {
                warn!(identifier = %record.identifier, error = %err, "lifecycle transition failed");
                continue;
            }
            report.insert(record.identifier, action);
        }
        report
    }

    async fn apply(
        &self,
        repository: &dyn RecordRepository,
        kind: RecordKind,
        record: &LifecycleRecord,
        action: LifecycleAction,
    ) -> Result<(), crate::error::StoreError> {
        match action {
            LifecycleAction::Deleted => {
                match kind {
                    RecordKind::Project => {
                        repository.delete_project(&record.identifier).await?;
                        self.run_cascade(repository, &record.identifier).await;
                    }
                    RecordKind::ProjectDetail => {
                        repository.delete_project_detail(&record.identifier).await?
                    }
                    RecordKind::News => repository.delete_news(&record.identifier).await?,
                    RecordKind::Office => repository.delete_office(&record.identifier).await?,
                }
                Ok(())
            }
            LifecycleAction::Activated => {
                repository.set_active(kind, &record.identifier, true).await
            }
            LifecycleAction::Deactivated => {
                repository.set_active(kind, &record.identifier, false).await
            }
        }
    }

    async fn run_cascade(&self, repository: &dyn RecordRepository, project_id: &str) {
        for op in cascade_for_project(project_id) {
            let outcome = match &op {
                CascadeOp::DeleteDetail(id) => {
                    repository.delete_project_detail(id).await.map(|_| 0)
                }
                CascadeOp::DeleteNewsForProject(id) => {
                    repository.delete_news_for_project(id).await
                }
                CascadeOp::DeleteWarningsForProject(id) => {
                    repository.delete_warnings_for_project(id).await
                }
                CascadeOp::DeleteNotificationsForProject(id) => {
                    repository.delete_notifications_for_project(id).await
                }
                CascadeOp::UnassignFromManagers(id) => {
                    repository.unassign_project_from_managers(id).await
                }
            };
            if let Err(err) = outcome {
                warn!(project_id, ?op, error = %err, "cascade step failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::models::{
        NewsItem, Notification, ProjectDetail, ProjectManager, ProjectSummary, WarningMessage,
    };
    use crate::repository::{MemoryRepository, RecordRepository};

    fn record(last_seen: DateTime<Utc>) -> LifecycleRecord {
        LifecycleRecord {
            kind: RecordKind::Project,
            identifier: "p".to_string(),
            last_seen,
            active: true,
        }
    }

    #[test]
    fn transition_table() {
        let now = Utc::now();
        let collector = GarbageCollector::new(now);

        assert_eq!(
            collector.decide(&record(now - Duration::days(8))),
            LifecycleAction::Deleted
        );
        assert_eq!(collector.decide(&record(now)), LifecycleAction::Activated);
        assert_eq!(
            collector.decide(&record(now - Duration::hours(1))),
            LifecycleAction::Deactivated
        );
        // Exactly at the window edge: deleted, not deactivated.
        assert_eq!(
            collector.decide(&record(now - Duration::days(7))),
            LifecycleAction::Deleted
        );
    }

    #[test]
    fn cascade_plan_is_ordered_and_complete() {
        let ops = cascade_for_project("p1");
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[0], CascadeOp::DeleteDetail("p1".to_string()));
        assert_eq!(ops[4], CascadeOp::UnassignFromManagers("p1".to_string()));
    }

    async fn seed_project(repo: &MemoryRepository, id: &str, project_type: &str) {
        repo.upsert_project(ProjectSummary::new(id.to_string(), project_type.to_string()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stale_project_cascades_to_dependents_and_managers() {
        let repo = MemoryRepository::new();
        seed_project(&repo, "p1", "brug").await;
        repo.upsert_project_detail(ProjectDetail::new("p1".to_string(), "brug".to_string()))
            .await
            .unwrap();
        for news_id in ["n1", "n2"] {
            repo.upsert_news(NewsItem::new(news_id.to_string(), "p1".to_string(), "brug".to_string()))
                .await
                .unwrap();
        }
        repo.insert_warning(WarningMessage {
            identifier: Uuid::new_v4(),
            project_identifier: "p1".to_string(),
            title: "stremming".to_string(),
            body: String::new(),
            publication_date: Utc::now(),
        })
        .await;
        repo.insert_notification(Notification {
            identifier: Uuid::new_v4(),
            warning_identifier: Uuid::new_v4(),
            project_identifier: "p1".to_string(),
            title: "stremming".to_string(),
        })
        .await;
        repo.upsert_manager(ProjectManager {
            identifier: Uuid::new_v4(),
            email: "om@amsterdam.nl".to_string(),
            projects: vec!["p1".to_string(), "p2".to_string()],
        })
        .await
        .unwrap();

        // Everything was last seen eight days before this "run".
        let future = Utc::now() + Duration::days(8);
        let report = GarbageCollector::new(future).collect_projects(&repo, "brug").await;

        assert_eq!(report.projects["p1"], LifecycleAction::Deleted);
        assert!(repo.get_project("p1").await.unwrap().is_none());
        assert!(repo.get_project_detail("p1").await.unwrap().is_none());
        assert!(repo.get_news("n1").await.unwrap().is_none());
        assert!(repo.get_news("n2").await.unwrap().is_none());
        assert_eq!(repo.warning_count().await, 0);
        assert_eq!(repo.notification_count().await, 0);

        let managers = repo.list_managers().await.unwrap();
        assert_eq!(managers[0].projects, vec!["p2".to_string()]);
    }

    #[tokio::test]
    async fn seen_records_activate_and_missed_records_deactivate() {
        let repo = MemoryRepository::new();
        seed_project(&repo, "fresh", "kade").await;

        // The repository stamped last_seen at upsert; a run that started
        // an hour from now has not "seen" the record.
        let later = Utc::now() + Duration::hours(1);
        let report = GarbageCollector::new(later).collect_projects(&repo, "kade").await;
        assert_eq!(report.projects["fresh"], LifecycleAction::Deactivated);
        assert!(!repo.get_project("fresh").await.unwrap().unwrap().active);

        // A run that started before the upsert has seen it.
        let earlier = Utc::now() - Duration::hours(1);
        let report = GarbageCollector::new(earlier).collect_projects(&repo, "kade").await;
        assert_eq!(report.projects["fresh"], LifecycleAction::Activated);
        assert!(repo.get_project("fresh").await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn pass_is_scoped_to_the_given_category() {
        let repo = MemoryRepository::new();
        seed_project(&repo, "bridge-project", "brug").await;
        seed_project(&repo, "quay-project", "kade").await;

        let later = Utc::now() + Duration::hours(1);
        let report = GarbageCollector::new(later).collect_projects(&repo, "brug").await;

        assert!(report.projects.contains_key("bridge-project"));
        assert!(!report.projects.contains_key("quay-project"));
        assert!(repo.get_project("quay-project").await.unwrap().unwrap().active);
    }
}
