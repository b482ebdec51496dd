use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::repository::{Record, RecordFilter, RecordKind, Repository, RepositoryError};

/// Process-local store, ordered by `(kind, id)`.
#[derive(Default)]
pub struct InMemoryRepository {
    records: RwLock<BTreeMap<(RecordKind, String), Record>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let records = records
            .into_iter()
            .map(|r| ((r.kind, r.id.clone()), r))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn put(&self, record: Record) -> Result<(), RepositoryError> {
        self.records
            .write()
            .await
            .insert((record.kind, record.id.clone()), record);
        Ok(())
    }

    async fn get(&self, kind: RecordKind, id: &str) -> Result<Option<Record>, RepositoryError> {
        Ok(self.records.read().await.get(&(kind, id.to_string())).cloned())
    }

    async fn delete(&self, kind: RecordKind, id: &str) -> Result<(), RepositoryError> {
        self.records.write().await.remove(&(kind, id.to_string()));
        Ok(())
    }

    async fn list(
        &self,
        kind: RecordKind,
        filter: &RecordFilter,
    ) -> Result<Vec<Record>, RepositoryError> {
        let records = self.records.read().await;
        let mut found: Vec<Record> = records
            .values()
            .filter(|r| r.kind == kind && filter.matches(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.time_created);
        Ok(found)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(kind: RecordKind, id: &str, created: i64) -> Record {
        Record {
            kind,
            id: id.to_string(),
            title: format!("{} {}", kind, id),
            time_created: created,
            time_resolved: None,
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn test_kinds_do_not_collide() {
        let repo = InMemoryRepository::new();
        repo.put(record(RecordKind::Change, "1", 10)).await.unwrap();
        repo.put(record(RecordKind::Incident, "1", 20)).await.unwrap();

        let change = repo.get(RecordKind::Change, "1").await.unwrap().unwrap();
        let incident = repo.get(RecordKind::Incident, "1").await.unwrap().unwrap();
        assert_eq!(change.time_created, 10);
        assert_eq!(incident.time_created, 20);
        assert!(repo.get(RecordKind::Deployment, "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let repo = InMemoryRepository::with_records(vec![
            record(RecordKind::Deployment, "c", 300),
            record(RecordKind::Deployment, "a", 100),
            record(RecordKind::Deployment, "b", 200),
            record(RecordKind::Change, "d", 150),
        ]);

        let all = repo
            .list(RecordKind::Deployment, &RecordFilter::default())
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let window = RecordFilter {
            created_from: Some(150),
            created_to: Some(300),
        };
        let some = repo.list(RecordKind::Deployment, &window).await.unwrap();
        let ids: Vec<&str> = some.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_put_overwrites_and_delete_removes() {
        let repo = InMemoryRepository::new();
        repo.put(record(RecordKind::Incident, "x", 1)).await.unwrap();
        let mut updated = record(RecordKind::Incident, "x", 1);
        updated.time_resolved = Some(5);
        repo.put(updated).await.unwrap();
        assert_eq!(
            repo.get(RecordKind::Incident, "x")
                .await
                .unwrap()
                .unwrap()
                .time_resolved,
            Some(5)
        );

        repo.delete(RecordKind::Incident, "x").await.unwrap();
        repo.delete(RecordKind::Incident, "x").await.unwrap();
        assert!(repo.get(RecordKind::Incident, "x").await.unwrap().is_none());
    }
}
