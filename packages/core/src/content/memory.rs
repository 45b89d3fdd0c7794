//! In-memory ContentStore
//!
//! Reference resource-type implementation: holds content records in memory.
//! Used by embedders that keep content alongside a `MemoryStore`, and by the
//! engine's tests to observe cascades.

use crate::content::ContentStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A piece of content attached to one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub resource_id: String,
    pub text_id: String,
    pub location_id: String,
    /// Level of the location when the content was attached, kept in sync
    /// through `relabel_level`
    pub level: usize,
    pub body: String,
}

#[derive(Debug)]
pub struct MemoryContentStore {
    resource_type: String,
    records: RwLock<Vec<ContentRecord>>,
}

impl MemoryContentStore {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Attach content to a location, returning the new resource id
    pub async fn attach(
        &self,
        text_id: &str,
        location_id: &str,
        level: usize,
        body: impl Into<String>,
    ) -> String {
        let resource_id = Uuid::new_v4().to_string();
        self.records.write().await.push(ContentRecord {
            resource_id: resource_id.clone(),
            text_id: text_id.to_string(),
            location_id: location_id.to_string(),
            level,
            body: body.into(),
        });
        resource_id
    }

    pub async fn contents_for(&self, location_id: &str) -> Vec<ContentRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.location_id == location_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    async fn cascade_delete_contents(&self, location_ids: &[String]) -> anyhow::Result<usize> {
        let doomed: HashSet<&str> = location_ids.iter().map(String::as_str).collect();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !doomed.contains(r.location_id.as_str()));
        Ok(before - records.len())
    }

    async fn relabel_level(
        &self,
        text_id: &str,
        old_level: usize,
        new_level: usize,
    ) -> anyhow::Result<()> {
        let mut records = self.records.write().await;
        for record in records
            .iter_mut()
            .filter(|r| r.text_id == text_id && r.level == old_level)
        {
            record.level = new_level;
        }
        Ok(())
    }

    async fn resource_count_at_level(&self, text_id: &str, level: usize) -> anyhow::Result<usize> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.text_id == text_id && r.level == level)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cascade_delete_only_touches_listed_locations() {
        let store = MemoryContentStore::new("annotation");
        store.attach("t", "loc-a", 0, "note a").await;
        store.attach("t", "loc-a", 0, "note a2").await;
        store.attach("t", "loc-b", 0, "note b").await;

        let deleted = store
            .cascade_delete_contents(&["loc-a".to_string()])
            .await
            .unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.contents_for("loc-b").await[0].body, "note b");
    }

    #[tokio::test]
    async fn test_relabel_level_is_scoped_to_text() {
        let store = MemoryContentStore::new("annotation");
        store.attach("t1", "a", 1, "x").await;
        store.attach("t2", "b", 1, "y").await;

        store.relabel_level("t1", 1, 2).await.unwrap();

        assert_eq!(store.resource_count_at_level("t1", 2).await.unwrap(), 1);
        assert_eq!(store.resource_count_at_level("t1", 1).await.unwrap(), 0);
        assert_eq!(store.resource_count_at_level("t2", 1).await.unwrap(), 1);
    }
}
