//! Cascade Notifier
//!
//! Propagates structural mutations to the collaborators that depend on the
//! location forest:
//!
//! - content stores: cascade deletes and level relabels, fanned out over
//!   every registered resource type
//! - the search subsystem and other observers: a `StructureChanged` event on
//!   a broadcast channel once a mutation has fully completed

use crate::content::ContentRegistry;
use crate::db::{StoreError, StoreResult, StructureEvent, StructureOperation};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Direction of a level renumbering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelShift {
    /// A level was inserted; levels move one deeper
    Deeper,
    /// A level was removed; levels move one shallower
    Shallower,
}

pub struct CascadeNotifier {
    registry: Arc<ContentRegistry>,
    event_tx: broadcast::Sender<StructureEvent>,
}

impl CascadeNotifier {
    pub fn new(registry: Arc<ContentRegistry>, channel_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(channel_capacity);
        Self { registry, event_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StructureEvent> {
        self.event_tx.subscribe()
    }

    /// Delete content attached to `location_ids` in every registered store.
    /// Returns the total number of content records removed.
    pub async fn cascade_delete_contents(&self, location_ids: &[String]) -> StoreResult<usize> {
        if location_ids.is_empty() {
            return Ok(0);
        }

        let mut total = 0;
        for store in self.registry.iter() {
            total += store
                .cascade_delete_contents(location_ids)
                .await
                .map_err(|e| StoreError::collaborator(store.resource_type(), e))?;
        }
        Ok(total)
    }

    /// Total content of `text_id` scoped to `level` across all stores
    pub async fn resource_count_at_level(&self, text_id: &str, level: usize) -> StoreResult<usize> {
        let mut total = 0;
        for store in self.registry.iter() {
            total += store
                .resource_count_at_level(text_id, level)
                .await
                .map_err(|e| StoreError::collaborator(store.resource_type(), e))?;
        }
        Ok(total)
    }

    /// Relabel content levels `from_level..old_depth` one step in `shift`
    /// direction.
    ///
    /// Deeper shifts walk from the deepest level up and shallower shifts from
    /// the shallowest down, so a relabel never lands on a level that still
    /// holds content waiting for its own relabel.
    pub async fn shift_content_levels(
        &self,
        text_id: &str,
        from_level: usize,
        old_depth: usize,
        shift: LevelShift,
    ) -> StoreResult<()> {
        let levels: Vec<(usize, usize)> = match shift {
            LevelShift::Deeper => (from_level..old_depth).rev().map(|l| (l, l + 1)).collect(),
            LevelShift::Shallower => (from_level.max(1)..old_depth).map(|l| (l, l - 1)).collect(),
        };

        for store in self.registry.iter() {
            for &(old_level, new_level) in &levels {
                store
                    .relabel_level(text_id, old_level, new_level)
                    .await
                    .map_err(|e| StoreError::collaborator(store.resource_type(), e))?;
            }
        }
        Ok(())
    }

    /// Signal that the structure of `text_id` changed
    pub fn structure_changed(&self, text_id: &str, operation: StructureOperation) {
        // No subscribers is fine; the signal is fire-and-forget
        let receivers = self
            .event_tx
            .send(StructureEvent::structure_changed(text_id, operation))
            .unwrap_or(0);
        tracing::debug!(
            "Structure of text {} changed by {} ({} subscribers)",
            text_id,
            operation,
            receivers
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentStore, MemoryContentStore};
    use async_trait::async_trait;
    use tokio::time::{timeout, Duration};

    struct FailingContentStore;

    #[async_trait]
    impl ContentStore for FailingContentStore {
        fn resource_type(&self) -> &str {
            "broken"
        }

        async fn cascade_delete_contents(&self, _ids: &[String]) -> anyhow::Result<usize> {
            anyhow::bail!("backend offline")
        }

        async fn relabel_level(&self, _t: &str, _old: usize, _new: usize) -> anyhow::Result<()> {
            anyhow::bail!("backend offline")
        }

        async fn resource_count_at_level(&self, _t: &str, _level: usize) -> anyhow::Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_cascade_delete_sums_over_stores() {
        let annotations = Arc::new(MemoryContentStore::new("annotation"));
        let media = Arc::new(MemoryContentStore::new("media"));
        annotations.attach("t", "loc", 0, "a").await;
        media.attach("t", "loc", 0, "m1").await;
        media.attach("t", "loc", 0, "m2").await;

        let registry = ContentRegistry::new()
            .with_store(annotations.clone())
            .with_store(media.clone());
        let notifier = CascadeNotifier::new(Arc::new(registry), 8);

        let deleted = notifier
            .cascade_delete_contents(&["loc".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 3);
        assert!(media.is_empty().await);
    }

    #[tokio::test]
    async fn test_shift_deeper_does_not_merge_levels() {
        let content = Arc::new(MemoryContentStore::new("annotation"));
        content.attach("t", "a", 1, "one").await;
        content.attach("t", "b", 2, "two").await;
        let notifier =
            CascadeNotifier::new(Arc::new(ContentRegistry::new().with_store(content.clone())), 8);

        notifier
            .shift_content_levels("t", 1, 3, LevelShift::Deeper)
            .await
            .unwrap();

        assert_eq!(content.contents_for("a").await[0].level, 2);
        assert_eq!(content.contents_for("b").await[0].level, 3);
    }

    #[tokio::test]
    async fn test_shift_shallower_does_not_merge_levels() {
        let content = Arc::new(MemoryContentStore::new("annotation"));
        content.attach("t", "a", 2, "two").await;
        content.attach("t", "b", 3, "three").await;
        let notifier =
            CascadeNotifier::new(Arc::new(ContentRegistry::new().with_store(content.clone())), 8);

        notifier
            .shift_content_levels("t", 2, 4, LevelShift::Shallower)
            .await
            .unwrap();

        assert_eq!(content.contents_for("a").await[0].level, 1);
        assert_eq!(content.contents_for("b").await[0].level, 2);
    }

    #[tokio::test]
    async fn test_collaborator_failure_names_resource_type() {
        let notifier = CascadeNotifier::new(
            Arc::new(ContentRegistry::new().with_store(Arc::new(FailingContentStore))),
            8,
        );

        let err = notifier
            .cascade_delete_contents(&["x".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Collaborator { ref collaborator, .. } if collaborator == "broken"));
    }

    #[tokio::test]
    async fn test_structure_changed_reaches_subscribers() {
        let notifier = CascadeNotifier::new(Arc::new(ContentRegistry::new()), 8);
        let mut rx = notifier.subscribe();

        notifier.structure_changed("text-1", StructureOperation::DeleteLevel);

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event should arrive within 1 second")
            .expect("channel open");
        assert_eq!(
            event,
            StructureEvent::structure_changed("text-1", StructureOperation::DeleteLevel)
        );
    }
}
