//! Content Collaborators
//!
//! Content (annotations, translations, media, ...) is owned by resource-type
//! plugins outside this crate. The structure engine only needs three things
//! from them, captured by the `ContentStore` trait:
//!
//! - cascade-delete content attached to deleted locations
//! - relabel content when a level index changes
//! - report how much content a level carries
//!
//! Each resource type registers one `ContentStore` into a `ContentRegistry`
//! built once at startup and handed to the `StructureService`. The engine
//! never inspects which resource types are registered.

mod memory;

pub use memory::{ContentRecord, MemoryContentStore};

use async_trait::async_trait;
use std::sync::Arc;

/// Capability interface implemented by every resource type that attaches
/// content to locations
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Stable resource type identifier (e.g. "annotation")
    fn resource_type(&self) -> &str;

    /// Delete all content attached to any of `location_ids`.
    /// Returns the number of content records removed.
    async fn cascade_delete_contents(&self, location_ids: &[String]) -> anyhow::Result<usize>;

    /// Move content of `text_id` recorded at `old_level` to `new_level`
    async fn relabel_level(
        &self,
        text_id: &str,
        old_level: usize,
        new_level: usize,
    ) -> anyhow::Result<()>;

    /// Number of content records of `text_id` scoped to `level`
    async fn resource_count_at_level(&self, text_id: &str, level: usize) -> anyhow::Result<usize>;
}

/// Registry of content stores, one per resource type
///
/// # Examples
///
/// ```
/// # use strata_core::content::{ContentRegistry, MemoryContentStore};
/// # use std::sync::Arc;
/// let registry = ContentRegistry::new()
///     .with_store(Arc::new(MemoryContentStore::new("annotation")))
///     .with_store(Arc::new(MemoryContentStore::new("translation")));
///
/// assert_eq!(registry.len(), 2);
/// assert!(registry.get("annotation").is_some());
/// ```
#[derive(Clone, Default)]
pub struct ContentRegistry {
    stores: Vec<Arc<dyn ContentStore>>,
}

impl ContentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.register(store);
        self
    }

    /// Register a content store. A store already registered for the same
    /// resource type is replaced.
    pub fn register(&mut self, store: Arc<dyn ContentStore>) {
        let resource_type = store.resource_type().to_string();
        if let Some(existing) = self
            .stores
            .iter_mut()
            .find(|s| s.resource_type() == resource_type)
        {
            tracing::warn!(
                "Replacing content store already registered for resource type '{}'",
                resource_type
            );
            *existing = store;
            return;
        }
        tracing::debug!("Registered content store '{}'", resource_type);
        self.stores.push(store);
    }

    pub fn get(&self, resource_type: &str) -> Option<&Arc<dyn ContentStore>> {
        self.stores
            .iter()
            .find(|s| s.resource_type() == resource_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ContentStore>> {
        self.stores.iter()
    }

    pub fn resource_types(&self) -> Vec<&str> {
        self.stores.iter().map(|s| s.resource_type()).collect()
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl std::fmt::Debug for ContentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRegistry")
            .field("resource_types", &self.resource_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_replaces_same_resource_type() {
        let first = Arc::new(MemoryContentStore::new("annotation"));
        let second = Arc::new(MemoryContentStore::new("annotation"));

        let registry = ContentRegistry::new()
            .with_store(first)
            .with_store(second.clone())
            .with_store(Arc::new(MemoryContentStore::new("media")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resource_types(), vec!["annotation", "media"]);

        let registered = registry.get("annotation").unwrap();
        let expected: Arc<dyn ContentStore> = second;
        assert!(Arc::ptr_eq(registered, &expected));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ContentRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("anything").is_none());
        assert_eq!(format!("{:?}", registry), "ContentRegistry { resource_types: [] }");
    }
}
