//! Structure Service - Structural Mutations
//!
//! This module provides the business logic layer over the location forest:
//!
//! - Text lifecycle (create, get, delete with cascade)
//! - Location creation, rename, move (with descendant cascade) and subtree
//!   delete
//! - Level insertion and deletion with placeholder creation and relinking
//! - Bulk depth-first import of a whole outline
//! - Read operations (children, level listing, root-to-node path, audit)
//!
//! # Ordering Model
//!
//! Every location has a `position` that is contiguous across its entire
//! `(text, level)`. Children of an earlier parent precede children of a later
//! parent, so moving or deleting a location shifts whole blocks on every
//! level below it. The algorithms here walk those levels top-down, deriving
//! each level's shift from the result on the level above.
//!
//! # Failure Model
//!
//! Validation happens before the first write. After that, each step is a
//! single bulk store call; there is no cross-call transaction. A store
//! failure part-way is returned as `StoreFailure` without retrying (a retried
//! position shift would be applied twice) and logged at error level so the
//! text can be checked with [`StructureService::audit_structure`].

use crate::config::EngineConfig;
use crate::content::ContentRegistry;
use crate::db::{LocationStore, StructureEvent, StructureOperation};
use crate::models::{
    CreateLocationParams, DeleteSummary, LevelLabels, Location, MoveLocationParams, NewLocation,
    OutlineNode, Text,
};
use crate::services::cascade_notifier::{CascadeNotifier, LevelShift};
use crate::services::error::StructureError;
use crate::services::position_allocator::PositionAllocator;
use crate::services::structure_audit::{audit_locations, StructureReport};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;

type Result<T> = std::result::Result<T, StructureError>;

/// Orchestrates structural mutations over a `LocationStore`
pub struct StructureService {
    store: Arc<dyn LocationStore>,
    allocator: PositionAllocator,
    notifier: CascadeNotifier,
    config: EngineConfig,
}

impl StructureService {
    /// Create a new StructureService
    ///
    /// # Arguments
    ///
    /// * `store` - Location repository backend
    /// * `registry` - Content stores to cascade into, built at startup
    /// * `config` - Engine configuration (validated here)
    ///
    /// # Examples
    ///
    /// ```
    /// # use strata_core::config::EngineConfig;
    /// # use strata_core::content::ContentRegistry;
    /// # use strata_core::db::MemoryStore;
    /// # use strata_core::services::StructureService;
    /// # use std::sync::Arc;
    /// let service = StructureService::new(
    ///     Arc::new(MemoryStore::new()),
    ///     Arc::new(ContentRegistry::new()),
    ///     EngineConfig::default(),
    /// )
    /// .unwrap();
    /// ```
    pub fn new(
        store: Arc<dyn LocationStore>,
        registry: Arc<ContentRegistry>,
        config: EngineConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(StructureError::initialization_error)?;

        Ok(Self {
            allocator: PositionAllocator::new(store.clone()),
            notifier: CascadeNotifier::new(registry, config.event_channel_capacity),
            store,
            config,
        })
    }

    pub fn store(&self) -> &Arc<dyn LocationStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to structure-changed events
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<StructureEvent> {
        self.notifier.subscribe()
    }

    //
    // TEXTS
    //

    /// Create a text with the given level definitions
    pub async fn create_text(
        &self,
        title: impl Into<String>,
        levels: Vec<LevelLabels>,
        default_level: usize,
    ) -> Result<Text> {
        if default_level >= levels.len().max(1) {
            return Err(StructureError::invalid_level(default_level, levels.len()));
        }
        let text = self
            .store
            .save_text(Text::new(title, levels, default_level))
            .await?;
        tracing::info!("Created text {} with {} levels", text.id, text.depth());
        Ok(text)
    }

    pub async fn get_text(&self, text_id: &str) -> Result<Option<Text>> {
        Ok(self.store.get_text(text_id).await?)
    }

    /// Delete a text together with all of its locations and their content
    pub async fn delete_text(&self, text_id: &str) -> Result<DeleteSummary> {
        let text = self.require_text(text_id).await?;
        let op = StructureOperation::DeleteText;

        let summary = async {
            let ids: Vec<String> = self
                .store
                .find_by_text(&text.id)
                .await?
                .into_iter()
                .map(|l| l.id)
                .collect();
            let contents_deleted = self.notifier.cascade_delete_contents(&ids).await?;
            let locations_deleted = self.store.delete_by_text(&text.id).await?;
            self.store.delete_text(&text.id).await?;
            Ok::<_, StructureError>(DeleteSummary {
                locations_deleted,
                contents_deleted,
            })
        }
        .await
        .inspect_err(|e| self.report_partial_failure(op, &text.id, e))?;

        tracing::info!(
            "Deleted text {} ({} locations, {} contents)",
            text.id,
            summary.locations_deleted,
            summary.contents_deleted
        );
        self.notifier.structure_changed(&text.id, op);
        Ok(summary)
    }

    //
    // LOCATION MUTATIONS
    //

    /// Create a location, appending it after its parent's last child unless
    /// an explicit position inside the parent's child span is requested
    ///
    /// # Errors
    ///
    /// - `NotFound` if the text does not exist
    /// - `InvalidLevel` if `level >= depth`
    /// - `InvalidParent` if the parent is missing, in another text, not one
    ///   level up, or given for a root (or omitted for a non-root)
    /// - `InvalidPosition` if an explicit position falls outside the span
    pub async fn create_location(&self, params: CreateLocationParams) -> Result<Location> {
        let text = self.require_text(&params.text_id).await?;
        check_level(&text, params.level)?;

        let parent = match (params.parent_id.as_deref(), params.level) {
            (None, 0) => None,
            (None, level) => {
                return Err(StructureError::invalid_parent(
                    None,
                    format!("locations on level {} require a parent", level),
                ))
            }
            (Some(parent_id), 0) => {
                return Err(StructureError::invalid_parent(
                    Some(parent_id),
                    "locations on level 0 cannot have a parent",
                ))
            }
            (Some(parent_id), level) => {
                let parent = self.store.get_location(parent_id).await?.ok_or_else(|| {
                    StructureError::invalid_parent(Some(parent_id), "parent does not exist")
                })?;
                check_parent(&parent, &text.id, level)?;
                Some(parent)
            }
        };

        let position = self
            .allocator
            .resolve_position(&text.id, params.level, parent.as_ref(), params.position)
            .await?;

        // Shift before insert: never two locations on one position
        self.allocator
            .make_room(&text.id, params.level, position)
            .await?;
        let location = self
            .store
            .insert_location(NewLocation {
                text_id: text.id.clone(),
                parent_id: parent.map(|p| p.id),
                level: params.level,
                position,
                label: params.label,
            })
            .await
            .map_err(StructureError::from)
            .inspect_err(|e| {
                self.report_partial_failure(StructureOperation::CreateLocation, &text.id, e)
            })?;

        tracing::info!(
            "Created location {} at level {} position {} in text {}",
            location.id,
            location.level,
            location.position,
            text.id
        );
        self.notifier
            .structure_changed(&text.id, StructureOperation::CreateLocation);
        Ok(location)
    }

    /// Change a location's label
    pub async fn rename_location(&self, id: &str, label: impl Into<String>) -> Result<Location> {
        let mut location = self.require_location(id).await?;
        location.label = label.into();
        self.store.replace_many(vec![location.clone()]).await?;

        self.notifier
            .structure_changed(&location.text_id, StructureOperation::RenameLocation);
        Ok(location)
    }

    /// Move a location and its whole subtree to another slot on its level,
    /// optionally under a new parent
    ///
    /// `new_position` names a current slot on the level; the location lands
    /// before it, or after it when `insert_after` is set. Moving a location
    /// onto its own slot is a no-op.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the location or the new parent does not exist
    /// - `InvalidParent` if the new parent is in another text or not one
    ///   level up (or the location is a root)
    /// - `InvalidPosition` if `new_position` is not a slot on the level, or
    ///   the location would land outside its destination parent's children
    pub async fn move_location(&self, params: MoveLocationParams) -> Result<Location> {
        let location = self.require_location(&params.id).await?;
        let text_id = location.text_id.clone();

        let new_parent = match params.new_parent_id.as_deref() {
            None => None,
            Some(parent_id) => {
                let parent = self
                    .store
                    .get_location(parent_id)
                    .await?
                    .ok_or_else(|| StructureError::location_not_found(parent_id))?;
                if location.level == 0 {
                    return Err(StructureError::invalid_parent(
                        Some(parent_id),
                        "locations on level 0 cannot have a parent",
                    ));
                }
                check_parent(&parent, &text_id, location.level)?;
                Some(parent)
            }
        };

        let level_size = self.store.count_at_level(&text_id, location.level).await?;
        if params.new_position >= level_size {
            return Err(StructureError::invalid_position(
                params.new_position,
                format!("level {} has {} locations", location.level, level_size),
            ));
        }

        let current = location.position;
        let forward = params.new_position > current
            || (params.new_position == current && params.insert_after);
        let target = params.new_position + usize::from(params.insert_after) - usize::from(forward);

        let parent_changed = new_parent
            .as_ref()
            .is_some_and(|p| location.parent_id.as_deref() != Some(p.id.as_str()));

        // The subtree must land inside its destination parent's child block
        let destination = match (new_parent, location.parent_id.as_deref()) {
            (Some(parent), _) => Some(parent),
            (None, Some(parent_id)) => {
                let parent = self.store.get_location(parent_id).await?.ok_or_else(|| {
                    StructureError::inconsistent(
                        &text_id,
                        format!("location {} has dangling parent {}", location.id, parent_id),
                    )
                })?;
                Some(parent)
            }
            (None, None) => None,
        };
        if let Some(parent) = &destination {
            let span = self.allocator.child_span_without(parent, &location).await?;
            if !span.contains(&target) {
                return Err(StructureError::invalid_position(
                    params.new_position,
                    format!(
                        "would land on slot {} outside the children of {} (slots {} to {})",
                        target,
                        parent.id,
                        span.start(),
                        span.end()
                    ),
                ));
            }
        }

        if target == current && !parent_changed {
            tracing::debug!("Move of {} to its own slot {} is a no-op", location.id, current);
            return Ok(location);
        }

        let op = StructureOperation::MoveLocation;
        async {
            if let Some(parent) = destination.as_ref().filter(|_| parent_changed) {
                self.store
                    .set_parent(std::slice::from_ref(&location.id), Some(&parent.id))
                    .await?;
            }
            if target != current {
                self.shift_subtree(&location, target).await?;
            }
            Ok::<_, StructureError>(())
        }
        .await
        .inspect_err(|e| self.report_partial_failure(op, &text_id, e))?;

        let moved = self.require_location(&location.id).await?;
        tracing::info!(
            "Moved location {} from position {} to {} on level {}",
            moved.id,
            current,
            moved.position,
            moved.level
        );
        self.notifier.structure_changed(&text_id, op);
        Ok(moved)
    }

    /// Shift `location`'s subtree so that `location` lands on `target`.
    ///
    /// Per level, the moved set jumps over the adjacent window of `distance`
    /// locations and the window closes up behind it. The next level's moved
    /// set is the children of this one; its distance is the number of
    /// children of this level's window.
    async fn shift_subtree(&self, location: &Location, target: usize) -> Result<()> {
        let text_id = location.text_id.as_str();
        let forward = target > location.position;
        let mut distance = location.position.abs_diff(target);
        let mut moved = vec![location.clone()];
        let mut level = location.level;

        while !moved.is_empty() && distance > 0 {
            let first = moved[0].position;
            let last = moved[moved.len() - 1].position;

            let range = if forward {
                last + 1..=last + distance
            } else {
                let start = first.checked_sub(distance).ok_or_else(|| {
                    StructureError::inconsistent(
                        text_id,
                        format!("level {} has no room for a shift of {}", level, distance),
                    )
                })?;
                start..=first - 1
            };

            let moved_ids: Vec<String> = moved.iter().map(|l| l.id.clone()).collect();
            let moved_set: HashSet<&str> = moved_ids.iter().map(String::as_str).collect();
            let window_ids: Vec<String> = self
                .store
                .find_in_position_range(text_id, level, range)
                .await?
                .into_iter()
                .filter(|l| !moved_set.contains(l.id.as_str()))
                .map(|l| l.id)
                .collect();

            if window_ids.len() != distance {
                return Err(StructureError::inconsistent(
                    text_id,
                    format!(
                        "expected {} displaced locations on level {}, found {}",
                        distance,
                        level,
                        window_ids.len()
                    ),
                ));
            }

            let next_moved = self.store.find_children_of(&moved_ids).await?;
            let next_distance = self.store.find_children_of(&window_ids).await?.len();

            let (moved_delta, window_delta) = if forward {
                (distance as i64, -(moved_ids.len() as i64))
            } else {
                (-(distance as i64), moved_ids.len() as i64)
            };
            self.store
                .shift_positions_of(&moved_ids, moved_delta)
                .await?;
            self.store
                .shift_positions_of(&window_ids, window_delta)
                .await?;

            tracing::debug!(
                "Level {}: shifted {} moved by {} and {} displaced by {}",
                level,
                moved_ids.len(),
                moved_delta,
                window_ids.len(),
                window_delta
            );

            moved = next_moved;
            distance = next_distance;
            level += 1;
        }

        Ok(())
    }

    /// Delete a location and every descendant, level by level
    ///
    /// Content attached to each deleted location is cascade-deleted first;
    /// positions after the removed block on each level close up afterwards.
    pub async fn delete_location(&self, id: &str) -> Result<DeleteSummary> {
        let target = self.require_location(id).await?;
        let text_id = target.text_id.clone();
        let op = StructureOperation::DeleteLocation;

        let summary = async {
            let mut summary = DeleteSummary::default();
            let mut current = vec![target];

            while !current.is_empty() {
                let level = current[0].level;
                let last_position = current.iter().map(|l| l.position).max().unwrap_or(0);
                let ids: Vec<String> = current.iter().map(|l| l.id.clone()).collect();

                summary.contents_deleted += self.notifier.cascade_delete_contents(&ids).await?;
                let children = self.store.find_children_of(&ids).await?;

                // Delete before closing the gap: never two locations on one position
                let removed = self.store.delete_many(&ids).await?;
                self.allocator
                    .close_gap(&text_id, level, last_position, removed)
                    .await?;

                tracing::debug!("Level {}: deleted {} locations", level, removed);
                summary.locations_deleted += removed;
                current = children;
            }
            Ok::<_, StructureError>(summary)
        }
        .await
        .inspect_err(|e| self.report_partial_failure(op, &text_id, e))?;

        tracing::info!(
            "Deleted location {} with subtree ({} locations, {} contents)",
            id,
            summary.locations_deleted,
            summary.contents_deleted
        );
        self.notifier.structure_changed(&text_id, op);
        Ok(summary)
    }

    //
    // LEVEL MUTATIONS
    //

    /// Insert a new level at `index`
    ///
    /// Every location at `index - 1` receives exactly one placeholder child on
    /// the new level, which adopts all of its former children. Inserting at 0
    /// creates a single root placeholder that adopts all former roots.
    pub async fn insert_level(
        &self,
        text_id: &str,
        index: usize,
        level_labels: LevelLabels,
    ) -> Result<Text> {
        let mut text = self.require_text(text_id).await?;
        if index > text.depth() {
            return Err(StructureError::invalid_level(index, text.depth()));
        }
        let old_depth = text.depth();
        let op = StructureOperation::InsertLevel;

        text.insert_level_labels(index, level_labels);

        let text = async {
            let text = self.store.save_text(text).await?;

            let renumbered = self.store.shift_levels(&text.id, index, 1).await?;
            self.notifier
                .shift_content_levels(&text.id, index, old_depth, LevelShift::Deeper)
                .await?;
            tracing::debug!("Moved {} locations one level deeper", renumbered);

            let placeholders = if index == 0 {
                self.insert_root_placeholder(&text).await?
            } else {
                self.insert_placeholders_under(&text, index).await?
            };

            tracing::info!(
                "Inserted level {} into text {} with {} placeholders",
                index,
                text.id,
                placeholders
            );
            Ok::<_, StructureError>(text)
        }
        .await
        .inspect_err(|e| self.report_partial_failure(op, text_id, e))?;

        self.notifier.structure_changed(&text.id, op);
        Ok(text)
    }

    /// One root placeholder adopting every former root (now on level 1)
    async fn insert_root_placeholder(&self, text: &Text) -> Result<usize> {
        let former_roots: Vec<String> = self
            .store
            .find_by_level(&text.id, 1)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();
        if former_roots.is_empty() {
            return Ok(0);
        }

        let label = text
            .level_name(0)
            .map(str::to_string)
            .unwrap_or_else(|| self.config.placeholder_label.clone());
        let placeholder = NewLocation {
            text_id: text.id.clone(),
            parent_id: None,
            level: 0,
            position: 0,
            label,
        }
        .into_location();

        self.store.insert_many(vec![placeholder.clone()]).await?;
        self.store
            .set_parent(&former_roots, Some(&placeholder.id))
            .await?;
        Ok(1)
    }

    /// One placeholder per location at `index - 1`, adopting its children
    /// (now on `index + 1`)
    async fn insert_placeholders_under(&self, text: &Text, index: usize) -> Result<usize> {
        let parents = self.store.find_by_level(&text.id, index - 1).await?;

        let placeholders: Vec<Location> = parents
            .iter()
            .enumerate()
            .map(|(position, parent)| {
                NewLocation {
                    text_id: text.id.clone(),
                    parent_id: Some(parent.id.clone()),
                    level: index,
                    position,
                    label: self.placeholder_label(text, index, parent),
                }
                .into_location()
            })
            .collect();

        let placeholder_for: HashMap<&str, &str> = parents
            .iter()
            .zip(&placeholders)
            .map(|(parent, placeholder)| (parent.id.as_str(), placeholder.id.as_str()))
            .collect();

        let adopted: Vec<Location> = self
            .store
            .find_by_level(&text.id, index + 1)
            .await?
            .into_iter()
            .filter_map(|mut child| {
                let placeholder = placeholder_for.get(child.parent_id.as_deref()?)?;
                child.parent_id = Some(placeholder.to_string());
                Some(child)
            })
            .collect();

        let created = self.store.insert_many(placeholders.clone()).await?;
        self.store.replace_many(adopted).await?;
        Ok(created)
    }

    fn placeholder_label(&self, text: &Text, index: usize, parent: &Location) -> String {
        if !parent.label.is_empty() {
            return parent.label.clone();
        }
        text.level_name(index)
            .map(str::to_string)
            .unwrap_or_else(|| self.config.placeholder_label.clone())
    }

    /// Delete level `level`, relinking its children to their grandparents
    ///
    /// Each relinked child's label is prefixed with the removed location's
    /// label so siblings from different removed parents stay distinguishable.
    pub async fn delete_level(&self, text_id: &str, level: usize) -> Result<Text> {
        let mut text = self.require_text(text_id).await?;
        check_level(&text, level)?;
        let old_depth = text.depth();
        let op = StructureOperation::DeleteLevel;

        let text = async {
            let doomed = self.store.find_by_level(&text.id, level).await?;
            let doomed_by_id: HashMap<&str, &Location> =
                doomed.iter().map(|l| (l.id.as_str(), l)).collect();

            let relinked: Vec<Location> = self
                .store
                .find_by_level(&text.id, level + 1)
                .await?
                .into_iter()
                .filter_map(|mut child| {
                    let removed_parent = doomed_by_id.get(child.parent_id.as_deref()?)?;
                    child.parent_id = removed_parent.parent_id.clone();
                    child.label = self.join_labels(&removed_parent.label, &child.label);
                    Some(child)
                })
                .collect();
            self.store.replace_many(relinked).await?;

            if self
                .notifier
                .resource_count_at_level(&text.id, level)
                .await?
                > 0
            {
                let ids: Vec<String> = doomed.iter().map(|l| l.id.clone()).collect();
                let contents = self.notifier.cascade_delete_contents(&ids).await?;
                tracing::debug!("Deleted {} contents on level {}", contents, level);
            }

            let removed = self.store.delete_level(&text.id, level).await?;
            self.store.shift_levels(&text.id, level + 1, -1).await?;
            self.notifier
                .shift_content_levels(&text.id, level + 1, old_depth, LevelShift::Shallower)
                .await?;

            text.remove_level_labels(level);
            let text = self.store.save_text(text).await?;

            tracing::info!(
                "Deleted level {} ({} locations) from text {}",
                level,
                removed,
                text.id
            );
            Ok::<_, StructureError>(text)
        }
        .await
        .inspect_err(|e| self.report_partial_failure(op, text_id, e))?;

        self.notifier.structure_changed(&text.id, op);
        Ok(text)
    }

    fn join_labels(&self, prefix: &str, label: &str) -> String {
        if prefix.is_empty() {
            label.to_string()
        } else {
            format!("{}{}{}", prefix, self.config.label_separator, label)
        }
    }

    //
    // BULK IMPORT
    //

    /// Import a whole outline into a text that has no locations yet
    ///
    /// Nodes are stored depth-first with ids assigned up front, so every
    /// parent is inserted before its children. Positions on each level follow
    /// document order.
    pub async fn import_structure(
        &self,
        text_id: &str,
        roots: Vec<OutlineNode>,
    ) -> Result<Vec<Location>> {
        let text = self.require_text(text_id).await?;

        if self.store.count_at_level(&text.id, 0).await? > 0 {
            return Err(StructureError::conflict(format!(
                "text {} already has a structure",
                text.id
            )));
        }
        let outline_depth = roots.iter().map(OutlineNode::depth).max().unwrap_or(0);
        if outline_depth > text.depth() {
            return Err(StructureError::invalid_level(outline_depth - 1, text.depth()));
        }

        let mut next_position = vec![0; text.depth()];
        let mut locations = Vec::new();
        for root in &roots {
            flatten_outline(
                root,
                &text.id,
                None,
                0,
                &mut next_position,
                &mut locations,
            );
        }

        let inserted = self
            .store
            .insert_many(locations.clone())
            .await
            .map_err(StructureError::from)
            .inspect_err(|e| {
                self.report_partial_failure(StructureOperation::ImportStructure, &text.id, e)
            })?;

        tracing::info!("Imported {} locations into text {}", inserted, text.id);
        self.notifier
            .structure_changed(&text.id, StructureOperation::ImportStructure);
        Ok(locations)
    }

    //
    // READS
    //

    pub async fn get_location(&self, id: &str) -> Result<Option<Location>> {
        Ok(self.store.get_location(id).await?)
    }

    /// Children of a parent, or the roots of a text
    ///
    /// Exactly one of `text_id` (roots) and `parent_id` (children) must be
    /// given.
    pub async fn get_children(
        &self,
        text_id: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Vec<Location>> {
        match (text_id, parent_id) {
            (Some(text_id), None) => {
                let text = self.require_text(text_id).await?;
                Ok(self.store.find_by_parent(&text.id, 0, None).await?)
            }
            (None, Some(parent_id)) => {
                let parent = self.require_location(parent_id).await?;
                Ok(self
                    .store
                    .find_by_parent(&parent.text_id, parent.level + 1, Some(&parent.id))
                    .await?)
            }
            _ => Err(StructureError::invalid_request(
                "exactly one of text_id and parent_id is required",
            )),
        }
    }

    /// All locations on one level of a text, in position order
    pub async fn get_level(&self, text_id: &str, level: usize) -> Result<Vec<Location>> {
        let text = self.require_text(text_id).await?;
        check_level(&text, level)?;
        Ok(self.store.find_by_level(&text.id, level).await?)
    }

    /// Path from the root down to `location_id`, inclusive
    pub async fn get_path(&self, location_id: &str) -> Result<Vec<Location>> {
        let mut current = self.require_location(location_id).await?;
        let mut path = Vec::with_capacity(current.level + 1);

        while let Some(parent_id) = current.parent_id.clone() {
            let parent = self.store.get_location(&parent_id).await?.ok_or_else(|| {
                StructureError::inconsistent(
                    &current.text_id,
                    format!("location {} has dangling parent {}", current.id, parent_id),
                )
            })?;
            if parent.level >= current.level {
                return Err(StructureError::inconsistent(
                    &current.text_id,
                    format!(
                        "parent {} of {} is not above it",
                        parent.id, current.id
                    ),
                ));
            }
            path.push(std::mem::replace(&mut current, parent));
        }
        path.push(current);
        path.reverse();
        Ok(path)
    }

    /// Check every structural invariant of a text without modifying it
    pub async fn audit_structure(&self, text_id: &str) -> Result<StructureReport> {
        let text = self.require_text(text_id).await?;
        let locations = self.store.find_by_text(&text.id).await?;
        let report = audit_locations(&text, &locations);

        if !report.is_consistent() {
            tracing::warn!(
                "Text {} has {} structural violations",
                text.id,
                report.violations.len()
            );
        }
        Ok(report)
    }

    //
    // HELPERS
    //

    async fn require_text(&self, text_id: &str) -> Result<Text> {
        self.store
            .get_text(text_id)
            .await?
            .ok_or_else(|| StructureError::text_not_found(text_id))
    }

    async fn require_location(&self, id: &str) -> Result<Location> {
        self.store
            .get_location(id)
            .await?
            .ok_or_else(|| StructureError::location_not_found(id))
    }

    fn report_partial_failure(
        &self,
        operation: StructureOperation,
        text_id: &str,
        error: &StructureError,
    ) {
        tracing::error!(
            "{} on text {} failed after writes may have been applied; audit the text before further edits: {}",
            operation,
            text_id,
            error
        );
    }
}

fn check_level(text: &Text, level: usize) -> Result<()> {
    if text.has_level(level) {
        Ok(())
    } else {
        Err(StructureError::invalid_level(level, text.depth()))
    }
}

/// `parent` must belong to `text_id` and sit exactly one level above `level`
fn check_parent(parent: &Location, text_id: &str, level: usize) -> Result<()> {
    if parent.text_id != text_id {
        return Err(StructureError::invalid_parent(
            Some(&parent.id),
            format!("parent belongs to text {}", parent.text_id),
        ));
    }
    if parent.level + 1 != level {
        return Err(StructureError::invalid_parent(
            Some(&parent.id),
            format!(
                "parent is on level {}, expected level {}",
                parent.level,
                level.saturating_sub(1)
            ),
        ));
    }
    Ok(())
}

/// Depth-first flattening; parents are pushed before their children
fn flatten_outline(
    node: &OutlineNode,
    text_id: &str,
    parent_id: Option<String>,
    level: usize,
    next_position: &mut [usize],
    out: &mut Vec<Location>,
) {
    let location = NewLocation {
        text_id: text_id.to_string(),
        parent_id,
        level,
        position: next_position[level],
        label: node.label.clone(),
    }
    .into_location();
    next_position[level] += 1;

    let id = location.id.clone();
    out.push(location);
    for child in &node.children {
        flatten_outline(child, text_id, Some(id.clone()), level + 1, next_position, out);
    }
}

#[cfg(test)]
#[path = "structure_service_test.rs"]
mod structure_service_test;
