//! Position Allocator
//!
//! Computes insertion slots on a level and performs the bulk renumbering
//! around them. Positions are contiguous per `(text_id, level)` across every
//! parent, and children of an earlier parent precede children of a later
//! one, so the slot for a new child depends on the parent's neighbours too.

use crate::db::{LocationStore, PositionFilter, StoreResult};
use crate::models::Location;
use crate::services::error::StructureError;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

pub struct PositionAllocator {
    store: Arc<dyn LocationStore>,
}

impl PositionAllocator {
    pub fn new(store: Arc<dyn LocationStore>) -> Self {
        Self { store }
    }

    /// Position right after the last existing child of `parent` on `level`.
    ///
    /// A parent without children takes the slot after the last child of the
    /// nearest preceding location on the parent's level that has any; with
    /// none, the slot is 0. Roots append after the last root.
    pub async fn next_append_position(
        &self,
        text_id: &str,
        level: usize,
        parent: Option<&Location>,
    ) -> StoreResult<usize> {
        let siblings = self
            .store
            .find_by_parent(text_id, level, parent.map(|p| p.id.as_str()))
            .await?;
        if let Some(last) = siblings.last() {
            return Ok(last.position + 1);
        }

        let Some(parent) = parent else {
            return Ok(0);
        };

        let parent_level = self.store.find_by_level(text_id, parent.level).await?;
        for previous in parent_level
            .iter()
            .rev()
            .filter(|l| l.position < parent.position)
        {
            let children = self
                .store
                .find_by_parent(text_id, level, Some(&previous.id))
                .await?;
            if let Some(last) = children.last() {
                return Ok(last.position + 1);
            }
        }

        Ok(0)
    }

    /// Resolve the slot for a new location: the append slot, or an explicit
    /// position validated against the parent's child span.
    pub async fn resolve_position(
        &self,
        text_id: &str,
        level: usize,
        parent: Option<&Location>,
        explicit: Option<usize>,
    ) -> Result<usize, StructureError> {
        let append = self.next_append_position(text_id, level, parent).await?;
        let Some(position) = explicit else {
            return Ok(append);
        };

        let sibling_count = self
            .store
            .find_by_parent(text_id, level, parent.map(|p| p.id.as_str()))
            .await?
            .len();
        let first = append - sibling_count;

        if position < first || position > append {
            return Err(StructureError::invalid_position(
                position,
                format!("must lie between {} and {} for this parent", first, append),
            ));
        }
        Ok(position)
    }

    /// Slots `moving` may end up on as a child of `parent`, counted on its
    /// level with `moving` itself taken out: the parent's child block plus
    /// the slot right after it.
    pub async fn child_span_without(
        &self,
        parent: &Location,
        moving: &Location,
    ) -> StoreResult<RangeInclusive<usize>> {
        let parent_positions: HashMap<String, usize> = self
            .store
            .find_by_level(&parent.text_id, parent.level)
            .await?
            .into_iter()
            .map(|p| (p.id, p.position))
            .collect();

        let mut first = 0;
        let mut count = 0;
        for location in self
            .store
            .find_by_level(&moving.text_id, moving.level)
            .await?
            .iter()
            .filter(|l| l.id != moving.id)
        {
            let parent_position = location
                .parent_id
                .as_ref()
                .and_then(|id| parent_positions.get(id));
            if location.parent_id.as_deref() == Some(parent.id.as_str()) {
                count += 1;
            } else if parent_position.is_some_and(|&p| p < parent.position) {
                first += 1;
            }
        }

        Ok(first..=first + count)
    }

    /// Shift every location at or after `from_position` one slot down.
    /// Runs before the insert it makes room for.
    pub async fn make_room(
        &self,
        text_id: &str,
        level: usize,
        from_position: usize,
    ) -> StoreResult<usize> {
        self.store
            .shift_positions(text_id, level, PositionFilter::AtOrAfter(from_position), 1)
            .await
    }

    /// Close the gap left by `count` removed locations ending at
    /// `from_position`. Runs after the removal.
    pub async fn close_gap(
        &self,
        text_id: &str,
        level: usize,
        from_position: usize,
        count: usize,
    ) -> StoreResult<usize> {
        if count == 0 {
            return Ok(0);
        }
        self.store
            .shift_positions(
                text_id,
                level,
                PositionFilter::After(from_position),
                -(count as i64),
            )
            .await
    }
}
