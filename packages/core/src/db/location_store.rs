//! LocationStore Trait - Location Repository
//!
//! Persistence abstraction for texts and locations. The trait is the seam
//! between the structural algorithms in `StructureService` and whatever
//! document store holds the data.
//!
//! # Contract
//!
//! - No business rules: the store neither enforces nor repairs the structural
//!   invariants, it executes exactly the reads and bulk writes it is asked for
//! - Every listing of locations is sorted by `position` (then `id`), or by
//!   `(level, position)` for whole-text listings
//! - Each call is atomic on its own; there are no multi-call transactions
//! - Shifts validate every affected record before touching any of them, so a
//!   single call either applies fully or not at all

use crate::db::error::StoreResult;
use crate::models::{Location, NewLocation, Text};
use async_trait::async_trait;
use std::ops::RangeInclusive;

/// Which positions on a level a bulk position shift applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionFilter {
    /// `position >= n`
    AtOrAfter(usize),
    /// `position > n`
    After(usize),
}

impl PositionFilter {
    pub fn matches(&self, position: usize) -> bool {
        match *self {
            PositionFilter::AtOrAfter(n) => position >= n,
            PositionFilter::After(n) => position > n,
        }
    }
}

/// Persistence operations over texts and locations
///
/// Implementations must be `Send + Sync`; every method is an await point and
/// no implementation may hold a lock across calls.
#[async_trait]
pub trait LocationStore: Send + Sync {
    //
    // TEXTS
    //

    async fn get_text(&self, id: &str) -> StoreResult<Option<Text>>;

    /// Insert or replace a text
    async fn save_text(&self, text: Text) -> StoreResult<Text>;

    /// Remove a text record. Returns whether it existed.
    async fn delete_text(&self, id: &str) -> StoreResult<bool>;

    //
    // LOCATION READS
    //

    async fn get_location(&self, id: &str) -> StoreResult<Option<Location>>;

    /// Locations on `(text_id, level)` whose parent is `parent_id`
    /// (`None` selects roots)
    async fn find_by_parent(
        &self,
        text_id: &str,
        level: usize,
        parent_id: Option<&str>,
    ) -> StoreResult<Vec<Location>>;

    /// All locations on `(text_id, level)`
    async fn find_by_level(&self, text_id: &str, level: usize) -> StoreResult<Vec<Location>>;

    /// Children of any of `parent_ids`
    async fn find_children_of(&self, parent_ids: &[String]) -> StoreResult<Vec<Location>>;

    /// Locations on `(text_id, level)` with a position inside `range`
    async fn find_in_position_range(
        &self,
        text_id: &str,
        level: usize,
        range: RangeInclusive<usize>,
    ) -> StoreResult<Vec<Location>>;

    /// Every location of a text, ordered by `(level, position)`
    async fn find_by_text(&self, text_id: &str) -> StoreResult<Vec<Location>>;

    async fn count_at_level(&self, text_id: &str, level: usize) -> StoreResult<usize>;

    //
    // LOCATION WRITES
    //

    /// Insert one location, assigning its id
    async fn insert_location(&self, location: NewLocation) -> StoreResult<Location>;

    /// Insert pre-identified locations in the given order.
    ///
    /// Callers assign ids up front so that later entries can reference
    /// earlier ones as parents. Fails on a duplicate id without inserting
    /// anything.
    async fn insert_many(&self, locations: Vec<Location>) -> StoreResult<usize>;

    /// Replace existing records by id. Fails on a missing id without
    /// replacing anything.
    async fn replace_many(&self, locations: Vec<Location>) -> StoreResult<usize>;

    /// Delete by id set; unknown ids are ignored. Returns the number removed.
    async fn delete_many(&self, ids: &[String]) -> StoreResult<usize>;

    /// Delete every location on `(text_id, level)`
    async fn delete_level(&self, text_id: &str, level: usize) -> StoreResult<usize>;

    /// Delete every location of a text
    async fn delete_by_text(&self, text_id: &str) -> StoreResult<usize>;

    /// Add `delta` to the position of every location on `(text_id, level)`
    /// matched by `filter`
    async fn shift_positions(
        &self,
        text_id: &str,
        level: usize,
        filter: PositionFilter,
        delta: i64,
    ) -> StoreResult<usize>;

    /// Add `delta` to the position of each listed location
    async fn shift_positions_of(&self, ids: &[String], delta: i64) -> StoreResult<usize>;

    /// Add `delta` to the level of every location of a text with
    /// `level >= from_level`
    async fn shift_levels(&self, text_id: &str, from_level: usize, delta: i64)
        -> StoreResult<usize>;

    /// Point each listed location at `parent_id`
    async fn set_parent(&self, ids: &[String], parent_id: Option<&str>) -> StoreResult<usize>;
}

/// Apply a signed delta to an unsigned field, `None` on underflow or overflow
pub(crate) fn apply_delta(value: usize, delta: i64) -> Option<usize> {
    if delta >= 0 {
        value.checked_add(usize::try_from(delta).ok()?)
    } else {
        value.checked_sub(usize::try_from(delta.unsigned_abs()).ok()?)
    }
}
