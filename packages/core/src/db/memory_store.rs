//! MemoryStore - in-process LocationStore backend
//!
//! Keeps texts and locations in memory behind a `tokio::sync::RwLock`. The
//! lock is taken for the duration of a single call only, so concurrent
//! requests interleave between calls exactly as they would against an
//! external document store.
//!
//! # Persistence
//!
//! A store opened with [`MemoryStore::open`] writes a JSON snapshot of its
//! full state after every successful write call and reloads it on the next
//! open. The snapshot is written to a sibling temp file and renamed into
//! place, so a crash never leaves a half-written snapshot behind.

use crate::config::EngineConfig;
use crate::db::error::{StoreError, StoreResult};
use crate::db::location_store::{apply_delta, LocationStore, PositionFilter};
use crate::models::{Location, NewLocation, Text};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreState {
    texts: BTreeMap<String, Text>,
    locations: BTreeMap<String, Location>,
}

impl StoreState {
    fn locations_where<F>(&self, predicate: F) -> Vec<Location>
    where
        F: Fn(&Location) -> bool,
    {
        let mut found: Vec<Location> = self
            .locations
            .values()
            .filter(|l| predicate(*l))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
        found
    }

    /// Validate a shift against every target before applying any of it
    fn shift<F>(&mut self, select: F, field: ShiftField, delta: i64) -> StoreResult<usize>
    where
        F: Fn(&Location) -> bool,
    {
        let mut updates = Vec::new();
        for location in self.locations.values().filter(|l| select(*l)) {
            let value = field.read(location);
            let shifted = apply_delta(value, delta).ok_or_else(|| StoreError::ShiftUnderflow {
                id: location.id.clone(),
                field: field.name(),
                value,
                delta,
            })?;
            updates.push((location.id.clone(), shifted));
        }

        for (id, shifted) in &updates {
            if let Some(location) = self.locations.get_mut(id) {
                field.write(location, *shifted);
            }
        }
        Ok(updates.len())
    }
}

#[derive(Debug, Clone, Copy)]
enum ShiftField {
    Level,
    Position,
}

impl ShiftField {
    fn name(self) -> &'static str {
        match self {
            ShiftField::Level => "level",
            ShiftField::Position => "position",
        }
    }

    fn read(self, location: &Location) -> usize {
        match self {
            ShiftField::Level => location.level,
            ShiftField::Position => location.position,
        }
    }

    fn write(self, location: &mut Location, value: usize) {
        match self {
            ShiftField::Level => location.level = value,
            ShiftField::Position => location.position = value,
        }
    }
}

/// In-memory LocationStore with optional JSON snapshot persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty, purely in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a snapshot-backed store, loading existing state from `path` when
    /// the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(StoreError::snapshot(&path, e)),
        };

        tracing::info!(
            "Opened location store snapshot at {} ({} texts, {} locations)",
            path.display(),
            state.texts.len(),
            state.locations.len()
        );

        Ok(Self {
            state: RwLock::new(state),
            snapshot_path: Some(path),
        })
    }

    /// Build the store described by `config`: snapshot-backed when a
    /// snapshot path is configured, in-memory otherwise.
    pub async fn from_config(config: &EngineConfig) -> StoreResult<Self> {
        match &config.snapshot_path {
            Some(path) => Self::open(path.clone()).await,
            None => Ok(Self::new()),
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Total number of stored locations across all texts
    pub async fn location_count(&self) -> usize {
        self.state.read().await.locations.len()
    }

    async fn persist(&self, state: &StoreState) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec(state)?;
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| StoreError::snapshot(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| StoreError::snapshot(path, e))?;
        Ok(())
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn get_text(&self, id: &str) -> StoreResult<Option<Text>> {
        Ok(self.state.read().await.texts.get(id).cloned())
    }

    async fn save_text(&self, text: Text) -> StoreResult<Text> {
        let mut state = self.state.write().await;
        state.texts.insert(text.id.clone(), text.clone());
        self.persist(&state).await?;
        Ok(text)
    }

    async fn delete_text(&self, id: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let existed = state.texts.remove(id).is_some();
        if existed {
            self.persist(&state).await?;
        }
        Ok(existed)
    }

    async fn get_location(&self, id: &str) -> StoreResult<Option<Location>> {
        Ok(self.state.read().await.locations.get(id).cloned())
    }

    async fn find_by_parent(
        &self,
        text_id: &str,
        level: usize,
        parent_id: Option<&str>,
    ) -> StoreResult<Vec<Location>> {
        let state = self.state.read().await;
        Ok(state.locations_where(|l| {
            l.text_id == text_id && l.level == level && l.parent_id.as_deref() == parent_id
        }))
    }

    async fn find_by_level(&self, text_id: &str, level: usize) -> StoreResult<Vec<Location>> {
        let state = self.state.read().await;
        Ok(state.locations_where(|l| l.text_id == text_id && l.level == level))
    }

    async fn find_children_of(&self, parent_ids: &[String]) -> StoreResult<Vec<Location>> {
        if parent_ids.is_empty() {
            return Ok(Vec::new());
        }
        let parents: HashSet<&str> = parent_ids.iter().map(String::as_str).collect();
        let state = self.state.read().await;
        Ok(state.locations_where(|l| {
            l.parent_id
                .as_deref()
                .is_some_and(|parent| parents.contains(parent))
        }))
    }

    async fn find_in_position_range(
        &self,
        text_id: &str,
        level: usize,
        range: RangeInclusive<usize>,
    ) -> StoreResult<Vec<Location>> {
        let state = self.state.read().await;
        Ok(state.locations_where(|l| {
            l.text_id == text_id && l.level == level && range.contains(&l.position)
        }))
    }

    async fn find_by_text(&self, text_id: &str) -> StoreResult<Vec<Location>> {
        let state = self.state.read().await;
        let mut found = state.locations_where(|l| l.text_id == text_id);
        found.sort_by_key(|l| (l.level, l.position));
        Ok(found)
    }

    async fn count_at_level(&self, text_id: &str, level: usize) -> StoreResult<usize> {
        let state = self.state.read().await;
        Ok(state
            .locations
            .values()
            .filter(|l| l.text_id == text_id && l.level == level)
            .count())
    }

    async fn insert_location(&self, location: NewLocation) -> StoreResult<Location> {
        let location = location.into_location();
        let mut state = self.state.write().await;
        if state.locations.contains_key(&location.id) {
            return Err(StoreError::duplicate_id(&location.id));
        }
        state
            .locations
            .insert(location.id.clone(), location.clone());
        self.persist(&state).await?;
        Ok(location)
    }

    async fn insert_many(&self, locations: Vec<Location>) -> StoreResult<usize> {
        if locations.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.write().await;

        let mut seen = HashSet::new();
        for location in &locations {
            if state.locations.contains_key(&location.id) || !seen.insert(location.id.as_str()) {
                return Err(StoreError::duplicate_id(&location.id));
            }
        }

        let count = locations.len();
        for location in locations {
            state.locations.insert(location.id.clone(), location);
        }
        self.persist(&state).await?;
        Ok(count)
    }

    async fn replace_many(&self, locations: Vec<Location>) -> StoreResult<usize> {
        if locations.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.write().await;

        if let Some(missing) = locations
            .iter()
            .find(|l| !state.locations.contains_key(&l.id))
        {
            return Err(StoreError::missing_record(&missing.id));
        }

        let count = locations.len();
        for location in locations {
            state.locations.insert(location.id.clone(), location);
        }
        self.persist(&state).await?;
        Ok(count)
    }

    async fn delete_many(&self, ids: &[String]) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let removed = ids
            .iter()
            .filter(|id| state.locations.remove(id.as_str()).is_some())
            .count();
        if removed > 0 {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn delete_level(&self, text_id: &str, level: usize) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let before = state.locations.len();
        state
            .locations
            .retain(|_, l| !(l.text_id == text_id && l.level == level));
        let removed = before - state.locations.len();
        if removed > 0 {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn delete_by_text(&self, text_id: &str) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let before = state.locations.len();
        state.locations.retain(|_, l| l.text_id != text_id);
        let removed = before - state.locations.len();
        if removed > 0 {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn shift_positions(
        &self,
        text_id: &str,
        level: usize,
        filter: PositionFilter,
        delta: i64,
    ) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let shifted = state.shift(
            |l| l.text_id == text_id && l.level == level && filter.matches(l.position),
            ShiftField::Position,
            delta,
        )?;
        if shifted > 0 && delta != 0 {
            self.persist(&state).await?;
        }
        Ok(shifted)
    }

    async fn shift_positions_of(&self, ids: &[String], delta: i64) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut state = self.state.write().await;
        let shifted = state.shift(
            |l| targets.contains(l.id.as_str()),
            ShiftField::Position,
            delta,
        )?;
        if shifted > 0 && delta != 0 {
            self.persist(&state).await?;
        }
        Ok(shifted)
    }

    async fn shift_levels(
        &self,
        text_id: &str,
        from_level: usize,
        delta: i64,
    ) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        let shifted = state.shift(
            |l| l.text_id == text_id && l.level >= from_level,
            ShiftField::Level,
            delta,
        )?;
        if shifted > 0 && delta != 0 {
            self.persist(&state).await?;
        }
        Ok(shifted)
    }

    async fn set_parent(&self, ids: &[String], parent_id: Option<&str>) -> StoreResult<usize> {
        let mut state = self.state.write().await;
        if let Some(missing) = ids.iter().find(|id| !state.locations.contains_key(id.as_str())) {
            return Err(StoreError::missing_record(missing));
        }
        for id in ids {
            if let Some(location) = state.locations.get_mut(id) {
                location.parent_id = parent_id.map(str::to_string);
            }
        }
        if !ids.is_empty() {
            self.persist(&state).await?;
        }
        Ok(ids.len())
    }
}
