//! Text Data Structures
//!
//! A `Text` owns the level definitions of its outline. `levels[i]` holds the
//! human-readable names of depth `i` (e.g. `{"en": "Chapter", "de": "Kapitel"}`)
//! and `levels.len()` is the depth every location must respect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Display names of one level, keyed by locale
pub type LevelLabels = BTreeMap<String, String>;

/// Build a single-locale label set.
///
/// ```
/// # use strata_core::models::level_labels;
/// let labels = level_labels("en", "Chapter");
/// assert_eq!(labels.get("en").map(String::as_str), Some("Chapter"));
/// ```
pub fn level_labels(locale: &str, name: &str) -> LevelLabels {
    let mut labels = LevelLabels::new();
    labels.insert(locale.to_string(), name.to_string());
    labels
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    pub id: String,

    pub title: String,

    /// One label set per depth; the length is the outline depth
    pub levels: Vec<LevelLabels>,

    /// Level shown by default when browsing the text
    pub default_level: usize,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl Text {
    /// Create a new text with a generated id.
    pub fn new(title: impl Into<String>, levels: Vec<LevelLabels>, default_level: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            levels,
            default_level,
            created_at: now,
            modified_at: now,
        }
    }

    /// Number of levels in the outline
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn has_level(&self, level: usize) -> bool {
        level < self.levels.len()
    }

    /// A single display name for `level`: English when present, else the
    /// first locale in key order.
    pub fn level_name(&self, level: usize) -> Option<&str> {
        let labels = self.levels.get(level)?;
        labels
            .get("en")
            .or_else(|| labels.values().next())
            .map(String::as_str)
    }

    /// Insert a level and shift `default_level` so it keeps pointing at the
    /// same label set.
    ///
    /// Callers validate `index <= depth()` first.
    pub(crate) fn insert_level_labels(&mut self, index: usize, labels: LevelLabels) {
        self.levels.insert(index, labels);
        if self.default_level >= index && self.levels.len() > 1 {
            self.default_level += 1;
        }
        self.touch();
    }

    /// Remove a level and choose a new `default_level`: one level up when the
    /// default itself was removed, else one level down, else 0.
    ///
    /// Callers validate `level < depth()` first.
    pub(crate) fn remove_level_labels(&mut self, level: usize) -> LevelLabels {
        let removed = self.levels.remove(level);

        if self.default_level == level {
            // "one level down" lands on the same index once the level is gone
            self.default_level = level.saturating_sub(1);
        } else if self.default_level > level {
            self.default_level -= 1;
        }
        if self.default_level >= self.levels.len() {
            self.default_level = self.levels.len().saturating_sub(1);
        }

        self.touch();
        removed
    }

    pub(crate) fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}
