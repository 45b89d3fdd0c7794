//! Engine configuration
//!
//! `EngineConfig` is built once at process start (defaults, optionally a JSON
//! file, then environment overrides) and passed by value into
//! `StructureService::new`. Nothing reads configuration from global state.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Broadcast channel capacity for structure events.
///
/// Covers bursts such as a bulk import followed by level edits; lagging
/// subscribers only lose stale "changed" signals.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Joins a deleted location's label onto its relinked children
pub const DEFAULT_LABEL_SEPARATOR: &str = ".";

/// Label for a root placeholder when the new level has no name
pub const DEFAULT_PLACEHOLDER_LABEL: &str = "1";

const MAX_EVENT_CHANNEL_CAPACITY: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Capacity of the structure-changed broadcast channel
    pub event_channel_capacity: usize,

    /// Separator used when `delete_level` prefixes a removed location's label
    /// onto its children
    pub label_separator: String,

    /// Fallback label for placeholders created by `insert_level`
    pub placeholder_label: String,

    /// When set, the memory store persists a JSON snapshot here
    pub snapshot_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            label_separator: DEFAULT_LABEL_SEPARATOR.to_string(),
            placeholder_label: DEFAULT_PLACEHOLDER_LABEL.to_string(),
            snapshot_path: None,
        }
    }
}

impl EngineConfig {
    /// Load a config file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing engine config {}", path.display()))?;
        Ok(config)
    }

    /// Apply `STRATA_*` environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Recognised keys: `STRATA_EVENT_CAPACITY`, `STRATA_LABEL_SEPARATOR`,
    /// `STRATA_PLACEHOLDER_LABEL`, `STRATA_SNAPSHOT_PATH`. Unparseable values
    /// are logged and ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("STRATA_EVENT_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(capacity) => self.event_channel_capacity = capacity,
                Err(e) => tracing::warn!("Ignoring STRATA_EVENT_CAPACITY={:?}: {}", raw, e),
            }
        }
        if let Some(separator) = lookup("STRATA_LABEL_SEPARATOR") {
            self.label_separator = separator;
        }
        if let Some(label) = lookup("STRATA_PLACEHOLDER_LABEL") {
            self.placeholder_label = label;
        }
        if let Some(path) = lookup("STRATA_SNAPSHOT_PATH") {
            self.snapshot_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        if self.event_channel_capacity > MAX_EVENT_CHANNEL_CAPACITY {
            return Err(format!(
                "event_channel_capacity cannot exceed {}",
                MAX_EVENT_CHANNEL_CAPACITY
            ));
        }

        if self.placeholder_label.trim().is_empty() {
            return Err("placeholder_label cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = EngineConfig {
            event_channel_capacity: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let huge = EngineConfig {
            event_channel_capacity: MAX_EVENT_CHANNEL_CAPACITY + 1,
            ..Default::default()
        };
        assert!(huge.validate().is_err());

        let blank = EngineConfig {
            placeholder_label: "  ".to_string(),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_and_ignore_garbage() {
        let env: HashMap<&str, &str> = [
            ("STRATA_EVENT_CAPACITY", "not-a-number"),
            ("STRATA_LABEL_SEPARATOR", " / "),
            ("STRATA_SNAPSHOT_PATH", "/var/lib/strata/structure.json"),
        ]
        .into_iter()
        .collect();

        let config =
            EngineConfig::default().with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.event_channel_capacity, DEFAULT_EVENT_CHANNEL_CAPACITY);
        assert_eq!(config.label_separator, " / ");
        assert_eq!(
            config.snapshot_path,
            Some(PathBuf::from("/var/lib/strata/structure.json"))
        );
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("strata.json");
        std::fs::write(&path, r#"{"eventChannelCapacity": 16}"#).unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.event_channel_capacity, 16);
        assert_eq!(config.label_separator, DEFAULT_LABEL_SEPARATOR);
    }

    #[test]
    fn test_from_json_file_reports_path() {
        let err = EngineConfig::from_json_file("/nonexistent/strata.json").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/strata.json"));
    }
}
