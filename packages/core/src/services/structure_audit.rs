//! Structure Audit
//!
//! Read-only consistency check of a text's location forest. Structural
//! mutations are not transactional, so a store failure in the middle of a
//! cascade can leave one level renumbered and the next one not. The audit
//! reports exactly which invariant broke where, so operators can repair the
//! text before further edits compound the damage.

use crate::models::{Location, Text};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One broken invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureViolation {
    /// Positions on a level are not exactly `0..n`
    NonContiguousPositions { level: usize, positions: Vec<usize> },
    /// Location level outside the text's levels
    LevelOutOfRange {
        location_id: String,
        level: usize,
        depth: usize,
    },
    /// Level-0 location with a parent
    RootWithParent { location_id: String },
    /// Non-root location without a parent
    MissingParent { location_id: String, level: usize },
    /// Parent id that does not resolve within the text
    DanglingParent {
        location_id: String,
        parent_id: String,
    },
    /// Parent not exactly one level up
    ParentLevelMismatch {
        location_id: String,
        level: usize,
        parent_level: usize,
    },
    /// Children of a later parent placed before children of an earlier one
    OutOfDocumentOrder { level: usize, location_id: String },
}

/// Result of auditing one text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureReport {
    pub text_id: String,
    pub location_count: usize,
    pub violations: Vec<StructureViolation>,
}

impl StructureReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every structural invariant of `text` against its `locations`.
pub fn audit_locations(text: &Text, locations: &[Location]) -> StructureReport {
    let mut violations = Vec::new();
    let by_id: HashMap<&str, &Location> = locations.iter().map(|l| (l.id.as_str(), l)).collect();

    let mut levels: BTreeMap<usize, Vec<&Location>> = BTreeMap::new();
    for location in locations {
        levels.entry(location.level).or_default().push(location);
    }

    for (&level, members) in levels.iter_mut() {
        members.sort_by_key(|l| l.position);

        let positions: Vec<usize> = members.iter().map(|l| l.position).collect();
        if positions.iter().enumerate().any(|(i, &p)| i != p) {
            violations.push(StructureViolation::NonContiguousPositions { level, positions });
        }

        let mut last_parent_position = None;
        for location in members.iter() {
            if level >= text.depth() {
                violations.push(StructureViolation::LevelOutOfRange {
                    location_id: location.id.clone(),
                    level,
                    depth: text.depth(),
                });
            }

            match (&location.parent_id, level) {
                (Some(_), 0) => violations.push(StructureViolation::RootWithParent {
                    location_id: location.id.clone(),
                }),
                (None, 0) => {}
                (None, _) => violations.push(StructureViolation::MissingParent {
                    location_id: location.id.clone(),
                    level,
                }),
                (Some(parent_id), _) => match by_id.get(parent_id.as_str()) {
                    None => violations.push(StructureViolation::DanglingParent {
                        location_id: location.id.clone(),
                        parent_id: parent_id.clone(),
                    }),
                    Some(parent) if parent.level + 1 != level => {
                        violations.push(StructureViolation::ParentLevelMismatch {
                            location_id: location.id.clone(),
                            level,
                            parent_level: parent.level,
                        })
                    }
                    Some(parent) => {
                        if last_parent_position.is_some_and(|last| parent.position < last) {
                            violations.push(StructureViolation::OutOfDocumentOrder {
                                level,
                                location_id: location.id.clone(),
                            });
                        }
                        last_parent_position = Some(parent.position);
                    }
                },
            }
        }
    }

    StructureReport {
        text_id: text.id.clone(),
        location_count: locations.len(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::level_labels;

    fn loc(id: &str, parent: Option<&str>, level: usize, position: usize) -> Location {
        Location {
            id: id.to_string(),
            text_id: "t".to_string(),
            parent_id: parent.map(str::to_string),
            level,
            position,
            label: id.to_string(),
        }
    }

    fn two_level_text() -> Text {
        let mut text = Text::new(
            "Psalms",
            vec![level_labels("en", "Psalm"), level_labels("en", "Verse")],
            0,
        );
        text.id = "t".to_string();
        text
    }

    #[test]
    fn test_well_formed_forest_is_consistent() {
        let locations = vec![
            loc("a", None, 0, 0),
            loc("b", None, 0, 1),
            loc("a1", Some("a"), 1, 0),
            loc("b1", Some("b"), 1, 1),
            loc("b2", Some("b"), 1, 2),
        ];

        let report = audit_locations(&two_level_text(), &locations);
        assert!(report.is_consistent(), "{:?}", report.violations);
        assert_eq!(report.location_count, 5);
    }

    #[test]
    fn test_detects_gap_and_duplicate_positions() {
        let locations = vec![loc("a", None, 0, 0), loc("b", None, 0, 2)];
        let report = audit_locations(&two_level_text(), &locations);
        assert_eq!(
            report.violations,
            vec![StructureViolation::NonContiguousPositions {
                level: 0,
                positions: vec![0, 2]
            }]
        );

        let locations = vec![loc("a", None, 0, 0), loc("b", None, 0, 0)];
        assert!(!audit_locations(&two_level_text(), &locations).is_consistent());
    }

    #[test]
    fn test_detects_parent_violations() {
        let locations = vec![
            loc("a", Some("x"), 0, 0),
            loc("b", None, 1, 0),
            loc("c", Some("ghost"), 1, 1),
        ];
        let report = audit_locations(&two_level_text(), &locations);

        assert!(report
            .violations
            .contains(&StructureViolation::RootWithParent {
                location_id: "a".to_string()
            }));
        assert!(report.violations.contains(&StructureViolation::MissingParent {
            location_id: "b".to_string(),
            level: 1
        }));
        assert!(report
            .violations
            .contains(&StructureViolation::DanglingParent {
                location_id: "c".to_string(),
                parent_id: "ghost".to_string()
            }));
    }

    #[test]
    fn test_detects_out_of_order_children() {
        let locations = vec![
            loc("a", None, 0, 0),
            loc("b", None, 0, 1),
            loc("b1", Some("b"), 1, 0),
            loc("a1", Some("a"), 1, 1),
        ];
        let report = audit_locations(&two_level_text(), &locations);

        assert_eq!(
            report.violations,
            vec![StructureViolation::OutOfDocumentOrder {
                level: 1,
                location_id: "a1".to_string()
            }]
        );
    }

    #[test]
    fn test_detects_level_out_of_range() {
        let locations = vec![
            loc("a", None, 0, 0),
            loc("a1", Some("a"), 1, 0),
            loc("a11", Some("a1"), 2, 0),
        ];
        let report = audit_locations(&two_level_text(), &locations);

        assert_eq!(
            report.violations,
            vec![StructureViolation::LevelOutOfRange {
                location_id: "a11".to_string(),
                level: 2,
                depth: 2
            }]
        );
    }
}
