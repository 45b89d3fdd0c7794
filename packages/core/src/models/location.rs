//! Location Data Structures
//!
//! A `Location` is one node of a text's hierarchical outline (chapter,
//! paragraph, sentence, ...). Locations form a forest per text:
//!
//! - `level` is the depth index into the owning text's `levels`
//! - `position` is the rank among ALL locations sharing `(text_id, level)`,
//!   not only among siblings of the same parent
//! - `parent_id` is `None` exactly at level 0
//!
//! Children of an earlier parent always precede children of a later parent,
//! so a level read in position order is the document order of that level.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One node of a per-text outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Store-assigned identifier (UUID v4)
    pub id: String,

    /// Owning text
    pub text_id: String,

    /// Parent location one level up; `None` only at level 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Depth index, `0 <= level < text.depth()`
    pub level: usize,

    /// Zero-based rank within `(text_id, level)`
    pub position: usize,

    /// Display string
    pub label: String,
}

impl Location {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A location that has not been persisted yet.
///
/// The store assigns the id when the record is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub text_id: String,
    pub parent_id: Option<String>,
    pub level: usize,
    pub position: usize,
    pub label: String,
}

impl NewLocation {
    /// Assign a fresh id, producing the stored record.
    pub fn into_location(self) -> Location {
        self.into_location_with_id(Uuid::new_v4().to_string())
    }

    pub fn into_location_with_id(self, id: String) -> Location {
        Location {
            id,
            text_id: self.text_id,
            parent_id: self.parent_id,
            level: self.level,
            position: self.position,
            label: self.label,
        }
    }
}

/// Parameters for `StructureService::create_location`
///
/// # Examples
///
/// ```
/// # use strata_core::models::CreateLocationParams;
/// let params = CreateLocationParams::new("text-1", 1, "Paragraph 3")
///     .with_parent("chapter-1");
/// assert_eq!(params.parent_id.as_deref(), Some("chapter-1"));
/// assert!(params.position.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CreateLocationParams {
    pub text_id: String,
    /// Required for every level except 0
    pub parent_id: Option<String>,
    pub level: usize,
    pub label: String,
    /// Explicit position; must fall inside the parent's child span.
    /// `None` appends after the parent's last child.
    pub position: Option<usize>,
}

impl CreateLocationParams {
    pub fn new(text_id: impl Into<String>, level: usize, label: impl Into<String>) -> Self {
        Self {
            text_id: text_id.into(),
            parent_id: None,
            level,
            label: label.into(),
            position: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

/// Parameters for `StructureService::move_location`
#[derive(Debug, Clone)]
pub struct MoveLocationParams {
    pub id: String,
    /// Position of the reference slot on the location's level
    pub new_position: usize,
    /// Place the location after (rather than before) `new_position`
    pub insert_after: bool,
    /// New parent; `None` keeps the current parent
    pub new_parent_id: Option<String>,
}

/// Result of a cascading subtree delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub locations_deleted: usize,
    pub contents_deleted: usize,
}

/// A node of an outline definition used for bulk import.
///
/// Imported depth-first: a node's children land one level below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub label: String,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(label: impl Into<String>, children: Vec<OutlineNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    /// Depth of this subtree (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::depth).max().unwrap_or(0)
    }

    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_location_gets_unique_ids() {
        let draft = NewLocation {
            text_id: "t".to_string(),
            parent_id: None,
            level: 0,
            position: 0,
            label: "Chapter 1".to_string(),
        };

        let a = draft.clone().into_location();
        let b = draft.into_location();

        assert_ne!(a.id, b.id);
        assert!(a.is_root());
        assert_eq!(a.label, "Chapter 1");
    }

    #[test]
    fn test_location_serializes_camel_case_without_null_parent() {
        let location = Location {
            id: "loc-1".to_string(),
            text_id: "text-1".to_string(),
            parent_id: None,
            level: 0,
            position: 3,
            label: "Book I".to_string(),
        };

        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["textId"], "text-1");
        assert_eq!(json["position"], 3);
        assert!(json.get("parentId").is_none());
    }

    #[test]
    fn test_outline_depth_and_size() {
        let outline = OutlineNode::branch(
            "1",
            vec![
                OutlineNode::branch("1.1", vec![OutlineNode::leaf("1.1.1")]),
                OutlineNode::leaf("1.2"),
            ],
        );

        assert_eq!(outline.depth(), 3);
        assert_eq!(outline.size(), 4);
    }
}
