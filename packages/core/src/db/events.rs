//! Structure Events
//!
//! Events broadcast after every successful structural mutation. The search
//! subsystem subscribes to mark a text's index out of date; other observers
//! (export caches, UI bridges) can listen the same way without coupling to
//! the mutation code.
//!
//! # Architecture
//!
//! Events travel over a tokio broadcast channel owned by the
//! `CascadeNotifier`. An event is only sent once every write of the mutation
//! has completed; a mutation that fails part-way emits nothing.

use serde::{Deserialize, Serialize};

/// The structural operation that changed a text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureOperation {
    CreateLocation,
    MoveLocation,
    RenameLocation,
    DeleteLocation,
    InsertLevel,
    DeleteLevel,
    ImportStructure,
    DeleteText,
}

impl StructureOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureOperation::CreateLocation => "create_location",
            StructureOperation::MoveLocation => "move_location",
            StructureOperation::RenameLocation => "rename_location",
            StructureOperation::DeleteLocation => "delete_location",
            StructureOperation::InsertLevel => "insert_level",
            StructureOperation::DeleteLevel => "delete_level",
            StructureOperation::ImportStructure => "import_structure",
            StructureOperation::DeleteText => "delete_text",
        }
    }
}

impl std::fmt::Display for StructureOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the structure engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StructureEvent {
    /// The location forest of a text changed shape or order
    #[serde(rename = "structure:changed", rename_all = "camelCase")]
    StructureChanged {
        text_id: String,
        operation: StructureOperation,
    },
}

impl StructureEvent {
    pub fn structure_changed(text_id: impl Into<String>, operation: StructureOperation) -> Self {
        StructureEvent::StructureChanged {
            text_id: text_id.into(),
            operation,
        }
    }

    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            StructureEvent::StructureChanged { .. } => "structure:changed",
        }
    }

    pub fn text_id(&self) -> &str {
        match self {
            StructureEvent::StructureChanged { text_id, .. } => text_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Subscribers outside the process consume the JSON form, so the shape is
    /// pinned here: internally tagged, flat, camelCase fields.
    #[test]
    fn test_structure_event_serialization_contract() {
        let event = StructureEvent::structure_changed("text-42", StructureOperation::InsertLevel);

        let parsed: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(parsed.get("type").unwrap(), "structure:changed");
        assert_eq!(parsed.get("textId").unwrap(), "text-42");
        assert_eq!(parsed.get("operation").unwrap(), "insert_level");
        assert!(parsed.get("StructureChanged").is_none());
    }

    #[test]
    fn test_structure_event_deserialization() {
        let json = r#"{"type":"structure:changed","textId":"t-1","operation":"move_location"}"#;
        let event: StructureEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.text_id(), "t-1");
        assert_eq!(event.event_type(), "structure:changed");
        assert_eq!(
            event,
            StructureEvent::structure_changed("t-1", StructureOperation::MoveLocation)
        );
    }
}
