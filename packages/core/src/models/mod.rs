//! Data Models
//!
//! This module contains the structural data types of the engine:
//!
//! - `Text` - owner of the level definitions of an outline
//! - `Location` - one node of a text's location forest
//! - Parameter and result types of the structural operations

mod location;
mod text;

pub use location::{
    CreateLocationParams, DeleteSummary, Location, MoveLocationParams, NewLocation, OutlineNode,
};
pub use text::{level_labels, LevelLabels, Text};
