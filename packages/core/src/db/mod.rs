//! Database Layer
//!
//! This module holds everything that touches persisted structure data:
//!
//! - `LocationStore` - the repository trait the structural algorithms run on
//! - `MemoryStore` - in-process backend with JSON snapshot persistence
//! - Store error types
//! - Structure events broadcast after mutations
//!
//! # Architecture
//!
//! The store only runs bulk reads and bulk writes keyed by
//! `(text_id, level, position)` and by `parent_id`, with no structural rules.
//! All invariants live in the service layer. Backends are not required to
//! offer multi-document transactions.

mod error;
pub mod events;
mod location_store;
mod memory_store;

pub use error::{StoreError, StoreResult};
pub use events::{StructureEvent, StructureOperation};
pub use location_store::{LocationStore, PositionFilter};
pub use memory_store::MemoryStore;
