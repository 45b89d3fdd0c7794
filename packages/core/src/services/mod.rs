//! Business Services
//!
//! This module contains the structural logic layered over the location store:
//!
//! - `StructureService` - Structural mutations and reads over a text's forest
//! - `PositionAllocator` - Slot computation and bulk renumbering on one level
//! - `CascadeNotifier` - Content cascades and structure-changed signals
//! - `audit_locations` - Read-only invariant check of a text's locations
//!
//! Services coordinate between the store layer and content collaborators,
//! validating every request before the first write.

pub mod cascade_notifier;
pub mod error;
pub mod position_allocator;
pub mod structure_audit;
pub mod structure_service;

pub use cascade_notifier::{CascadeNotifier, LevelShift};
pub use error::StructureError;
pub use position_allocator::PositionAllocator;
pub use structure_audit::{audit_locations, StructureReport, StructureViolation};
pub use structure_service::StructureService;
