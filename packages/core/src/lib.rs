//! Strata Core - Hierarchical Text-Structure Engine
//!
//! This crate maintains, per text, a forest of locations (chapter →
//! paragraph → sentence) with strict ordering, and implements the structural
//! edits that keep that forest consistent.
//!
//! # Architecture
//!
//! - **Position-ordered levels**: every location has a zero-based position
//!   that is contiguous across its whole `(text, level)`, not just among its
//!   siblings
//! - **Dumb store, smart service**: `LocationStore` only executes bulk reads
//!   and writes; `StructureService` owns every invariant
//! - **No transactions required**: mutations are ordered sequences of bulk
//!   updates (shift-then-insert, delete-then-close-gap); `audit_structure`
//!   detects a cascade that stopped part-way
//!
//! # Modules
//!
//! - [`models`] - Text and Location data structures
//! - [`db`] - Location repository trait, memory backend, structure events
//! - [`services`] - Position allocator, structural mutations, cascades, audit
//! - [`content`] - Content-store collaborator interface and registry
//! - [`config`] - Engine configuration

pub mod config;
pub mod content;
pub mod db;
pub mod models;
pub mod services;

pub use config::EngineConfig;
pub use models::*;
pub use services::*;

/// Install a `tracing` subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"strata_core=info"`). Safe to call repeatedly;
/// later calls are no-ops.
pub fn init_tracing(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_repeatable() {
        init_tracing("strata_core=debug");
        // A second subscriber cannot be installed; the call must not panic
        init_tracing("strata_core=info");
        tracing::info!("tracing initialized");
    }
}
