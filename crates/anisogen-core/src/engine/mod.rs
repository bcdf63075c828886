//! # Engine Module
//!
//! The generational search engine: configuration, the per-generation stages,
//! and the state carried from one generation to the next.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Search parameters and their builder
//! - **State** ([`state`]) - Versioned elite snapshots and donor-pattern memory
//! - **Progress Monitoring** ([`progress`]) - Progress events for front ends
//! - **Artifact Sinks** ([`sink`]) - Best-effort mirroring of published files
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! The stages themselves (donor-mode indexing, mutation, assembly, evaluation
//! and selection) live in `tasks` and are sequenced by
//! [`crate::workflows::search`].

pub mod config;
pub mod error;
pub mod progress;
pub mod sink;
pub mod state;
pub(crate) mod tasks;
pub mod utils;
