//! # anisogen Core Library
//!
//! Searches for ligand combinations around a single metal center whose predicted
//! zero-field splitting (ZFS) reaches a target value.
//!
//! A run first looks the target up in a corpus of known complexes. Without a
//! direct hit it falls back to a genetic search: ligands are mutated, assembled
//! into complexes under donor-count constraints, scored by a pair of pretrained
//! graph neural networks and filtered on a hard E/D cutoff. The best survivors are
//! kept as elites and seed the next generation.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless chemistry, data models, corpus access,
//!   oracle inference and CSV artifacts.
//!
//! - **[`engine`]: The Logic Core.** Configuration, errors, progress reporting, the
//!   versioned elite snapshot and the individual generation stages (donor index,
//!   mutation, assembly, evaluation, selection).
//!
//! - **[`workflows`]: The Public API.** The generational driver that ties everything
//!   together behind a single [`workflows::search::run`] call.

pub mod core;
pub mod engine;
pub mod workflows;
