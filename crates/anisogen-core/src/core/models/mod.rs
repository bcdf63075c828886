//! # Core Models Module
//!
//! Plain data types shared by every stage of the search.
//!
//! - [`ligand`] - Ligands keyed by canonical SMILES with their donor-mode sets,
//!   and the accumulating [`ligand::LigandLibrary`]
//! - [`pattern`] - Donor-count patterns (multisets summing to the coordination number)
//! - [`complex`] - Assembled complex candidates and their oracle scores
//! - [`elite`] - Elite records, the persisted form of retained candidates
//! - [`lineage`] - Mutation operators and provenance records
//! - [`ids`] - Stable ligand identifiers

pub mod complex;
pub mod elite;
pub mod ids;
pub mod ligand;
pub mod lineage;
pub mod pattern;
