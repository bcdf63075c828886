//! # Core Module
//!
//! Stateless building blocks shared by the search engine.
//!
//! - **Chemistry** ([`chem`]) - molecular graphs, SMILES reading and canonical writing,
//!   valence checks and partial charges
//! - **Data Models** ([`models`]) - ligands, donor-count patterns, complex candidates,
//!   elite records and mutation lineage
//! - **Corpus** ([`corpus`]) - the validated table of known complexes and direct-hit lookup
//! - **Oracle** ([`oracle`]) - featurization and batched inference with the pretrained
//!   ZFS and E/D graph models
//! - **File I/O** ([`io`]) - CSV artifacts published atomically

pub mod chem;
pub mod corpus;
pub mod io;
pub mod models;
pub mod oracle;
