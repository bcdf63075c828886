//! # Chemistry
//!
//! A small molecular-graph toolkit covering what the ligand search needs:
//! reading SMILES ([`smiles`]), validating structures against a valence model
//! and re-perceiving aromaticity ([`sanitize`]), writing canonical SMILES
//! ([`canon`]) and estimating Gasteiger partial charges ([`charges`]).
//!
//! Hydrogens are stored as atom properties rather than graph atoms. Every
//! structure that leaves this module as a string has gone through
//! [`sanitize::sanitize`] and [`canon::to_smiles`], so equal strings mean
//! equal molecules.

pub mod canon;
pub mod charges;
pub mod element;
pub mod molecule;
pub mod sanitize;
pub mod smiles;

use thiserror::Error;

pub use element::Element;
pub use molecule::{Atom, Bond, BondOrder, Chirality, Molecule};
pub use sanitize::{Hybridization, Sanitized};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChemError {
    #[error(transparent)]
    Smiles(#[from] smiles::SmilesError),
    #[error(transparent)]
    Sanitize(#[from] sanitize::SanitizeError),
}

/// Parses and sanitises a SMILES string.
pub fn read_smiles(input: &str) -> Result<Sanitized, ChemError> {
    let molecule = smiles::parse(input)?;
    Ok(sanitize::sanitize(molecule)?)
}

/// Returns the canonical form of a SMILES string.
pub fn canonicalize(input: &str) -> Result<String, ChemError> {
    read_smiles(input).map(|sanitized| canon::to_smiles(&sanitized))
}

/// Sanitises an edited molecule and returns its canonical SMILES, or `None`
/// if the edit produced an invalid structure.
pub fn finalize_edit(molecule: Molecule) -> Option<String> {
    sanitize::sanitize(molecule)
        .ok()
        .map(|sanitized| canon::to_smiles(&sanitized))
}
