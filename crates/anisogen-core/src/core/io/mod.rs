//! CSV artifacts exchanged with the outside world.
//!
//! Every file is written through [`publish::publish_csv`], which writes to a
//! temporary file in the destination directory and renames it into place.

pub mod artifacts;
pub mod publish;

pub use artifacts::CsvArtifactError;
