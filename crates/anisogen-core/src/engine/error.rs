use thiserror::Error;

use super::config::ConfigError;
use super::utils::sampling::SamplingError;
use crate::core::corpus::CorpusError;
use crate::core::io::CsvArtifactError;
use crate::core::oracle::OracleError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Corpus error: {source}")]
    Corpus {
        #[from]
        source: CorpusError,
    },

    #[error("Oracle evaluation failed: {source}")]
    Oracle {
        #[from]
        source: OracleError,
    },

    #[error("Artifact error: {source}")]
    Artifact {
        #[from]
        source: CsvArtifactError,
    },

    #[error("Pattern sampling failed: {source}")]
    Sampling {
        #[from]
        source: SamplingError,
    },

    #[error("The ligand pool is empty; nothing to mutate or assemble")]
    EmptyLigandPool,

    #[error(
        "Assembled only {assembled} of {requested} candidates after {attempts} attempts; the ligand pool lacks donor-count diversity"
    )]
    AssemblyExhausted {
        attempts: usize,
        assembled: usize,
        requested: usize,
    },

    #[error("Generation phase '{phase}' failed: {reason}")]
    PhaseFailed { phase: &'static str, reason: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
