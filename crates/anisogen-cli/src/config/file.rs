use crate::error::{CliError, Result};
use anisogen::core::models::lineage::MutationOperator;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSearchConfig {
    pub generations: Option<u32>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileLookupConfig {
    pub tolerance: Option<f64>,
    pub seed_threshold: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMutationConfig {
    pub anchor_count: Option<usize>,
    pub operators: Option<Vec<MutationOperator>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileAssemblyConfig {
    pub coordination_number: Option<u8>,
    pub batch_size: Option<usize>,
    /// Donor patterns written as `"4,1,1"`.
    pub patterns: Option<Vec<String>>,
    pub temperature: Option<f64>,
    pub pattern_boost: Option<f64>,
    pub pattern_weight_cap: Option<f64>,
    pub attempts_per_candidate: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOracleConfig {
    pub chunk_size: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSelectionConfig {
    pub ed_cutoff: Option<f64>,
    pub elite_fraction: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    pub write_generated_complexes: Option<bool>,
}

/// The optional TOML configuration file. Every key may be omitted.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub profile: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub corpus: Option<PathBuf>,
    pub model_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub mirror_dir: Option<PathBuf>,
    pub search: Option<FileSearchConfig>,
    pub lookup: Option<FileLookupConfig>,
    pub mutation: Option<FileMutationConfig>,
    pub assembly: Option<FileAssemblyConfig>,
    pub oracle: Option<FileOracleConfig>,
    pub selection: Option<FileSelectionConfig>,
    pub output: Option<FileOutputConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
