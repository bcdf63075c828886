use crate::core::models::lineage::MutationOperator;
use crate::core::models::pattern::DonorPattern;
use crate::core::oracle::{DEFAULT_CHUNK_SIZE, OracleArtifacts};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
    #[error("Unknown profile '{0}' (expected 'crystal' or 'optimized')")]
    UnknownProfile(String),
}

/// A deployment profile: which corpus and which trained oracle pair to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Trained on crystal-structure geometries.
    #[default]
    Crystal,
    /// Trained on DFT-optimized geometries.
    Optimized,
}

impl Profile {
    pub fn corpus_file(self) -> &'static str {
        match self {
            Profile::Crystal => "GA.csv",
            Profile::Optimized => "opt_D.csv",
        }
    }

    pub fn zfs_column(self) -> &'static str {
        match self {
            Profile::Crystal => "zfs",
            Profile::Optimized => "opt_zfs",
        }
    }

    /// Suffix of the model and scaler file names.
    pub fn model_tag(self) -> &'static str {
        match self {
            Profile::Crystal => "crystal",
            Profile::Optimized => "opt",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Crystal => "crystal",
            Profile::Optimized => "optimized",
        }
    }

    pub fn artifacts(self, model_dir: &Path) -> OracleArtifacts {
        OracleArtifacts::in_dir(model_dir, self.model_tag())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crystal" => Ok(Profile::Crystal),
            "optimized" | "opt" => Ok(Profile::Optimized),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupConfig {
    pub corpus_path: PathBuf,
    pub zfs_column: String,
    /// Half-width of the direct-hit window around the target.
    pub tolerance: f64,
    /// Corpus complexes at or below this ZFS seed the first generation.
    pub seed_threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationConfig {
    /// Number of corpus complexes nearest the target whose ligands become parents.
    pub anchor_count: usize,
    pub operators: Vec<MutationOperator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyConfig {
    pub coordination_number: u8,
    pub batch_size: usize,
    pub patterns: Vec<DonorPattern>,
    pub temperature: f64,
    /// Added to the initial weight of the current best elite's pattern.
    pub pattern_boost: f64,
    pub pattern_weight_cap: f64,
    /// Candidate attempts allowed per requested candidate before giving up.
    pub attempts_per_candidate: usize,
}

impl AssemblyConfig {
    pub fn attempt_budget(&self) -> usize {
        self.batch_size.saturating_mul(self.attempts_per_candidate)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    pub artifacts: OracleArtifacts,
    pub chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub ed_cutoff: f64,
    pub elite_fraction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactConfig {
    pub work_dir: PathBuf,
    /// Write the last generation's candidate batch.
    pub write_generated_complexes: bool,
    /// Optional second directory every published artifact is copied to.
    pub mirror_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub target_zfs: f64,
    pub profile: Profile,
    pub max_generations: u32,
    pub seed: u64,
    pub lookup: LookupConfig,
    pub mutation: MutationConfig,
    pub assembly: AssemblyConfig,
    pub oracle: OracleConfig,
    pub selection: SelectionConfig,
    pub artifacts: ArtifactConfig,
}

pub mod defaults {
    pub const COORDINATION_NUMBER: u8 = 6;
    pub const BATCH_SIZE: usize = 5000;
    pub const ANCHOR_COUNT: usize = 15;
    pub const PATTERN_TEMPERATURE: f64 = 1.5;
    pub const PATTERN_BOOST: f64 = 1.5;
    pub const PATTERN_WEIGHT_CAP: f64 = 4.0;
    pub const ATTEMPTS_PER_CANDIDATE: usize = 200;
    pub const ED_CUTOFF: f64 = 0.22;
    pub const ELITE_FRACTION: f64 = 0.10;
    pub const LOOKUP_TOLERANCE: f64 = 10.0;
    pub const MAX_GENERATIONS: u32 = 3000;
    pub const SEED: u64 = 42;
    pub const SEED_THRESHOLD: f64 = -120.0;
}

#[derive(Default)]
pub struct SearchConfigBuilder {
    target_zfs: Option<f64>,
    profile: Option<Profile>,
    data_dir: Option<PathBuf>,
    corpus_path: Option<PathBuf>,
    model_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    mirror_dir: Option<PathBuf>,
    max_generations: Option<u32>,
    seed: Option<u64>,
    tolerance: Option<f64>,
    seed_threshold: Option<f64>,
    anchor_count: Option<usize>,
    operators: Option<Vec<MutationOperator>>,
    coordination_number: Option<u8>,
    batch_size: Option<usize>,
    patterns: Option<Vec<DonorPattern>>,
    temperature: Option<f64>,
    pattern_boost: Option<f64>,
    pattern_weight_cap: Option<f64>,
    attempts_per_candidate: Option<usize>,
    chunk_size: Option<usize>,
    ed_cutoff: Option<f64>,
    elite_fraction: Option<f64>,
    write_generated_complexes: Option<bool>,
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_zfs(mut self, target: f64) -> Self {
        self.target_zfs = Some(target);
        self
    }
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }
    /// Directory holding the profile's corpus and oracle artifacts.
    pub fn data_dir(mut self, path: PathBuf) -> Self {
        self.data_dir = Some(path);
        self
    }
    pub fn corpus_path(mut self, path: PathBuf) -> Self {
        self.corpus_path = Some(path);
        self
    }
    pub fn model_dir(mut self, path: PathBuf) -> Self {
        self.model_dir = Some(path);
        self
    }
    pub fn work_dir(mut self, path: PathBuf) -> Self {
        self.work_dir = Some(path);
        self
    }
    pub fn mirror_dir(mut self, path: Option<PathBuf>) -> Self {
        self.mirror_dir = path;
        self
    }
    pub fn max_generations(mut self, generations: u32) -> Self {
        self.max_generations = Some(generations);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }
    pub fn seed_threshold(mut self, threshold: f64) -> Self {
        self.seed_threshold = Some(threshold);
        self
    }
    pub fn anchor_count(mut self, n: usize) -> Self {
        self.anchor_count = Some(n);
        self
    }
    pub fn operators(mut self, operators: Vec<MutationOperator>) -> Self {
        self.operators = Some(operators);
        self
    }
    pub fn coordination_number(mut self, n: u8) -> Self {
        self.coordination_number = Some(n);
        self
    }
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = Some(n);
        self
    }
    pub fn patterns(mut self, patterns: Vec<DonorPattern>) -> Self {
        self.patterns = Some(patterns);
        self
    }
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
    pub fn pattern_boost(mut self, boost: f64) -> Self {
        self.pattern_boost = Some(boost);
        self
    }
    pub fn pattern_weight_cap(mut self, cap: f64) -> Self {
        self.pattern_weight_cap = Some(cap);
        self
    }
    pub fn attempts_per_candidate(mut self, n: usize) -> Self {
        self.attempts_per_candidate = Some(n);
        self
    }
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = Some(n);
        self
    }
    pub fn ed_cutoff(mut self, cutoff: f64) -> Self {
        self.ed_cutoff = Some(cutoff);
        self
    }
    pub fn elite_fraction(mut self, fraction: f64) -> Self {
        self.elite_fraction = Some(fraction);
        self
    }
    pub fn write_generated_complexes(mut self, enabled: bool) -> Self {
        self.write_generated_complexes = Some(enabled);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        use defaults::*;

        let target_zfs = self
            .target_zfs
            .ok_or(ConfigError::MissingParameter("target_zfs"))?;
        if !target_zfs.is_finite() {
            return Err(invalid("target_zfs", "must be a finite number"));
        }
        let profile = self.profile.unwrap_or_default();
        let work_dir = self
            .work_dir
            .ok_or(ConfigError::MissingParameter("work_dir"))?;

        let corpus_path = match (self.corpus_path, &self.data_dir) {
            (Some(path), _) => path,
            (None, Some(dir)) => dir.join(profile.corpus_file()),
            (None, None) => return Err(ConfigError::MissingParameter("data_dir")),
        };
        let model_dir = match (self.model_dir, &self.data_dir) {
            (Some(dir), _) => dir,
            (None, Some(dir)) => dir.clone(),
            (None, None) => return Err(ConfigError::MissingParameter("data_dir")),
        };

        let lookup = LookupConfig {
            corpus_path,
            zfs_column: profile.zfs_column().to_string(),
            tolerance: self.tolerance.unwrap_or(LOOKUP_TOLERANCE),
            seed_threshold: self.seed_threshold.unwrap_or(SEED_THRESHOLD),
        };
        if !(lookup.tolerance >= 0.0 && lookup.tolerance.is_finite()) {
            return Err(invalid("tolerance", "must be a non-negative number"));
        }

        let mutation = MutationConfig {
            anchor_count: self.anchor_count.unwrap_or(ANCHOR_COUNT),
            operators: self
                .operators
                .unwrap_or_else(|| MutationOperator::ALL.to_vec()),
        };

        let coordination_number = self.coordination_number.unwrap_or(COORDINATION_NUMBER);
        if coordination_number == 0 {
            return Err(invalid("coordination_number", "must be at least 1"));
        }
        let patterns = self
            .patterns
            .unwrap_or_else(|| DonorPattern::default_vocabulary(coordination_number));
        if patterns.is_empty() {
            return Err(invalid("patterns", "at least one donor pattern is required"));
        }
        if let Some(bad) = patterns
            .iter()
            .find(|p| p.total() != u32::from(coordination_number))
        {
            return Err(invalid(
                "patterns",
                format!("{bad} does not sum to the coordination number {coordination_number}"),
            ));
        }
        let assembly = AssemblyConfig {
            coordination_number,
            batch_size: self.batch_size.unwrap_or(BATCH_SIZE),
            patterns,
            temperature: self.temperature.unwrap_or(PATTERN_TEMPERATURE),
            pattern_boost: self.pattern_boost.unwrap_or(PATTERN_BOOST),
            pattern_weight_cap: self.pattern_weight_cap.unwrap_or(PATTERN_WEIGHT_CAP),
            attempts_per_candidate: self
                .attempts_per_candidate
                .unwrap_or(ATTEMPTS_PER_CANDIDATE),
        };
        if assembly.batch_size == 0 {
            return Err(invalid("batch_size", "must be at least 1"));
        }
        if !(assembly.temperature > 0.0 && assembly.temperature.is_finite()) {
            return Err(invalid("temperature", "must be positive"));
        }
        if !(assembly.pattern_boost >= 0.0 && assembly.pattern_boost.is_finite()) {
            return Err(invalid("pattern_boost", "must be non-negative"));
        }
        if !(assembly.pattern_weight_cap >= 1.0 && assembly.pattern_weight_cap.is_finite()) {
            return Err(invalid("pattern_weight_cap", "must be at least 1.0"));
        }
        if assembly.attempts_per_candidate == 0 {
            return Err(invalid("attempts_per_candidate", "must be at least 1"));
        }

        let oracle = OracleConfig {
            artifacts: profile.artifacts(&model_dir),
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1),
        };

        let selection = SelectionConfig {
            ed_cutoff: self.ed_cutoff.unwrap_or(ED_CUTOFF),
            elite_fraction: self.elite_fraction.unwrap_or(ELITE_FRACTION),
        };
        if !selection.ed_cutoff.is_finite() {
            return Err(invalid("ed_cutoff", "must be a finite number"));
        }
        if !(selection.elite_fraction > 0.0 && selection.elite_fraction <= 1.0) {
            return Err(invalid("elite_fraction", "must lie in (0, 1]"));
        }

        let max_generations = self.max_generations.unwrap_or(MAX_GENERATIONS);
        if max_generations == 0 {
            return Err(invalid("max_generations", "must be at least 1"));
        }

        Ok(SearchConfig {
            target_zfs,
            profile,
            max_generations,
            seed: self.seed.unwrap_or(SEED),
            lookup,
            mutation,
            assembly,
            oracle,
            selection,
            artifacts: ArtifactConfig {
                work_dir,
                write_generated_complexes: self.write_generated_complexes.unwrap_or(true),
                mirror_dir: self.mirror_dir,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
            .target_zfs(-180.0)
            .data_dir(PathBuf::from("/data"))
            .work_dir(PathBuf::from("/work"))
    }

    #[test]
    fn defaults_follow_the_crystal_profile() {
        let config = minimal().build().unwrap();
        assert_eq!(config.profile, Profile::Crystal);
        assert_eq!(config.lookup.corpus_path, PathBuf::from("/data/GA.csv"));
        assert_eq!(config.lookup.zfs_column, "zfs");
        assert_eq!(config.lookup.tolerance, 10.0);
        assert_eq!(
            config.oracle.artifacts.zfs_model,
            PathBuf::from("/data/zfs_gnn_crystal.safetensors")
        );
        assert_eq!(config.assembly.patterns.len(), 7);
        assert_eq!(config.assembly.attempt_budget(), 5000 * 200);
        assert_eq!(config.selection.ed_cutoff, 0.22);
        assert_eq!(config.max_generations, 3000);
        assert_eq!(config.mutation.operators.len(), 5);
    }

    #[test]
    fn optimized_profile_switches_corpus_and_models() {
        let config = minimal().profile(Profile::Optimized).build().unwrap();
        assert_eq!(config.lookup.corpus_path, PathBuf::from("/data/opt_D.csv"));
        assert_eq!(config.lookup.zfs_column, "opt_zfs");
        assert_eq!(
            config.oracle.artifacts.ed_scaler,
            PathBuf::from("/data/ed_scaler_opt.toml")
        );
    }

    #[test]
    fn missing_required_parameters_are_named() {
        let err = SearchConfigBuilder::new()
            .work_dir(PathBuf::from("/w"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("target_zfs"));

        let err = SearchConfigBuilder::new()
            .target_zfs(-1.0)
            .work_dir(PathBuf::from("/w"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("data_dir"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            minimal().elite_fraction(0.0).build(),
            Err(ConfigError::InvalidValue { parameter: "elite_fraction", .. })
        ));
        assert!(matches!(
            minimal().temperature(-1.0).build(),
            Err(ConfigError::InvalidValue { parameter: "temperature", .. })
        ));
        assert!(matches!(
            minimal().patterns(vec![DonorPattern::new([3, 2])]).build(),
            Err(ConfigError::InvalidValue { parameter: "patterns", .. })
        ));
        assert!(matches!(
            minimal().batch_size(0).build(),
            Err(ConfigError::InvalidValue { parameter: "batch_size", .. })
        ));
    }

    #[test]
    fn non_hexacoordinate_centres_use_all_partitions() {
        let config = minimal().coordination_number(4).build().unwrap();
        assert_eq!(config.assembly.patterns.len(), 5);
    }

    #[test]
    fn profile_names_parse_case_insensitively() {
        assert_eq!("Crystal".parse::<Profile>().unwrap(), Profile::Crystal);
        assert_eq!("opt".parse::<Profile>().unwrap(), Profile::Optimized);
        assert!(matches!(
            "gas".parse::<Profile>(),
            Err(ConfigError::UnknownProfile(_))
        ));
    }
}
