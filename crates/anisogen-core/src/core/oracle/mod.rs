//! Batched inference with the pretrained ZFS and E/D graph models.
//!
//! Each complex becomes one disconnected graph: the sub-graphs of its ligands,
//! padded with single-node placeholders up to [`SLOT_COUNT`] slots. Both models
//! run over the same batch and their outputs are mapped back to physical units
//! with the scaler stored next to each weight file.

pub mod featurizer;
pub mod graph;
pub mod model;
pub mod scaler;

use crate::core::corpus::SLOT_COUNT;
use crate::core::models::complex::{ComplexCandidate, ScoredCandidate};
use crate::core::models::ids::LigandId;
use crate::core::models::ligand::LigandLibrary;
use featurizer::{AtomFeaturizer, LigandGraph, NodeFeaturizer};
use graph::GraphBatch;
use model::GnnModel;
use scaler::OutputScaler;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle artifact not found: {path}")]
    MissingArtifact { path: String },

    #[error("Failed to read oracle artifact '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid safetensors file '{path}': {source}")]
    Format {
        path: String,
        #[source]
        source: safetensors::SafeTensorError,
    },

    #[error("Tensor '{name}' is missing from '{path}'")]
    MissingTensor { path: String, name: String },

    #[error("Tensor '{name}' in '{path}' has shape {found:?}, expected {expected}")]
    ShapeMismatch {
        path: String,
        name: String,
        expected: String,
        found: Vec<usize>,
    },

    #[error("Tensor '{name}' in '{path}' has unsupported dtype {dtype}")]
    UnsupportedDtype {
        path: String,
        name: String,
        dtype: String,
    },

    #[error("Failed to parse output scaler '{path}': {source}")]
    Scaler {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error(
        "Model '{path}' expects {expected} node features but the featurizer produces {found}"
    )]
    FeatureWidthMismatch {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("Featurizer produced ligand graphs of inconsistent width")]
    InconsistentGraphs,

    #[error("Model '{path}' produced a non-finite prediction for complex {index}")]
    NonFinitePrediction { path: String, index: usize },

    #[error("Model '{path}' produced {found} predictions for {expected} complexes")]
    OutputCount {
        path: String,
        expected: usize,
        found: usize,
    },
}

/// File locations of one deployment profile's two (weights, scaler) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleArtifacts {
    pub zfs_model: PathBuf,
    pub zfs_scaler: PathBuf,
    pub ed_model: PathBuf,
    pub ed_scaler: PathBuf,
}

impl OracleArtifacts {
    /// The conventional layout: `{dir}/zfs_gnn_{tag}.safetensors`,
    /// `{dir}/zfs_scaler_{tag}.toml` and the same pair with an `ed_` prefix.
    pub fn in_dir(dir: &Path, tag: &str) -> Self {
        Self {
            zfs_model: dir.join(format!("zfs_gnn_{tag}.safetensors")),
            zfs_scaler: dir.join(format!("zfs_scaler_{tag}.toml")),
            ed_model: dir.join(format!("ed_gnn_{tag}.safetensors")),
            ed_scaler: dir.join(format!("ed_scaler_{tag}.toml")),
        }
    }

    fn all(&self) -> [&Path; 4] {
        [
            &self.zfs_model,
            &self.zfs_scaler,
            &self.ed_model,
            &self.ed_scaler,
        ]
    }
}

fn load_scaler(path: &Path) -> Result<OutputScaler, OracleError> {
    let content = std::fs::read_to_string(path).map_err(|source| OracleError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| OracleError::Scaler {
        path: path.to_string_lossy().to_string(),
        source,
    })
}

#[derive(Debug)]
struct Regressor {
    path: String,
    model: GnnModel,
    scaler: OutputScaler,
}

impl Regressor {
    fn load(model: &Path, scaler: &Path, feature_width: usize) -> Result<Self, OracleError> {
        let path = model.to_string_lossy().to_string();
        let model = GnnModel::load(model)?;
        if model.input_width() != feature_width {
            return Err(OracleError::FeatureWidthMismatch {
                path,
                expected: model.input_width(),
                found: feature_width,
            });
        }
        let scaler = load_scaler(scaler)?;
        Ok(Self {
            path,
            model,
            scaler,
        })
    }

    fn predict(&self, batch: &GraphBatch) -> Result<Vec<f64>, OracleError> {
        let raw = self.model.forward(batch);
        if raw.len() != batch.graph_count() {
            return Err(OracleError::OutputCount {
                path: self.path.clone(),
                expected: batch.graph_count(),
                found: raw.len(),
            });
        }
        raw.into_iter()
            .enumerate()
            .map(|(index, v)| {
                let value = self.scaler.inverse_transform(f64::from(v));
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(OracleError::NonFinitePrediction {
                        path: self.path.clone(),
                        index,
                    })
                }
            })
            .collect()
    }
}

/// The ligand graphs of one complex, padded with `placeholder` up to
/// [`SLOT_COUNT`] slots. Ligands absent from `graphs` also take the placeholder.
fn slot_graphs<'g>(
    candidate: &ComplexCandidate,
    graphs: &'g HashMap<LigandId, LigandGraph>,
    placeholder: &'g LigandGraph,
) -> Vec<&'g LigandGraph> {
    let mut slots: Vec<&LigandGraph> = candidate
        .slots()
        .iter()
        .map(|slot| graphs.get(&slot.ligand).unwrap_or(placeholder))
        .collect();
    while slots.len() < SLOT_COUNT {
        slots.push(placeholder);
    }
    slots
}

/// The loaded pair of regressors plus the featurizer they were trained with.
pub struct Oracle {
    featurizer: Box<dyn NodeFeaturizer>,
    zfs: Regressor,
    ed: Regressor,
    chunk_size: usize,
}

impl std::fmt::Debug for Oracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracle")
            .field("feature_width", &self.featurizer.width())
            .field("zfs", &self.zfs.path)
            .field("ed", &self.ed.path)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

/// Anything that annotates candidates with ZFS and E/D predictions, one
/// [`ScoredCandidate`] per input in input order.
pub trait Evaluator: Send + Sync {
    fn score(
        &self,
        candidates: Vec<ComplexCandidate>,
        library: &LigandLibrary,
    ) -> Result<Vec<ScoredCandidate>, OracleError>;
}

pub const DEFAULT_CHUNK_SIZE: usize = 1024;

impl Oracle {
    pub fn load(artifacts: &OracleArtifacts) -> Result<Self, OracleError> {
        Self::with_featurizer(artifacts, Box::new(AtomFeaturizer))
    }

    /// Loads all four artifacts, failing if any is absent or if either model's
    /// input width differs from `featurizer.width()`.
    pub fn with_featurizer(
        artifacts: &OracleArtifacts,
        featurizer: Box<dyn NodeFeaturizer>,
    ) -> Result<Self, OracleError> {
        if let Some(missing) = artifacts.all().into_iter().find(|p| !p.is_file()) {
            return Err(OracleError::MissingArtifact {
                path: missing.to_string_lossy().to_string(),
            });
        }
        let width = featurizer.width();
        let zfs = Regressor::load(&artifacts.zfs_model, &artifacts.zfs_scaler, width)?;
        let ed = Regressor::load(&artifacts.ed_model, &artifacts.ed_scaler, width)?;
        info!(
            feature_width = width,
            zfs_layers = zfs.model.layer_count(),
            ed_layers = ed.model.layer_count(),
            "Loaded oracle models."
        );
        Ok(Self {
            featurizer,
            zfs,
            ed,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Caps how many complexes go through one forward pass.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn feature_width(&self) -> usize {
        self.featurizer.width()
    }

    /// Annotates every candidate with predicted ZFS and E/D. No candidate is
    /// dropped; the output preserves input order.
    pub fn score(
        &self,
        candidates: Vec<ComplexCandidate>,
        library: &LigandLibrary,
    ) -> Result<Vec<ScoredCandidate>, OracleError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let graphs = self.featurize_ligands(&candidates, library);
        let placeholder = self.featurizer.empty_slot();

        let chunks: Vec<&[ComplexCandidate]> = candidates.chunks(self.chunk_size).collect();
        debug!(
            candidates = candidates.len(),
            chunks = chunks.len(),
            unique_ligands = graphs.len(),
            "Running oracle inference."
        );

        #[cfg(not(feature = "parallel"))]
        let iterator = chunks.iter();

        #[cfg(feature = "parallel")]
        let iterator = chunks.par_iter();

        let predictions: Vec<Result<(Vec<f64>, Vec<f64>), OracleError>> = iterator
            .map(|chunk| {
                let batch = GraphBatch::from_complexes(
                    chunk
                        .iter()
                        .map(|candidate| slot_graphs(candidate, &graphs, &placeholder)),
                )
                .ok_or(OracleError::InconsistentGraphs)?;
                Ok((self.zfs.predict(&batch)?, self.ed.predict(&batch)?))
            })
            .collect();

        let mut scored = Vec::with_capacity(candidates.len());
        let mut remaining = candidates.into_iter();
        for prediction in predictions {
            let (zfs, ed) = prediction?;
            for ((zfs_pred, ed_pred), candidate) in zfs.into_iter().zip(ed).zip(remaining.by_ref()) {
                scored.push(ScoredCandidate {
                    candidate,
                    zfs_pred,
                    ed_pred,
                });
            }
        }
        Ok(scored)
    }

    fn featurize_ligands(
        &self,
        candidates: &[ComplexCandidate],
        library: &LigandLibrary,
    ) -> HashMap<LigandId, LigandGraph> {
        let mut ids: Vec<LigandId> = candidates
            .iter()
            .flat_map(|c| c.slots().iter().map(|s| s.ligand))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let work: Vec<(LigandId, &str)> = ids
            .into_iter()
            .filter_map(|id| library.get(id).map(|l| (id, l.smiles())))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = work.iter();

        #[cfg(feature = "parallel")]
        let iterator = work.par_iter();

        iterator
            .map(|&(id, smiles)| (id, self.featurizer.featurize(smiles, None)))
            .collect()
    }
}

impl Evaluator for Oracle {
    fn score(
        &self,
        candidates: Vec<ComplexCandidate>,
        library: &LigandLibrary,
    ) -> Result<Vec<ScoredCandidate>, OracleError> {
        Oracle::score(self, candidates, library)
    }
}
