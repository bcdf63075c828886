use crate::core::corpus::{Corpus, CorpusHit};
use crate::core::io::artifacts::{self, RETRIEVED_SOLUTION};
use crate::engine::config::LookupConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::sink::ArtifactStore;
use tracing::{info, instrument};

/// A corpus complex whose measured ZFS already lies within tolerance of the
/// target.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectHit {
    pub file_name: Option<String>,
    /// `(ligand, donor count)` for every occupied slot, in slot order.
    pub slots: Vec<(String, Option<u8>)>,
    pub zfs: f64,
    pub distance: f64,
}

impl DirectHit {
    fn from_hit(hit: &CorpusHit<'_>) -> Self {
        let record = hit.record;
        Self {
            file_name: record.file_name.clone(),
            slots: record
                .ligands
                .iter()
                .zip(&record.donor_counts)
                .filter_map(|(ligand, count)| Some((ligand.clone()?, *count)))
                .collect(),
            zfs: record.zfs.unwrap_or(f64::NAN),
            distance: hit.distance,
        }
    }
}

/// Queries an already loaded corpus and publishes the hits, if any.
pub(crate) fn retrieve(
    corpus: &Corpus,
    target: f64,
    tolerance: f64,
    store: &ArtifactStore,
    reporter: &ProgressReporter,
) -> Result<Vec<DirectHit>, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Database Lookup" });
    let hits = corpus.lookup(target, tolerance);
    if !hits.is_empty() {
        store.publish(RETRIEVED_SOLUTION, |path| {
            artifacts::write_retrieved(path, corpus, &hits)
        })?;
    }
    info!(
        target,
        tolerance,
        rows = corpus.len(),
        hits = hits.len(),
        "Database lookup complete."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(hits.iter().map(DirectHit::from_hit).collect())
}

/// Looks `target` up in the corpus without running a search.
#[instrument(skip_all, name = "lookup_workflow")]
pub fn run(
    config: &LookupConfig,
    target: f64,
    store: &ArtifactStore,
    reporter: &ProgressReporter,
) -> Result<Vec<DirectHit>, EngineError> {
    let corpus = Corpus::load(&config.corpus_path, &config.zfs_column)?;
    retrieve(&corpus, target, config.tolerance, store, reporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::corpus::tests::HEADER;
    use std::fs;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> LookupConfig {
        let path = dir.join("GA.csv");
        fs::write(
            &path,
            format!(
                "{HEADER}\n\
                 a.xyz,N,O,X,X,X,X,3,3,,,,,,,,,,,-182.0,0.1\n\
                 b.xyz,S,X,X,X,X,X,6,,,,,,,,,,,,-250.0,0.1\n"
            ),
        )
        .unwrap();
        LookupConfig {
            corpus_path: path,
            zfs_column: "zfs".to_string(),
            tolerance: 10.0,
            seed_threshold: -120.0,
        }
    }

    #[test]
    fn hit_is_returned_and_published() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("work"));
        let hits = run(&config(dir.path()), -180.0, &store, &ProgressReporter::new()).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name.as_deref(), Some("a.xyz"));
        assert_eq!(
            hits[0].slots,
            vec![("N".to_string(), Some(3)), ("O".to_string(), Some(3))]
        );
        assert_eq!(hits[0].distance, 2.0);

        let written = fs::read_to_string(store.path(RETRIEVED_SOLUTION)).unwrap();
        let mut lines = written.lines();
        assert!(lines.next().unwrap().ends_with(",dist"));
        assert!(lines.next().unwrap().starts_with("a.xyz,N,O"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn miss_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("work"));
        let hits = run(&config(dir.path()), -400.0, &store, &ProgressReporter::new()).unwrap();
        assert!(hits.is_empty());
        assert!(!store.path(RETRIEVED_SOLUTION).exists());
    }
}
