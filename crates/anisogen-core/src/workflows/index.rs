use crate::core::corpus::Corpus;
use crate::core::io::artifacts;
use crate::engine::config::LookupConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::tasks::donor_index;
use std::path::{Path, PathBuf};
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub rows: usize,
    pub ligands: usize,
    /// One per `(ligand, donor count)` pair.
    pub modes: usize,
    pub path: PathBuf,
}

/// Builds the donor-mode index of the corpus and writes it to `output`, one
/// `smiles,donors` row per supported donor count.
#[instrument(skip_all, name = "index_workflow")]
pub fn run(
    config: &LookupConfig,
    output: &Path,
    reporter: &ProgressReporter,
) -> Result<IndexSummary, EngineError> {
    let corpus = Corpus::load(&config.corpus_path, &config.zfs_column)?;
    let index = donor_index::run(&corpus, reporter);
    let rows = index.library().mode_rows();
    artifacts::write_ligand_modes(output, &rows)?;
    Ok(IndexSummary {
        rows: corpus.len(),
        ligands: index.len(),
        modes: rows.len(),
        path: output.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::corpus::tests::HEADER;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn publishes_one_row_per_mode() {
        let dir = tempdir().unwrap();
        let corpus_path = dir.path().join("GA.csv");
        fs::write(
            &corpus_path,
            format!(
                "{HEADER}\n\
                 a,O,N,X,X,X,X,1,2,,,,,,,,,,,-100.0,0.1\n\
                 b,O,X,X,X,X,X,2,,,,,,,,,,,,-90.0,0.1\n"
            ),
        )
        .unwrap();
        let config = LookupConfig {
            corpus_path,
            zfs_column: "zfs".to_string(),
            tolerance: 10.0,
            seed_threshold: -120.0,
        };
        let output = dir.path().join("work").join(artifacts::LIGAND_DONOR_MODES);

        let summary = run(&config, &output, &ProgressReporter::new()).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.ligands, 2);
        assert_eq!(summary.modes, 3);

        let rows = artifacts::read_ligand_modes(&summary.path).unwrap();
        assert_eq!(
            rows,
            vec![
                ("N".to_string(), 2),
                ("O".to_string(), 1),
                ("O".to_string(), 2),
            ]
        );
    }
}
