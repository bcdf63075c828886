use crate::core::chem;
use crate::core::corpus::Corpus;
use crate::core::models::ids::LigandId;
use crate::core::models::ligand::{LigandLibrary, LigandOrigin};
use crate::engine::progress::{Progress, ProgressReporter};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// The donor-mode index: every corpus ligand with a known donor count, keyed by
/// canonical SMILES, plus the raw spellings that resolve to each entry.
#[derive(Debug, Clone, Default)]
pub struct DonorIndex {
    library: LigandLibrary,
    aliases: HashMap<String, LigandId>,
}

impl DonorIndex {
    pub fn library(&self) -> &LigandLibrary {
        &self.library
    }

    /// Resolves a ligand as spelled in the corpus.
    pub fn resolve(&self, raw: &str) -> Option<LigandId> {
        self.aliases.get(raw.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.library.len()
    }
}

/// Canonical SMILES for `raw`, or `raw` itself when it cannot be read.
pub fn canonical_form(raw: &str) -> String {
    let raw = raw.trim();
    match chem::canonicalize(raw) {
        Ok(canonical) => canonical,
        Err(e) => {
            warn!(ligand = raw, error = %e, "Keeping unreadable ligand verbatim.");
            raw.to_string()
        }
    }
}

/// Builds the index from every `(ligand, donor count)` slot of the corpus.
/// Repeated ligands union their donor counts.
#[instrument(skip_all, name = "donor_index_task")]
pub fn run(corpus: &Corpus, reporter: &ProgressReporter) -> DonorIndex {
    reporter.report(Progress::PhaseStart {
        name: "Donor-Mode Index",
    });
    reporter.report(Progress::TaskStart {
        total_steps: corpus.len() as u64,
    });

    let mut index = DonorIndex::default();
    let mut skipped_slots = 0usize;
    for record in corpus.records() {
        for (raw, count) in record.ligand_modes() {
            match index.aliases.get(raw) {
                Some(&id) => {
                    index.library.add_modes(id, [count]);
                }
                None => {
                    let canonical = canonical_form(raw);
                    let id = index
                        .library
                        .insert(&canonical, [count], LigandOrigin::Corpus);
                    index.aliases.insert(raw.to_string(), id);
                }
            }
        }
        skipped_slots += record
            .ligands
            .iter()
            .zip(&record.donor_counts)
            .filter(|(ligand, count)| ligand.is_some() && count.is_none())
            .count();
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    info!(
        ligands = index.len(),
        rows = corpus.len(),
        skipped_slots,
        "Donor-mode index built."
    );
    reporter.report(Progress::PhaseFinish);
    index
}
