use super::complex::ScoredCandidate;
use super::ligand::LigandLibrary;
use super::pattern::DonorPattern;

/// A retained candidate in its persisted form: ligands by SMILES, so elites
/// stay meaningful across restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct EliteRecord {
    pub ligands: Vec<String>,
    pub donor_counts: Vec<u8>,
    pub zfs_pred: f64,
    pub ed_pred: f64,
    pub abs_err: f64,
}

impl EliteRecord {
    pub fn from_scored(scored: &ScoredCandidate, library: &LigandLibrary, target: f64) -> Self {
        let (ligands, donor_counts) = scored
            .candidate
            .slots()
            .iter()
            .filter_map(|slot| {
                library
                    .get(slot.ligand)
                    .map(|l| (l.smiles().to_string(), slot.donor_count))
            })
            .unzip();
        Self {
            ligands,
            donor_counts,
            zfs_pred: scored.zfs_pred,
            ed_pred: scored.ed_pred,
            abs_err: (scored.zfs_pred - target).abs(),
        }
    }

    pub fn donor_sum(&self) -> u32 {
        self.donor_counts.iter().map(|&c| u32::from(c)).sum()
    }

    pub fn pattern(&self) -> DonorPattern {
        DonorPattern::new(self.donor_counts.iter().copied())
    }

    /// `(smiles, donor_count)` per slot.
    pub fn slots(&self) -> impl Iterator<Item = (&str, u8)> {
        self.ligands
            .iter()
            .map(String::as_str)
            .zip(self.donor_counts.iter().copied())
    }
}
