use super::ids::LigandId;
use super::ligand::LigandLibrary;
use super::pattern::DonorPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LigandSlot {
    pub ligand: LigandId,
    pub donor_count: u8,
}

/// One assembled complex: a ligand per slot, each binding through
/// `donor_count` donor atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexCandidate {
    slots: Vec<LigandSlot>,
}

impl ComplexCandidate {
    pub fn new(slots: Vec<LigandSlot>) -> Self {
        Self { slots }
    }

    pub fn slots(&self) -> &[LigandSlot] {
        &self.slots
    }

    pub fn donor_sum(&self) -> u32 {
        self.slots.iter().map(|s| u32::from(s.donor_count)).sum()
    }

    pub fn pattern(&self) -> DonorPattern {
        DonorPattern::new(self.slots.iter().map(|s| s.donor_count))
    }

    pub fn contains(&self, ligand: LigandId) -> bool {
        self.slots.iter().any(|s| s.ligand == ligand)
    }

    /// True if the donor counts sum to `coordination_number` and no ligand
    /// occupies two slots.
    pub fn is_well_formed(&self, coordination_number: u32) -> bool {
        if self.donor_sum() != coordination_number {
            return false;
        }
        self.slots
            .iter()
            .enumerate()
            .all(|(i, slot)| self.slots[..i].iter().all(|other| other.ligand != slot.ligand))
    }

    /// Resolves each slot to its SMILES, skipping ids unknown to `library`.
    pub fn smiles<'a>(&self, library: &'a LigandLibrary) -> Vec<&'a str> {
        self.slots
            .iter()
            .filter_map(|slot| library.get(slot.ligand).map(|l| l.smiles()))
            .collect()
    }
}

/// A candidate annotated by the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: ComplexCandidate,
    pub zfs_pred: f64,
    pub ed_pred: f64,
}
