use super::ids::LigandId;
use slotmap::SlotMap;
use std::collections::{BTreeSet, HashMap};

/// Where a ligand entered the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LigandOrigin {
    /// Observed in the complex corpus.
    Corpus,
    /// Produced by a mutation operator in the given generation.
    Mutation { generation: u32 },
    /// Recovered from a persisted elite set.
    Elite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ligand {
    smiles: String,
    donor_modes: BTreeSet<u8>,
    origin: LigandOrigin,
}

impl Ligand {
    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    pub fn donor_modes(&self) -> &BTreeSet<u8> {
        &self.donor_modes
    }

    pub fn origin(&self) -> LigandOrigin {
        self.origin
    }

    #[inline]
    pub fn supports(&self, donor_count: u8) -> bool {
        self.donor_modes.contains(&donor_count)
    }
}

/// Accumulating store of every ligand the search knows about, keyed by its
/// canonical SMILES.
///
/// Ligands are never removed and their donor-mode sets only grow: inserting an
/// existing SMILES unions the new modes into the stored set and keeps the
/// original origin.
#[derive(Debug, Clone, Default)]
pub struct LigandLibrary {
    ligands: SlotMap<LigandId, Ligand>,
    by_smiles: HashMap<String, LigandId>,
}

impl LigandLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ligands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ligands.is_empty()
    }

    pub fn insert(
        &mut self,
        smiles: &str,
        donor_modes: impl IntoIterator<Item = u8>,
        origin: LigandOrigin,
    ) -> LigandId {
        if let Some(&id) = self.by_smiles.get(smiles) {
            if let Some(ligand) = self.ligands.get_mut(id) {
                ligand.donor_modes.extend(donor_modes);
            }
            return id;
        }
        let id = self.ligands.insert(Ligand {
            smiles: smiles.to_string(),
            donor_modes: donor_modes.into_iter().collect(),
            origin,
        });
        self.by_smiles.insert(smiles.to_string(), id);
        id
    }

    /// Unions `donor_modes` into an existing entry. Returns false for unknown ids.
    pub fn add_modes(&mut self, id: LigandId, donor_modes: impl IntoIterator<Item = u8>) -> bool {
        match self.ligands.get_mut(id) {
            Some(ligand) => {
                ligand.donor_modes.extend(donor_modes);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: LigandId) -> Option<&Ligand> {
        self.ligands.get(id)
    }

    pub fn id_of(&self, smiles: &str) -> Option<LigandId> {
        self.by_smiles.get(smiles).copied()
    }

    pub fn find(&self, smiles: &str) -> Option<&Ligand> {
        self.id_of(smiles).and_then(|id| self.ligands.get(id))
    }

    pub fn contains(&self, smiles: &str) -> bool {
        self.by_smiles.contains_key(smiles)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LigandId, &Ligand)> {
        self.ligands.iter()
    }

    /// All ids ordered by SMILES, independent of insertion history.
    pub fn sorted_ids(&self) -> Vec<LigandId> {
        let mut ids: Vec<(&str, LigandId)> = self
            .by_smiles
            .iter()
            .map(|(smiles, &id)| (smiles.as_str(), id))
            .collect();
        ids.sort_unstable_by(|a, b| a.0.cmp(b.0));
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// `(smiles, donor_count)` pairs ordered by SMILES then count, one row per
    /// supported mode.
    pub fn mode_rows(&self) -> Vec<(String, u8)> {
        self.sorted_ids()
            .into_iter()
            .filter_map(|id| self.ligands.get(id))
            .flat_map(|ligand| {
                ligand
                    .donor_modes
                    .iter()
                    .map(move |&mode| (ligand.smiles.clone(), mode))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinserting_unions_donor_modes() {
        let mut library = LigandLibrary::new();
        let first = library.insert("CCO", [1], LigandOrigin::Corpus);
        let second = library.insert("CCO", [2], LigandOrigin::Mutation { generation: 3 });
        assert_eq!(first, second);
        assert_eq!(library.len(), 1);
        let ligand = library.get(first).unwrap();
        assert_eq!(ligand.donor_modes().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(ligand.origin(), LigandOrigin::Corpus);
    }

    #[test]
    fn sorted_ids_follow_smiles_order() {
        let mut library = LigandLibrary::new();
        library.insert("c1ccncc1", [1], LigandOrigin::Corpus);
        library.insert("CC#N", [1], LigandOrigin::Corpus);
        library.insert("O", [1], LigandOrigin::Corpus);
        let order: Vec<_> = library
            .sorted_ids()
            .into_iter()
            .map(|id| library.get(id).unwrap().smiles().to_string())
            .collect();
        assert_eq!(order, vec!["CC#N", "O", "c1ccncc1"]);
    }

    #[test]
    fn mode_rows_list_each_mode_once() {
        let mut library = LigandLibrary::new();
        library.insert("N", [2, 1], LigandOrigin::Corpus);
        library.insert("N", [1], LigandOrigin::Corpus);
        assert_eq!(
            library.mode_rows(),
            vec![("N".to_string(), 1), ("N".to_string(), 2)]
        );
    }
}
