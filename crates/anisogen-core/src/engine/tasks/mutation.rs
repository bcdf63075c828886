use crate::core::chem::{self, Atom, BondOrder, Element, Molecule, Sanitized};
use crate::core::corpus::Corpus;
use crate::core::models::ids::LigandId;
use crate::core::models::ligand::{LigandLibrary, LigandOrigin};
use crate::core::models::lineage::{LineageRecord, MutationOperator};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::tasks::donor_index::DonorIndex;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument, trace};

/// Elements that may coordinate the metal. Atoms bonded to one of these are
/// left alone so the binding site survives mutation.
const DONOR_ELEMENTS: [Element; 5] = [
    Element::NITROGEN,
    Element::OXYGEN,
    Element::SULFUR,
    Element::PHOSPHORUS,
    Element::SELENIUM,
];

const HALOGENS: [Element; 4] = [
    Element::FLUORINE,
    Element::CHLORINE,
    Element::BROMINE,
    Element::IODINE,
];

fn heteroatom_replacements(element: Element) -> &'static [Element] {
    match element {
        Element::OXYGEN => &[Element::SULFUR, Element::SELENIUM],
        Element::NITROGEN => &[Element::PHOSPHORUS],
        _ => &[],
    }
}

/// Carbon skeleton of an alkyl substituent as `(parent index, order)` edges;
/// entry `i` describes atom `i`, with `None` meaning "bonded to the ring".
fn substituent(operator: MutationOperator) -> Option<&'static [Option<usize>]> {
    match operator {
        MutationOperator::MethylAddition => Some(&[None]),
        MutationOperator::EthylAddition => Some(&[None, Some(0)]),
        MutationOperator::IsopropylAddition => Some(&[None, Some(0), Some(0)]),
        _ => None,
    }
}

fn near_donor(molecule: &Molecule, atom: usize) -> bool {
    molecule.neighbors(atom).any(|(n, _)| {
        molecule
            .atom(n)
            .is_some_and(|a| DONOR_ELEMENTS.contains(&a.element))
    })
}

/// Substitutes one aromatic C-H. Candidate positions are tried in random
/// order and the first one that yields a valid structure wins.
fn alkylate(sanitized: &Sanitized, chain: &[Option<usize>], rng: &mut impl Rng) -> Option<String> {
    let molecule = sanitized.molecule();
    let mut sites: Vec<usize> = molecule
        .atoms()
        .iter()
        .zip(sanitized.properties())
        .enumerate()
        .filter(|(_, (atom, props))| {
            atom.aromatic && atom.element == Element::CARBON && props.total_h == 1
        })
        .map(|(index, _)| index)
        .collect();
    sites.shuffle(rng);

    sites.into_iter().find_map(|site| {
        let mut edited = molecule.clone();
        let mut added = Vec::with_capacity(chain.len());
        for parent in chain {
            let carbon = edited.add_atom(Atom::new(Element::CARBON));
            let anchor = match parent {
                None => site,
                Some(i) => added[*i],
            };
            edited.add_bond(anchor, carbon, BondOrder::Single)?;
            added.push(carbon);
        }
        if let Some(atom) = edited.atom_mut(site) {
            if let Some(h) = atom.bracket_h.as_mut() {
                *h = h.saturating_sub(1);
            }
        }
        chem::finalize_edit(edited)
    })
}

/// Swaps the element of one randomly chosen eligible atom for a random
/// element from `replacements(original)`.
fn swap_element(
    sanitized: &Sanitized,
    eligible: impl Fn(Element) -> bool,
    replacements: impl Fn(Element) -> Vec<Element>,
    rng: &mut impl Rng,
) -> Option<String> {
    let molecule = sanitized.molecule();
    let sites: Vec<usize> = (0..molecule.atom_count())
        .filter(|&i| {
            molecule
                .atom(i)
                .is_some_and(|a| eligible(a.element) && !near_donor(molecule, i))
        })
        .collect();
    let &site = sites.choose(rng)?;
    let original = molecule.atom(site)?.element;
    let &replacement = replacements(original).choose(rng)?;

    let mut edited = molecule.clone();
    edited.atom_mut(site)?.element = replacement;
    chem::finalize_edit(edited)
}

/// Applies `operator` to `parent`, returning the canonical SMILES of the
/// product or `None` when there is no applicable site or the product is not a
/// valid structure.
pub fn mutate(parent: &str, operator: MutationOperator, rng: &mut impl Rng) -> Option<String> {
    let sanitized = chem::read_smiles(parent).ok()?;
    match operator {
        MutationOperator::MethylAddition
        | MutationOperator::EthylAddition
        | MutationOperator::IsopropylAddition => alkylate(&sanitized, substituent(operator)?, rng),
        MutationOperator::AtomTypeSubstitution => swap_element(
            &sanitized,
            |e| !heteroatom_replacements(e).is_empty(),
            |e| heteroatom_replacements(e).to_vec(),
            rng,
        ),
        MutationOperator::HalogenExchange => swap_element(
            &sanitized,
            |e| HALOGENS.contains(&e),
            |e| HALOGENS.iter().copied().filter(|&h| h != e).collect(),
            rng,
        ),
    }
}

/// The result of one generation's mutation stage.
#[derive(Debug, Clone, Default)]
pub struct MutationOutcome {
    /// Parents and children together, ordered by SMILES.
    pub pool: Vec<LigandId>,
    pub lineage: Vec<LineageRecord>,
}

/// Parents for this generation: ligands of the `anchor_count` corpus
/// complexes closest to `target`, plus the `remembered` ligands. Ordered by
/// SMILES so the pool does not depend on hash or insertion order.
pub fn select_parents(
    corpus: &Corpus,
    index: &DonorIndex,
    library: &LigandLibrary,
    target: f64,
    anchor_count: usize,
    remembered: &[LigandId],
) -> Vec<LigandId> {
    let anchors = corpus
        .nearest(target, anchor_count)
        .into_iter()
        .flat_map(|hit| hit.record.ligand_smiles())
        .filter_map(|raw| index.resolve(raw));
    sort_by_smiles(library, anchors.chain(remembered.iter().copied()))
}

fn sort_by_smiles(
    library: &LigandLibrary,
    ids: impl IntoIterator<Item = LigandId>,
) -> Vec<LigandId> {
    let unique: BTreeSet<(&str, LigandId)> = ids
        .into_iter()
        .filter_map(|id| library.get(id).map(|l| (l.smiles(), id)))
        .collect();
    unique.into_iter().map(|(_, id)| id).collect()
}

/// Applies every operator to every parent. Children enter `library` with the
/// parent's donor modes.
#[instrument(skip_all, name = "mutation_task", fields(generation))]
pub fn run(
    parents: &[LigandId],
    library: &mut LigandLibrary,
    operators: &[MutationOperator],
    generation: u32,
    rng: &mut impl Rng,
    reporter: &ProgressReporter,
) -> MutationOutcome {
    reporter.report(Progress::PhaseStart { name: "Mutation" });
    reporter.report(Progress::TaskStart {
        total_steps: parents.len() as u64,
    });

    let parents = sort_by_smiles(library, parents.iter().copied());
    let mut children = Vec::new();
    let mut seen_children = BTreeSet::new();
    let mut lineage = Vec::new();

    for &parent_id in &parents {
        let Some(parent) = library.get(parent_id) else {
            continue;
        };
        let parent_smiles = parent.smiles().to_string();
        let modes: Vec<u8> = parent.donor_modes().iter().copied().collect();

        for &operator in operators {
            let Some(child) = mutate(&parent_smiles, operator, rng) else {
                trace!(parent = %parent_smiles, %operator, "No product.");
                continue;
            };
            if child == parent_smiles {
                continue;
            }
            let child_id = library.insert(
                &child,
                modes.iter().copied(),
                LigandOrigin::Mutation { generation },
            );
            if seen_children.insert(child_id) {
                children.push(child_id);
            }
            lineage.push(LineageRecord {
                parent: parent_smiles.clone(),
                child,
                operator,
                generation,
            });
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let pool = sort_by_smiles(library, parents.iter().chain(&children).copied());
    info!(
        parents = parents.len(),
        children = children.len(),
        pool = pool.len(),
        "Mutation complete."
    );
    debug!(lineage = lineage.len(), "Lineage records produced.");
    reporter.report(Progress::PhaseFinish);

    MutationOutcome {
        pool,
        lineage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::corpus::tests::corpus;
    use crate::engine::tasks::donor_index;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn canon(s: &str) -> String {
        chem::canonicalize(s).unwrap()
    }

    #[test]
    fn alkylation_substitutes_an_aromatic_ch() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            mutate("c1ccccc1", MutationOperator::MethylAddition, &mut rng),
            Some(canon("Cc1ccccc1"))
        );
        assert_eq!(
            mutate("C1=CC=CC=C1", MutationOperator::EthylAddition, &mut rng),
            Some(canon("CCc1ccccc1"))
        );
        assert_eq!(
            mutate("c1ccccc1", MutationOperator::IsopropylAddition, &mut rng),
            Some(canon("CC(C)c1ccccc1"))
        );
    }

    #[test]
    fn alkylation_picks_one_of_the_ring_positions() {
        let allowed = [canon("Cc1ccccn1"), canon("Cc1cccnc1"), canon("Cc1ccncc1")];
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let child = mutate("c1ccncc1", MutationOperator::MethylAddition, &mut rng).unwrap();
            assert!(allowed.contains(&child), "{child}");
        }
    }

    #[test]
    fn alkylation_needs_an_aromatic_ch() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(mutate("CCO", MutationOperator::MethylAddition, &mut rng), None);
        assert_eq!(mutate("C1CCCCC1", MutationOperator::MethylAddition, &mut rng), None);
    }

    #[test]
    fn heteroatom_substitution_follows_the_replacement_table() {
        let allowed = [canon("CSC"), canon("C[Se]C")];
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let child = mutate("COC", MutationOperator::AtomTypeSubstitution, &mut rng).unwrap();
            assert!(allowed.contains(&child), "{child}");
        }
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            mutate("CN(C)C", MutationOperator::AtomTypeSubstitution, &mut rng),
            Some(canon("CP(C)C"))
        );
    }

    #[test]
    fn atoms_bonded_to_donors_are_never_mutated() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(mutate("NO", MutationOperator::AtomTypeSubstitution, &mut rng), None);
        assert_eq!(mutate("NCl", MutationOperator::HalogenExchange, &mut rng), None);
        assert_eq!(mutate("CCC", MutationOperator::AtomTypeSubstitution, &mut rng), None);
    }

    #[test]
    fn halogen_exchange_picks_a_different_halogen() {
        let allowed = [canon("Fc1ccccc1"), canon("Brc1ccccc1"), canon("Ic1ccccc1")];
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let child = mutate("Clc1ccccc1", MutationOperator::HalogenExchange, &mut rng).unwrap();
            assert!(allowed.contains(&child), "{child}");
        }
    }

    #[test]
    fn unreadable_parents_yield_nothing() {
        let mut rng = StdRng::seed_from_u64(0);
        for operator in MutationOperator::ALL {
            assert_eq!(mutate("c1cc", operator, &mut rng), None);
        }
    }

    #[test]
    fn children_inherit_parent_modes_and_are_recorded() {
        let mut library = LigandLibrary::new();
        let parent = library.insert("c1ccncc1", [1, 2], LigandOrigin::Corpus);
        let mut rng = StdRng::seed_from_u64(42);

        let outcome = run(
            &[parent],
            &mut library,
            &MutationOperator::ALL,
            3,
            &mut rng,
            &ProgressReporter::new(),
        );

        // Three alkylations and the N -> P swap; pyridine has no halogen.
        assert_eq!(outcome.lineage.len(), 4);
        assert_eq!(outcome.pool.len(), 5);
        for record in &outcome.lineage {
            let child = library.id_of(&record.child).unwrap();
            assert!(outcome.pool.contains(&child));
            let ligand = library.get(child).unwrap();
            assert_eq!(ligand.donor_modes().iter().copied().collect::<Vec<_>>(), vec![1, 2]);
            assert_eq!(ligand.origin(), LigandOrigin::Mutation { generation: 3 });
        }
        assert!(outcome.lineage.iter().all(|r| r.parent == "c1ccncc1" && r.generation == 3));
        let phosphinine = canon("c1ccpcc1");
        assert!(outcome.lineage.iter().any(|r| {
            r.operator == MutationOperator::AtomTypeSubstitution && r.child == phosphinine
        }));
    }

    #[test]
    fn identical_seeds_give_identical_lineage() {
        let build = || {
            let mut library = LigandLibrary::new();
            let a = library.insert("Clc1ccncc1", [1], LigandOrigin::Corpus);
            let b = library.insert("COc1ccccc1", [2], LigandOrigin::Corpus);
            let mut rng = StdRng::seed_from_u64(9);
            run(
                &[b, a],
                &mut library,
                &MutationOperator::ALL,
                1,
                &mut rng,
                &ProgressReporter::new(),
            )
            .lineage
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn parents_combine_anchors_and_remembered_ligands() {
        let corpus = corpus(&[
            "a,c1ccncc1,X,X,X,X,X,1,,,,,,,,,,,,-182.0,0.1",
            "b,O,X,X,X,X,X,1,,,,,,,,,,,,-100.0,0.1",
            "c,CC#N,X,X,X,X,X,1,,,,,,,,,,,,-175.0,0.1",
        ]);
        let index = donor_index::run(&corpus, &ProgressReporter::new());
        let mut library = index.library().clone();
        let remembered = library.insert("Cc1ccccn1", [1], LigandOrigin::Elite);

        let parents = select_parents(&corpus, &index, &library, -180.0, 2, &[remembered]);
        let smiles: Vec<&str> = parents
            .iter()
            .map(|&id| library.get(id).unwrap().smiles())
            .collect();
        let mut expected = vec![canon("CC#N"), canon("Cc1ccccn1"), canon("c1ccncc1")];
        expected.sort();
        assert_eq!(smiles, expected);
    }
}
