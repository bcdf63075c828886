use super::element::Element;
use super::molecule::{BondOrder, Molecule};
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

const KEKULIZE_STEP_LIMIT: usize = 100_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Aromatic atom {atom} ({element}) is not in a ring")]
    AromaticOutsideRing { atom: usize, element: Element },
    #[error("Cannot kekulize the aromatic system containing atom {atom}")]
    Kekulize { atom: usize },
    #[error("Atom {atom} ({element}) has valence {valence}, above every allowed state")]
    Valence {
        atom: usize,
        element: Element,
        valence: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hybridization {
    Unspecified,
    S,
    Sp,
    Sp2,
    Sp3,
}

/// Per-atom properties derived by [`sanitize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomProperties {
    pub degree: u8,
    pub total_h: u8,
    /// Hydrogens supplied by the valence model. Always zero for bracket atoms.
    pub implicit_h: u8,
    /// Bond-order sum plus all hydrogens.
    pub valence: u8,
    pub hybridization: Hybridization,
    pub in_ring: bool,
}

/// A molecule that passed the valence model, with aromaticity re-perceived
/// from its Kekulé form.
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    molecule: Molecule,
    properties: Vec<AtomProperties>,
    kekule: Vec<BondOrder>,
    ring_bonds: Vec<bool>,
}

impl Sanitized {
    pub fn molecule(&self) -> &Molecule {
        &self.molecule
    }

    pub fn into_molecule(self) -> Molecule {
        self.molecule
    }

    pub fn properties(&self) -> &[AtomProperties] {
        &self.properties
    }

    pub fn atom_properties(&self, atom: usize) -> Option<&AtomProperties> {
        self.properties.get(atom)
    }

    /// Bond order of `bond` in the Kekulé structure. Never `Aromatic`.
    pub fn kekule_order(&self, bond: usize) -> Option<BondOrder> {
        self.kekule.get(bond).copied()
    }

    pub fn is_ring_bond(&self, bond: usize) -> bool {
        self.ring_bonds.get(bond).copied().unwrap_or(false)
    }
}

/// Validates valences, kekulises aromatic input and re-perceives aromaticity.
pub fn sanitize(molecule: Molecule) -> Result<Sanitized, SanitizeError> {
    let ring_bonds = molecule.ring_bonds();
    let in_ring = ring_atoms(&molecule, &ring_bonds);

    for (index, atom) in molecule.atoms().iter().enumerate() {
        if atom.aromatic && !in_ring[index] {
            return Err(SanitizeError::AromaticOutsideRing {
                atom: index,
                element: atom.element,
            });
        }
    }

    let kekule = kekulize(&molecule)?;
    let hydrogens = assign_hydrogens(&molecule, &kekule)?;

    let mut perceived = molecule;
    let aromatic = perceive_aromaticity(&perceived, &kekule, &ring_bonds, &hydrogens);
    for index in 0..perceived.atom_count() {
        if let Some(atom) = perceived.atom_mut(index) {
            atom.aromatic = aromatic.atoms[index];
        }
    }
    for (index, &order) in kekule.iter().enumerate() {
        if let Some(bond) = perceived.bond_mut(index) {
            bond.order = if aromatic.bonds[index] {
                BondOrder::Aromatic
            } else {
                order
            };
        }
    }

    let properties = (0..perceived.atom_count())
        .map(|index| {
            let (total_h, implicit_h) = hydrogens[index];
            AtomProperties {
                degree: perceived.degree(index) as u8,
                total_h,
                implicit_h,
                valence: explicit_valence(&perceived, &kekule, index) + implicit_h,
                hybridization: hybridization(&perceived, &kekule, index, total_h),
                in_ring: in_ring[index],
            }
        })
        .collect();

    Ok(Sanitized {
        molecule: perceived,
        properties,
        kekule,
        ring_bonds,
    })
}

fn ring_atoms(molecule: &Molecule, ring_bonds: &[bool]) -> Vec<bool> {
    let mut in_ring = vec![false; molecule.atom_count()];
    for (bond, _) in ring_bonds.iter().enumerate().filter(|&(_, &ring)| ring) {
        if let Some(bond) = molecule.bond(bond) {
            in_ring[bond.a] = true;
            in_ring[bond.b] = true;
        }
    }
    in_ring
}

fn order_valence(order: BondOrder) -> u8 {
    match order {
        BondOrder::Single | BondOrder::Aromatic => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Quadruple => 4,
    }
}

/// Sum of bond orders in the Kekulé structure plus bracket hydrogens.
fn explicit_valence(molecule: &Molecule, kekule: &[BondOrder], atom: usize) -> u8 {
    let bonds: u8 = molecule
        .neighbors(atom)
        .map(|(_, bond)| order_valence(kekule[bond]))
        .sum();
    let bracket = molecule
        .atom(atom)
        .and_then(|a| a.bracket_h)
        .unwrap_or(0);
    bonds + bracket
}

/// Whether an aromatic atom must take one double bond inside the aromatic
/// system. Aromatic bonds count as single here.
pub(crate) fn needs_pi_bond(molecule: &Molecule, atom: usize) -> bool {
    let Some(data) = molecule.atom(atom) else {
        return false;
    };
    if !data.aromatic {
        return false;
    }
    let Some(allowed) = data.element.allowed_valences(data.charge) else {
        return false;
    };
    let used: u8 = molecule
        .neighbors(atom)
        .filter_map(|(_, bond)| molecule.bond(bond))
        .map(|bond| bond.order.sigma_valence())
        .sum::<u8>()
        + data.bracket_h.unwrap_or(0);
    allowed
        .iter()
        .find(|&&v| v >= used)
        .is_some_and(|&v| v > used)
}

fn kekulize(molecule: &Molecule) -> Result<Vec<BondOrder>, SanitizeError> {
    let mut kekule: Vec<BondOrder> = molecule
        .bonds()
        .iter()
        .map(|bond| match bond.order {
            BondOrder::Aromatic => BondOrder::Single,
            other => other,
        })
        .collect();

    let needs: Vec<bool> = (0..molecule.atom_count())
        .map(|atom| needs_pi_bond(molecule, atom))
        .collect();
    if !needs.iter().any(|&n| n) {
        return Ok(kekule);
    }

    let candidate_bond = |bond: usize| -> bool {
        molecule.bond(bond).is_some_and(|b| {
            b.order == BondOrder::Aromatic && needs[b.a] && needs[b.b]
        })
    };

    let mut matched = vec![false; molecule.atom_count()];
    let mut doubles = Vec::new();
    let mut steps = 0usize;
    if !match_pi_bonds(
        molecule,
        &needs,
        &candidate_bond,
        &mut matched,
        &mut doubles,
        &mut steps,
    ) {
        let atom = needs.iter().position(|&n| n).unwrap_or(0);
        return Err(SanitizeError::Kekulize { atom });
    }

    for bond in doubles {
        kekule[bond] = BondOrder::Double;
    }
    Ok(kekule)
}

/// Backtracking perfect matching over atoms that need a π bond. Always
/// expands the unmatched atom with the fewest remaining partners.
fn match_pi_bonds(
    molecule: &Molecule,
    needs: &[bool],
    candidate_bond: &dyn Fn(usize) -> bool,
    matched: &mut [bool],
    doubles: &mut Vec<usize>,
    steps: &mut usize,
) -> bool {
    let mut best: Option<(usize, Vec<(usize, usize)>)> = None;
    for atom in 0..needs.len() {
        if !needs[atom] || matched[atom] {
            continue;
        }
        let options: Vec<(usize, usize)> = molecule
            .neighbors(atom)
            .filter(|&(neighbor, bond)| !matched[neighbor] && candidate_bond(bond))
            .collect();
        if options.is_empty() {
            return false;
        }
        if best.as_ref().is_none_or(|(_, current)| options.len() < current.len()) {
            best = Some((atom, options));
        }
    }

    let Some((atom, options)) = best else {
        return true;
    };

    for (neighbor, bond) in options {
        *steps += 1;
        if *steps > KEKULIZE_STEP_LIMIT {
            return false;
        }
        matched[atom] = true;
        matched[neighbor] = true;
        doubles.push(bond);
        if match_pi_bonds(molecule, needs, candidate_bond, matched, doubles, steps) {
            return true;
        }
        doubles.pop();
        matched[atom] = false;
        matched[neighbor] = false;
    }
    false
}

/// Returns `(total_h, implicit_h)` per atom.
fn assign_hydrogens(
    molecule: &Molecule,
    kekule: &[BondOrder],
) -> Result<Vec<(u8, u8)>, SanitizeError> {
    molecule
        .atoms()
        .iter()
        .enumerate()
        .map(|(index, atom)| {
            let valence = explicit_valence(molecule, kekule, index);
            let allowed = atom.element.allowed_valences(atom.charge);
            match (atom.bracket_h, allowed) {
                (Some(h), Some(allowed)) => {
                    let max = allowed.iter().copied().max().unwrap_or(0);
                    if valence > max {
                        return Err(SanitizeError::Valence {
                            atom: index,
                            element: atom.element,
                            valence,
                        });
                    }
                    Ok((h, 0))
                }
                (Some(h), None) => Ok((h, 0)),
                (None, Some(allowed)) => {
                    let target = allowed.iter().copied().find(|&v| v >= valence).ok_or(
                        SanitizeError::Valence {
                            atom: index,
                            element: atom.element,
                            valence,
                        },
                    )?;
                    let implicit = target - valence;
                    Ok((implicit, implicit))
                }
                (None, None) => Ok((0, 0)),
            }
        })
        .collect()
}

struct Aromaticity {
    atoms: Vec<bool>,
    bonds: Vec<bool>,
}

struct Cycle {
    atoms: Vec<usize>,
    bonds: Vec<usize>,
}

/// Shortest cycle through every ring bond, deduplicated by bond set.
fn ring_cycles(molecule: &Molecule, ring_bonds: &[bool]) -> Vec<Cycle> {
    let mut seen = BTreeSet::new();
    let mut cycles = Vec::new();
    for (index, _) in ring_bonds.iter().enumerate().filter(|&(_, &ring)| ring) {
        let Some(bond) = molecule.bond(index) else {
            continue;
        };
        let mut previous: Vec<Option<(usize, usize)>> = vec![None; molecule.atom_count()];
        let mut visited = vec![false; molecule.atom_count()];
        let mut queue = VecDeque::from([bond.a]);
        visited[bond.a] = true;
        while let Some(atom) = queue.pop_front() {
            if atom == bond.b {
                break;
            }
            for (neighbor, via) in molecule.neighbors(atom) {
                if via == index || !ring_bonds[via] || visited[neighbor] {
                    continue;
                }
                visited[neighbor] = true;
                previous[neighbor] = Some((atom, via));
                queue.push_back(neighbor);
            }
        }
        if !visited[bond.b] {
            continue;
        }

        let mut atoms = vec![bond.b];
        let mut bonds = vec![index];
        let mut cursor = bond.b;
        while let Some((prior, via)) = previous[cursor] {
            atoms.push(prior);
            bonds.push(via);
            cursor = prior;
        }
        let key: BTreeSet<usize> = bonds.iter().copied().collect();
        if seen.insert(key.into_iter().collect::<Vec<_>>()) {
            cycles.push(Cycle { atoms, bonds });
        }
    }
    cycles
}

/// π electrons an atom donates to a ring, or `None` if it cannot be part of
/// an aromatic ring.
fn pi_electrons(
    molecule: &Molecule,
    kekule: &[BondOrder],
    ring_bonds: &[bool],
    hydrogens: &[(u8, u8)],
    atom: usize,
) -> Option<u8> {
    let data = molecule.atom(atom)?;
    let mut ring_doubles = 0;
    let mut exocyclic_double: Option<usize> = None;
    for (neighbor, bond) in molecule.neighbors(atom) {
        match kekule[bond] {
            BondOrder::Triple | BondOrder::Quadruple => return None,
            BondOrder::Double if ring_bonds[bond] => ring_doubles += 1,
            BondOrder::Double => exocyclic_double = Some(neighbor),
            _ => {}
        }
    }
    match (ring_doubles, exocyclic_double) {
        (1, None) => return Some(1),
        (0, Some(partner)) => {
            let partner = molecule.atom(partner)?.element;
            return (partner != Element::CARBON).then_some(0);
        }
        (0, None) => {}
        _ => return None,
    }

    let connections = molecule.degree(atom) + hydrogens[atom].0 as usize;
    let element = data.element;
    match (element, data.charge, connections) {
        (e, 0, 3) if e == Element::NITROGEN || e == Element::PHOSPHORUS => Some(2),
        (e, 0, 3) if e.symbol() == "As" => Some(2),
        (e, 0, 2)
            if e == Element::OXYGEN
                || e == Element::SULFUR
                || e == Element::SELENIUM
                || e.symbol() == "Te" =>
        {
            Some(2)
        }
        (e, -1, 3) if e == Element::CARBON => Some(2),
        (e, -1, 2) if e == Element::NITROGEN => Some(2),
        (e, 1, 3) if e == Element::CARBON => Some(0),
        (e, 0, 3) if e == Element::BORON => Some(0),
        _ => None,
    }
}

fn is_huckel(electrons: u32) -> bool {
    electrons >= 2 && (electrons - 2) % 4 == 0
}

fn perceive_aromaticity(
    molecule: &Molecule,
    kekule: &[BondOrder],
    ring_bonds: &[bool],
    hydrogens: &[(u8, u8)],
) -> Aromaticity {
    let mut result = Aromaticity {
        atoms: vec![false; molecule.atom_count()],
        bonds: vec![false; molecule.bond_count()],
    };
    let electrons: Vec<Option<u8>> = (0..molecule.atom_count())
        .map(|atom| pi_electrons(molecule, kekule, ring_bonds, hydrogens, atom))
        .collect();

    let cycles: Vec<Cycle> = ring_cycles(molecule, ring_bonds)
        .into_iter()
        .filter(|cycle| cycle.atoms.iter().all(|&a| electrons[a].is_some()))
        .collect();
    let count = |atoms: &mut dyn Iterator<Item = usize>| -> u32 {
        atoms.map(|a| u32::from(electrons[a].unwrap_or(0))).sum()
    };

    let mut aromatic_cycles = vec![false; cycles.len()];
    for (index, cycle) in cycles.iter().enumerate() {
        aromatic_cycles[index] = is_huckel(count(&mut cycle.atoms.iter().copied()));
    }

    // Fused pairs that are not aromatic individually may be aromatic as a whole.
    for i in 0..cycles.len() {
        for j in (i + 1)..cycles.len() {
            if aromatic_cycles[i] && aromatic_cycles[j] {
                continue;
            }
            let shared = cycles[i]
                .bonds
                .iter()
                .filter(|b| cycles[j].bonds.contains(b))
                .count();
            if shared != 1 {
                continue;
            }
            let union: BTreeSet<usize> = cycles[i]
                .atoms
                .iter()
                .chain(cycles[j].atoms.iter())
                .copied()
                .collect();
            if is_huckel(count(&mut union.into_iter())) {
                aromatic_cycles[i] = true;
                aromatic_cycles[j] = true;
            }
        }
    }

    for (cycle, _) in cycles
        .iter()
        .zip(&aromatic_cycles)
        .filter(|&(_, &aromatic)| aromatic)
    {
        for &atom in &cycle.atoms {
            result.atoms[atom] = true;
        }
        for &bond in &cycle.bonds {
            result.bonds[bond] = true;
        }
    }
    result
}

fn hybridization(
    molecule: &Molecule,
    kekule: &[BondOrder],
    atom: usize,
    total_h: u8,
) -> Hybridization {
    let Some(data) = molecule.atom(atom) else {
        return Hybridization::Unspecified;
    };
    if data.element == Element::HYDROGEN {
        return Hybridization::S;
    }
    if data.element.allowed_valences(data.charge).is_none() {
        return Hybridization::Unspecified;
    }
    if data.aromatic {
        return Hybridization::Sp2;
    }
    let pi: u8 = molecule
        .neighbors(atom)
        .map(|(_, bond)| order_valence(kekule[bond]) - 1)
        .sum();
    match pi {
        0 => {}
        1 => return Hybridization::Sp2,
        _ => return Hybridization::Sp,
    }

    // Lone-pair atoms next to a π system are conjugated and planar.
    let lone_pair_donor = [Element::NITROGEN, Element::OXYGEN, Element::SULFUR]
        .contains(&data.element)
        && molecule.degree(atom) + (total_h as usize) < 4;
    let conjugated = molecule.neighbors(atom).any(|(neighbor, _)| {
        molecule.atom(neighbor).is_some_and(|n| n.aromatic)
            || molecule
                .neighbors(neighbor)
                .any(|(_, bond)| matches!(kekule[bond], BondOrder::Double | BondOrder::Triple))
    });
    if lone_pair_donor && conjugated {
        Hybridization::Sp2
    } else {
        Hybridization::Sp3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::smiles;

    fn sanitized(input: &str) -> Sanitized {
        sanitize(smiles::parse(input).unwrap()).unwrap()
    }

    #[test]
    fn benzene_kekulizes_into_alternating_bonds() {
        let mol = sanitized("c1ccccc1");
        let doubles = (0..6)
            .filter(|&b| mol.kekule_order(b) == Some(BondOrder::Double))
            .count();
        assert_eq!(doubles, 3);
        for props in mol.properties() {
            assert_eq!(props.total_h, 1);
            assert_eq!(props.implicit_h, 1);
            assert_eq!(props.hybridization, Hybridization::Sp2);
            assert!(props.in_ring);
        }
    }

    #[test]
    fn kekule_input_is_perceived_aromatic() {
        let mol = sanitized("C1=CC=CC=C1");
        assert!(mol.molecule().atoms().iter().all(|a| a.aromatic));
        assert!(mol.molecule().bonds().iter().all(|b| b.order == BondOrder::Aromatic));
    }

    #[test]
    fn pyrrole_nitrogen_keeps_its_hydrogen() {
        let mol = sanitized("c1cc[nH]c1");
        let n = mol.atom_properties(3).unwrap();
        assert_eq!(n.total_h, 1);
        assert_eq!(n.implicit_h, 0);
        assert!(mol.molecule().atom(3).unwrap().aromatic);
    }

    #[test]
    fn pyridone_and_thiophene_are_aromatic() {
        assert!(sanitized("O=c1cccc[nH]1").molecule().atom(1).unwrap().aromatic);
        assert!(sanitized("c1ccsc1").molecule().atoms().iter().all(|a| a.aromatic));
    }

    #[test]
    fn cyclohexene_is_not_aromatic() {
        let mol = sanitized("C1=CCCCC1");
        assert!(mol.molecule().atoms().iter().all(|a| !a.aromatic));
        assert_eq!(mol.atom_properties(2).unwrap().total_h, 2);
    }

    #[test]
    fn naphthalene_is_aromatic_in_both_rings() {
        let mol = sanitized("C1=CC=C2C=CC=CC2=C1");
        assert!(mol.molecule().atoms().iter().all(|a| a.aromatic));
    }

    #[test]
    fn implicit_hydrogens_fill_lowest_valence() {
        let mol = sanitized("CS(=O)(=O)C");
        assert_eq!(mol.atom_properties(0).unwrap().total_h, 3);
        assert_eq!(mol.atom_properties(1).unwrap().total_h, 0);
        assert_eq!(mol.atom_properties(1).unwrap().valence, 6);
    }

    #[test]
    fn rejects_hypervalent_carbon() {
        let err = sanitize(smiles::parse("C(C)(C)(C)(C)C").unwrap()).unwrap_err();
        assert!(matches!(err, SanitizeError::Valence { atom: 0, .. }));
        let err = sanitize(smiles::parse("[CH5]").unwrap()).unwrap_err();
        assert!(matches!(err, SanitizeError::Valence { .. }));
    }

    #[test]
    fn rejects_unkekulizable_and_acyclic_aromatics() {
        assert!(matches!(
            sanitize(smiles::parse("c1cccc1").unwrap()).unwrap_err(),
            SanitizeError::Kekulize { .. }
        ));
        assert!(matches!(
            sanitize(smiles::parse("cC").unwrap()).unwrap_err(),
            SanitizeError::AromaticOutsideRing { atom: 0, .. }
        ));
    }

    #[test]
    fn amide_nitrogen_is_conjugated() {
        let mol = sanitized("CC(=O)N");
        assert_eq!(mol.atom_properties(3).unwrap().hybridization, Hybridization::Sp2);
        assert_eq!(mol.atom_properties(0).unwrap().hybridization, Hybridization::Sp3);
    }
}
