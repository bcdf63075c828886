use super::element::Element;
use super::molecule::{BondOrder, Chirality, Molecule, NeighborRef};
use super::sanitize::Sanitized;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Writes the canonical SMILES of a sanitised molecule.
///
/// Atoms are ranked by iterative refinement of local invariants with
/// deterministic tie breaking, and the graph is emitted depth first from the
/// lowest-ranked atom of each fragment with branches in rank order.
pub fn to_smiles(sanitized: &Sanitized) -> String {
    let molecule = sanitized.molecule();
    if molecule.is_empty() {
        return String::new();
    }
    let ranks = canonical_ranks(sanitized);
    let traversal = Traversal::build(molecule, &ranks);
    let mut writer = Writer {
        sanitized,
        traversal: &traversal,
        emitted: vec![false; molecule.atom_count()],
        open_rings: BTreeMap::new(),
        digits_in_use: [false; 100],
        out: String::new(),
    };
    for (index, &root) in traversal.roots.iter().enumerate() {
        if index > 0 {
            writer.out.push('.');
        }
        writer.emit(root, None);
    }
    writer.out
}

fn bond_code(order: BondOrder) -> u8 {
    match order {
        BondOrder::Single => 1,
        BondOrder::Double => 2,
        BondOrder::Triple => 3,
        BondOrder::Quadruple => 4,
        BondOrder::Aromatic => 5,
    }
}

fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let mut ranks = vec![0; keys.len()];
    let mut rank = 0;
    for (position, &atom) in order.iter().enumerate() {
        if position > 0 && keys[atom] != keys[order[position - 1]] {
            rank += 1;
        }
        ranks[atom] = rank;
    }
    ranks
}

fn class_count(ranks: &[usize]) -> usize {
    ranks.iter().max().map_or(0, |&max| max + 1)
}

fn refine(molecule: &Molecule, mut ranks: Vec<usize>) -> Vec<usize> {
    loop {
        let classes = class_count(&ranks);
        let keys: Vec<(usize, Vec<(usize, u8)>)> = (0..molecule.atom_count())
            .map(|atom| {
                let mut environment: Vec<(usize, u8)> = molecule
                    .neighbors(atom)
                    .filter_map(|(neighbor, bond)| {
                        molecule
                            .bond(bond)
                            .map(|b| (ranks[neighbor], bond_code(b.order)))
                    })
                    .collect();
                environment.sort_unstable();
                (ranks[atom], environment)
            })
            .collect();
        let next = dense_ranks(&keys);
        if class_count(&next) == classes {
            return next;
        }
        ranks = next;
    }
}

fn canonical_ranks(sanitized: &Sanitized) -> Vec<usize> {
    let molecule = sanitized.molecule();
    let invariants: Vec<_> = molecule
        .atoms()
        .iter()
        .zip(sanitized.properties())
        .map(|(atom, props)| {
            (
                props.degree,
                atom.element.atomic_number(),
                atom.isotope.unwrap_or(0),
                atom.charge,
                props.total_h,
                atom.aromatic,
                props.in_ring,
            )
        })
        .collect();

    let mut ranks = refine(molecule, dense_ranks(&invariants));
    let atoms = molecule.atom_count();
    while class_count(&ranks) < atoms {
        let mut counts = vec![0usize; atoms];
        for &rank in &ranks {
            counts[rank] += 1;
        }
        let Some(tied) = counts.iter().position(|&count| count > 1) else {
            break;
        };
        let Some(chosen) = ranks.iter().position(|&rank| rank == tied) else {
            break;
        };
        let keys: Vec<usize> = ranks
            .iter()
            .enumerate()
            .map(|(atom, &rank)| if atom == chosen { 2 * rank } else { 2 * rank + 1 })
            .collect();
        ranks = refine(molecule, dense_ranks(&keys));
    }
    ranks
}

struct Traversal {
    roots: Vec<usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    closures: Vec<Vec<usize>>,
}

impl Traversal {
    fn build(molecule: &Molecule, ranks: &[usize]) -> Self {
        let atoms = molecule.atom_count();
        let mut traversal = Traversal {
            roots: Vec::new(),
            parent: vec![None; atoms],
            children: vec![Vec::new(); atoms],
            closures: vec![Vec::new(); atoms],
        };
        let mut visited = vec![false; atoms];
        let mut bond_used = vec![false; molecule.bond_count()];

        let mut fragments: Vec<usize> = molecule
            .fragments()
            .into_iter()
            .filter_map(|fragment| fragment.into_iter().min_by_key(|&atom| ranks[atom]))
            .collect();
        fragments.sort_by_key(|&root| ranks[root]);

        for root in fragments {
            traversal.roots.push(root);
            traversal.visit(molecule, ranks, root, &mut visited, &mut bond_used);
        }
        traversal
    }

    fn visit(
        &mut self,
        molecule: &Molecule,
        ranks: &[usize],
        atom: usize,
        visited: &mut [bool],
        bond_used: &mut [bool],
    ) {
        visited[atom] = true;
        let mut neighbors: Vec<(usize, usize)> = molecule.neighbors(atom).collect();
        neighbors.sort_by_key(|&(neighbor, _)| ranks[neighbor]);
        for (neighbor, bond) in neighbors {
            if bond_used[bond] {
                continue;
            }
            bond_used[bond] = true;
            if visited[neighbor] {
                self.closures[atom].push(neighbor);
                self.closures[neighbor].push(atom);
            } else {
                self.parent[neighbor] = Some(atom);
                self.children[atom].push(neighbor);
                self.visit(molecule, ranks, neighbor, visited, bond_used);
            }
        }
    }
}

struct Writer<'a> {
    sanitized: &'a Sanitized,
    traversal: &'a Traversal,
    emitted: Vec<bool>,
    open_rings: BTreeMap<usize, usize>,
    digits_in_use: [bool; 100],
    out: String,
}

impl Writer<'_> {
    fn molecule(&self) -> &Molecule {
        self.sanitized.molecule()
    }

    fn emit(&mut self, atom: usize, via: Option<usize>) {
        let traversal = self.traversal;
        if let Some(bond) = via {
            let symbol = self.bond_symbol(bond);
            self.out.push_str(symbol);
        }
        self.emitted[atom] = true;

        let mut written_order = Vec::new();
        if let Some(parent) = traversal.parent[atom] {
            written_order.push(NeighborRef::Atom(parent));
        }
        let total_h = self
            .sanitized
            .atom_properties(atom)
            .map_or(0, |props| props.total_h);
        for _ in 0..total_h {
            written_order.push(NeighborRef::ImplicitH);
        }

        let mut ring_text = String::new();
        let mut released = Vec::new();
        for &partner in &traversal.closures[atom] {
            written_order.push(NeighborRef::Atom(partner));
            let Some(bond) = self.molecule().bond_between(atom, partner) else {
                continue;
            };
            if self.emitted[partner] {
                if let Some(digit) = self.open_rings.remove(&bond) {
                    push_ring_digit(&mut ring_text, digit);
                    released.push(digit);
                }
            } else if let Some(digit) = (1..self.digits_in_use.len()).find(|&d| !self.digits_in_use[d]) {
                self.digits_in_use[digit] = true;
                self.open_rings.insert(bond, digit);
                ring_text.push_str(self.bond_symbol(bond));
                push_ring_digit(&mut ring_text, digit);
            }
        }
        written_order.extend(
            traversal.children[atom]
                .iter()
                .map(|&child| NeighborRef::Atom(child)),
        );

        let text = self.atom_text(atom, &written_order);
        self.out.push_str(&text);
        self.out.push_str(&ring_text);
        for digit in released {
            self.digits_in_use[digit] = false;
        }

        let children = &traversal.children[atom];
        let last = children.len().saturating_sub(1);
        for (index, &child) in children.iter().enumerate() {
            let bond = self.molecule().bond_between(atom, child);
            if index < last {
                self.out.push('(');
                self.emit(child, bond);
                self.out.push(')');
            } else {
                self.emit(child, bond);
            }
        }
    }

    fn bond_symbol(&self, bond: usize) -> &'static str {
        let molecule = self.molecule();
        let Some(data) = molecule.bond(bond) else {
            return "";
        };
        match data.order {
            BondOrder::Aromatic => "",
            BondOrder::Single => {
                let aromatic = |atom: usize| molecule.atom(atom).is_some_and(|a| a.aromatic);
                if aromatic(data.a) && aromatic(data.b) { "-" } else { "" }
            }
            BondOrder::Double => "=",
            BondOrder::Triple => "#",
            BondOrder::Quadruple => "$",
        }
    }

    /// Hydrogens a reader would assign to this atom written without brackets.
    fn implied_hydrogens(&self, atom: usize) -> Option<u8> {
        let molecule = self.molecule();
        let data = molecule.atom(atom)?;
        if data.element == Element::WILDCARD {
            return Some(0);
        }
        let allowed = data.element.allowed_valences(0)?;
        let used: u8 = molecule
            .neighbors(atom)
            .filter_map(|(_, bond)| molecule.bond(bond))
            .map(|bond| bond.order.sigma_valence())
            .sum();
        let target = allowed.iter().copied().find(|&v| v >= used)?;
        if data.aromatic && target > used {
            Some(target - used - 1)
        } else {
            Some(target - used)
        }
    }

    fn written_chirality(&self, atom: usize, written_order: &[NeighborRef]) -> Chirality {
        let Some(data) = self.molecule().atom(atom) else {
            return Chirality::None;
        };
        if data.chirality == Chirality::None {
            return Chirality::None;
        }
        let reference = &data.stereo_order;
        let implicit = |order: &[NeighborRef]| {
            order.iter().filter(|n| **n == NeighborRef::ImplicitH).count()
        };
        if reference.len() != written_order.len()
            || implicit(reference) > 1
            || implicit(written_order) > 1
        {
            return Chirality::None;
        }
        let mut permutation = Vec::with_capacity(reference.len());
        for neighbor in written_order {
            match reference.iter().position(|r| r == neighbor) {
                Some(position) => permutation.push(position),
                None => return Chirality::None,
            }
        }
        let mut inversions = 0;
        for i in 0..permutation.len() {
            for j in (i + 1)..permutation.len() {
                if permutation[i] > permutation[j] {
                    inversions += 1;
                }
            }
        }
        if inversions % 2 == 0 {
            data.chirality
        } else {
            data.chirality.inverted()
        }
    }

    fn atom_text(&self, atom: usize, written_order: &[NeighborRef]) -> String {
        let Some(data) = self.molecule().atom(atom) else {
            return String::new();
        };
        let total_h = self
            .sanitized
            .atom_properties(atom)
            .map_or(0, |props| props.total_h);
        let chirality = self.written_chirality(atom, written_order);
        let symbol = if data.aromatic {
            data.element.symbol().to_ascii_lowercase()
        } else {
            data.element.symbol().to_string()
        };

        let bare_allowed = data.element.is_organic_subset() || data.element == Element::WILDCARD;
        if bare_allowed
            && chirality == Chirality::None
            && data.charge == 0
            && data.isotope.is_none()
            && self.implied_hydrogens(atom) == Some(total_h)
        {
            return symbol;
        }

        let mut text = String::from("[");
        if let Some(isotope) = data.isotope {
            let _ = write!(text, "{isotope}");
        }
        text.push_str(&symbol);
        match chirality {
            Chirality::CounterClockwise => text.push('@'),
            Chirality::Clockwise => text.push_str("@@"),
            Chirality::None => {}
        }
        match total_h {
            0 => {}
            1 => text.push('H'),
            n => {
                let _ = write!(text, "H{n}");
            }
        }
        match data.charge {
            0 => {}
            1 => text.push('+'),
            -1 => text.push('-'),
            c if c > 0 => {
                let _ = write!(text, "+{c}");
            }
            c => {
                let _ = write!(text, "-{}", -i16::from(c));
            }
        }
        text.push(']');
        text
    }
}

fn push_ring_digit(out: &mut String, digit: usize) {
    if digit < 10 {
        let _ = write!(out, "{digit}");
    } else {
        let _ = write!(out, "%{digit}");
    }
}
