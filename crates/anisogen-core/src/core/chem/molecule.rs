use super::element::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Valence consumed by one bond of this order before kekulisation.
    /// Aromatic bonds count as single; the π contribution is assigned later.
    #[inline]
    pub fn sigma_valence(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

/// Tetrahedral parity as written in SMILES, relative to the atom's
/// `stereo_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chirality {
    #[default]
    None,
    /// `@`
    CounterClockwise,
    /// `@@`
    Clockwise,
}

impl Chirality {
    pub fn inverted(self) -> Self {
        match self {
            Chirality::None => Chirality::None,
            Chirality::CounterClockwise => Chirality::Clockwise,
            Chirality::Clockwise => Chirality::CounterClockwise,
        }
    }
}

/// One entry of the neighbour ordering a chirality tag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborRef {
    Atom(usize),
    ImplicitH,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// Hydrogen count written inside a bracket atom. `None` for organic-subset
    /// atoms, whose hydrogens are implied by the valence model.
    pub bracket_h: Option<u8>,
    pub chirality: Chirality,
    pub stereo_order: Vec<NeighborRef>,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Self {
            element,
            aromatic: false,
            charge: 0,
            isotope: None,
            bracket_h: None,
            chirality: Chirality::None,
            stereo_order: Vec::new(),
        }
    }

    pub fn aromatic(element: Element) -> Self {
        Self {
            aromatic: true,
            ..Self::new(element)
        }
    }

    #[inline]
    pub fn is_bracket(&self) -> bool {
        self.bracket_h.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub a: usize,
    pub b: usize,
    pub order: BondOrder,
}

impl Bond {
    #[inline]
    pub fn other(&self, atom: usize) -> usize {
        if self.a == atom { self.b } else { self.a }
    }
}

/// An undirected molecular graph with hydrogens held as atom properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Molecule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    /// Adds a bond and returns its index, or `None` if either endpoint does not
    /// exist, the endpoints coincide, or the atoms are already bonded.
    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) -> Option<usize> {
        if a == b || a >= self.atoms.len() || b >= self.atoms.len() {
            return None;
        }
        if self.bond_between(a, b).is_some() {
            return None;
        }
        let index = self.bonds.len();
        self.bonds.push(Bond { a, b, order });
        self.adjacency[a].push((b, index));
        self.adjacency[b].push((a, index));
        Some(index)
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_mut(&mut self, index: usize) -> Option<&mut Atom> {
        self.atoms.get_mut(index)
    }

    pub fn bond(&self, index: usize) -> Option<&Bond> {
        self.bonds.get(index)
    }

    pub(crate) fn bond_mut(&mut self, index: usize) -> Option<&mut Bond> {
        self.bonds.get_mut(index)
    }

    /// Iterates `(neighbour_index, bond_index)` pairs in insertion order.
    pub fn neighbors(&self, atom: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adjacency
            .get(atom)
            .into_iter()
            .flat_map(|list| list.iter().copied())
    }

    #[inline]
    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency.get(atom).map_or(0, Vec::len)
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.neighbors(a)
            .find(|&(neighbor, _)| neighbor == b)
            .map(|(_, bond)| bond)
    }

    /// Connected components as sorted atom index lists, ordered by their
    /// lowest atom index.
    pub fn fragments(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.atoms.len()];
        let mut fragments = Vec::new();
        for start in 0..self.atoms.len() {
            if seen[start] {
                continue;
            }
            let mut stack = vec![start];
            let mut fragment = Vec::new();
            seen[start] = true;
            while let Some(atom) = stack.pop() {
                fragment.push(atom);
                for (neighbor, _) in self.neighbors(atom) {
                    if !seen[neighbor] {
                        seen[neighbor] = true;
                        stack.push(neighbor);
                    }
                }
            }
            fragment.sort_unstable();
            fragments.push(fragment);
        }
        fragments
    }

    /// Marks every bond that lies on at least one cycle.
    pub fn ring_bonds(&self) -> Vec<bool> {
        (0..self.bonds.len())
            .map(|index| self.bond_in_cycle(index))
            .collect()
    }

    fn bond_in_cycle(&self, index: usize) -> bool {
        let bond = self.bonds[index];
        let mut seen = vec![false; self.atoms.len()];
        let mut stack = vec![bond.a];
        seen[bond.a] = true;
        while let Some(atom) = stack.pop() {
            for (neighbor, via) in self.neighbors(atom) {
                if via == index || seen[neighbor] {
                    continue;
                }
                if neighbor == bond.b {
                    return true;
                }
                seen[neighbor] = true;
                stack.push(neighbor);
            }
        }
        false
    }

    /// Folds plain `[H]` atoms into the hydrogen count of the heavy atom they
    /// are singly bonded to, so hydrogens are always atom properties.
    ///
    /// Hydrogens carrying an isotope or a charge, bonded to another hydrogen,
    /// or with degree other than one are kept as graph atoms.
    pub fn fold_explicit_hydrogens(self) -> Molecule {
        let foldable: Vec<bool> = (0..self.atoms.len())
            .map(|index| {
                let atom = &self.atoms[index];
                if atom.element != Element::HYDROGEN
                    || atom.isotope.is_some()
                    || atom.charge != 0
                    || atom.bracket_h.unwrap_or(0) != 0
                    || self.degree(index) != 1
                {
                    return false;
                }
                self.neighbors(index).all(|(neighbor, bond)| {
                    self.atoms[neighbor].element != Element::HYDROGEN
                        && self.bonds[bond].order == BondOrder::Single
                })
            })
            .collect();

        if !foldable.iter().any(|&f| f) {
            return self;
        }

        let mut remap = vec![None; self.atoms.len()];
        let mut folded = Molecule::new();
        for (index, atom) in self.atoms.iter().enumerate() {
            if !foldable[index] {
                remap[index] = Some(folded.add_atom(atom.clone()));
            }
        }

        for (index, _) in self.atoms.iter().enumerate().filter(|&(i, _)| foldable[i]) {
            if let Some((heavy, _)) = self.neighbors(index).next() {
                // Organic-subset atoms recover the hydrogen through the valence model.
                if let Some(target) = remap[heavy].and_then(|i| folded.atom_mut(i)) {
                    if let Some(count) = target.bracket_h.as_mut() {
                        *count += 1;
                    }
                }
            }
        }

        for bond in &self.bonds {
            if let (Some(a), Some(b)) = (remap[bond.a], remap[bond.b]) {
                folded.add_bond(a, b, bond.order);
            }
        }

        for atom in &mut folded.atoms {
            for slot in &mut atom.stereo_order {
                if let NeighborRef::Atom(old) = *slot {
                    *slot = match remap[old] {
                        Some(new) => NeighborRef::Atom(new),
                        None => NeighborRef::ImplicitH,
                    };
                }
            }
        }
        folded
    }
}
