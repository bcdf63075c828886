use super::element::Element;
use super::molecule::{Atom, BondOrder, Chirality, Molecule, NeighborRef};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid SMILES at position {position}: {kind}")]
pub struct SmilesError {
    pub position: usize,
    pub kind: SmilesErrorKind,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmilesErrorKind {
    #[error("empty input")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unknown element '{0}'")]
    UnknownElement(String),
    #[error("element '{0}' cannot be aromatic")]
    NonAromaticElement(String),
    #[error("unclosed bracket atom")]
    UnclosedBracket,
    #[error("unsupported chirality class")]
    UnsupportedChirality,
    #[error("branch opened without a preceding atom")]
    BranchWithoutAtom,
    #[error("unmatched ')'")]
    UnmatchedBranchClose,
    #[error("unclosed branch")]
    UnclosedBranch,
    #[error("ring closure {0} is never closed")]
    UnclosedRing(u16),
    #[error("ring closure {0} joins an atom to itself or to an existing neighbour")]
    InvalidRingBond(u16),
    #[error("ring closure {0} has conflicting bond symbols")]
    ConflictingRingBond(u16),
    #[error("bond symbol is not followed by an atom")]
    DanglingBond,
    #[error("number out of range")]
    NumberOutOfRange,
}

/// Parses a SMILES string into a [`Molecule`].
///
/// Supports the organic subset, bracket atoms (isotope, chirality `@`/`@@`,
/// hydrogen count, charge, atom class), all bond symbols, branches, ring
/// closures (`0`-`9`, `%nn`) and dot-separated fragments. Directional bonds
/// are read as plain single bonds. Explicit `[H]` atoms singly bonded to a
/// heavy atom are folded into that atom's hydrogen count.
pub fn parse(input: &str) -> Result<Molecule, SmilesError> {
    Parser::new(input).run()
}

#[derive(Clone, Copy)]
struct RingOpening {
    atom: usize,
    bond: Option<BondOrder>,
    stereo_slot: usize,
    position: usize,
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    mol: Molecule,
    prev: Option<usize>,
    pending_bond: Option<(BondOrder, usize)>,
    branches: Vec<(usize, usize)>,
    rings: BTreeMap<u16, RingOpening>,
}

const PLACEHOLDER: NeighborRef = NeighborRef::Atom(usize::MAX);

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
            mol: Molecule::new(),
            prev: None,
            pending_bond: None,
            branches: Vec::new(),
            rings: BTreeMap::new(),
        }
    }

    fn error(&self, kind: SmilesErrorKind) -> SmilesError {
        SmilesError {
            position: self.pos,
            kind,
        }
    }

    fn error_at(position: usize, kind: SmilesErrorKind) -> SmilesError {
        SmilesError { position, kind }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn unexpected(&self) -> SmilesError {
        match self.peek() {
            Some(b) => self.error(SmilesErrorKind::UnexpectedCharacter(b as char)),
            None => self.error(SmilesErrorKind::UnexpectedEnd),
        }
    }

    fn run(mut self) -> Result<Molecule, SmilesError> {
        if self.bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(self.error(SmilesErrorKind::Empty));
        }
        if !self.bytes.is_ascii() {
            let position = self.bytes.iter().position(|b| !b.is_ascii()).unwrap_or(0);
            return Err(Self::error_at(position, SmilesErrorKind::UnexpectedCharacter('?')));
        }

        while let Some(byte) = self.peek() {
            match byte {
                b'(' => {
                    let prev = self
                        .prev
                        .ok_or_else(|| self.error(SmilesErrorKind::BranchWithoutAtom))?;
                    if self.pending_bond.is_some() {
                        return Err(self.error(SmilesErrorKind::DanglingBond));
                    }
                    self.branches.push((prev, self.pos));
                    self.pos += 1;
                }
                b')' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(SmilesErrorKind::DanglingBond));
                    }
                    let (atom, _) = self
                        .branches
                        .pop()
                        .ok_or_else(|| self.error(SmilesErrorKind::UnmatchedBranchClose))?;
                    self.prev = Some(atom);
                    self.pos += 1;
                }
                b'.' => {
                    if self.pending_bond.is_some() {
                        return Err(self.error(SmilesErrorKind::DanglingBond));
                    }
                    self.prev = None;
                    self.pos += 1;
                }
                b'-' | b'=' | b'#' | b'$' | b':' | b'/' | b'\\' => {
                    if self.pending_bond.is_some() || self.prev.is_none() {
                        return Err(self.unexpected());
                    }
                    let order = match byte {
                        b'=' => BondOrder::Double,
                        b'#' => BondOrder::Triple,
                        b'$' => BondOrder::Quadruple,
                        b':' => BondOrder::Aromatic,
                        _ => BondOrder::Single,
                    };
                    self.pending_bond = Some((order, self.pos));
                    self.pos += 1;
                }
                b'0'..=b'9' | b'%' => self.ring_closure()?,
                b'[' => {
                    let atom = self.bracket_atom()?;
                    self.attach(atom)?;
                }
                b' ' | b'\t' | b'\n' | b'\r' => break,
                _ => {
                    let atom = self.organic_atom()?;
                    self.attach(atom)?;
                }
            }
        }

        if let Some(b) = self.bytes[self.pos..].iter().find(|b| !b.is_ascii_whitespace()) {
            return Err(self.error(SmilesErrorKind::UnexpectedCharacter(*b as char)));
        }
        if let Some((_, position)) = self.pending_bond {
            return Err(Self::error_at(position, SmilesErrorKind::DanglingBond));
        }
        if let Some(&(_, position)) = self.branches.last() {
            return Err(Self::error_at(position, SmilesErrorKind::UnclosedBranch));
        }
        if let Some((&label, opening)) = self.rings.iter().next() {
            return Err(Self::error_at(
                opening.position,
                SmilesErrorKind::UnclosedRing(label),
            ));
        }
        if self.mol.is_empty() {
            return Err(Self::error_at(0, SmilesErrorKind::Empty));
        }

        for index in 0..self.mol.atom_count() {
            if let Some(atom) = self.mol.atom_mut(index) {
                if atom.chirality == Chirality::None {
                    atom.stereo_order.clear();
                }
            }
        }
        Ok(self.mol.fold_explicit_hydrogens())
    }

    fn implicit_order(&self, a: usize, b: usize) -> BondOrder {
        let aromatic = |i: usize| self.mol.atom(i).is_some_and(|atom| atom.aromatic);
        if aromatic(a) && aromatic(b) {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        }
    }

    fn attach(&mut self, atom: Atom) -> Result<(), SmilesError> {
        let has_h = atom.bracket_h.unwrap_or(0) > 0;
        let index = self.mol.add_atom(atom);
        let bond = self.pending_bond.take();
        if let Some(prev) = self.prev {
            let order = bond
                .map(|(order, _)| order)
                .unwrap_or_else(|| self.implicit_order(prev, index));
            self.mol.add_bond(prev, index, order);
            self.push_stereo(prev, NeighborRef::Atom(index));
            self.push_stereo(index, NeighborRef::Atom(prev));
        }
        if has_h {
            self.push_stereo(index, NeighborRef::ImplicitH);
        }
        self.prev = Some(index);
        Ok(())
    }

    fn push_stereo(&mut self, atom: usize, neighbor: NeighborRef) -> usize {
        match self.mol.atom_mut(atom) {
            Some(atom) => {
                atom.stereo_order.push(neighbor);
                atom.stereo_order.len() - 1
            }
            None => 0,
        }
    }

    fn read_number(&mut self, max_digits: usize) -> Option<u32> {
        let start = self.pos;
        while self.pos - start < max_digits && self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse().ok())
    }

    fn ring_closure(&mut self) -> Result<(), SmilesError> {
        let start = self.pos;
        let atom = self.prev.ok_or_else(|| self.unexpected())?;
        let label = if self.peek() == Some(b'%') {
            self.pos += 1;
            if !(self.peek().is_some_and(|b| b.is_ascii_digit())
                && self.peek_at(1).is_some_and(|b| b.is_ascii_digit()))
            {
                return Err(self.unexpected());
            }
            self.read_number(2).unwrap_or(0) as u16
        } else {
            self.read_number(1).unwrap_or(0) as u16
        };
        let bond = self.pending_bond.take().map(|(order, _)| order);

        match self.rings.remove(&label) {
            None => {
                let stereo_slot = self.push_stereo(atom, PLACEHOLDER);
                self.rings.insert(
                    label,
                    RingOpening {
                        atom,
                        bond,
                        stereo_slot,
                        position: start,
                    },
                );
            }
            Some(opening) => {
                if opening.atom == atom || self.mol.bond_between(opening.atom, atom).is_some() {
                    return Err(Self::error_at(start, SmilesErrorKind::InvalidRingBond(label)));
                }
                let order = match (opening.bond, bond) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(Self::error_at(
                            start,
                            SmilesErrorKind::ConflictingRingBond(label),
                        ));
                    }
                    (Some(order), _) | (None, Some(order)) => order,
                    (None, None) => self.implicit_order(opening.atom, atom),
                };
                self.mol.add_bond(opening.atom, atom, order);
                if let Some(opener) = self.mol.atom_mut(opening.atom) {
                    if let Some(slot) = opener.stereo_order.get_mut(opening.stereo_slot) {
                        *slot = NeighborRef::Atom(atom);
                    }
                }
                self.push_stereo(atom, NeighborRef::Atom(opening.atom));
            }
        }
        Ok(())
    }

    fn organic_atom(&mut self) -> Result<Atom, SmilesError> {
        let start = self.pos;
        let byte = self.peek().ok_or_else(|| self.unexpected())?;
        let atom = match byte {
            b'*' => Atom::new(Element::WILDCARD),
            b'C' if self.peek_at(1) == Some(b'l') => {
                self.pos += 1;
                Atom::new(Element::CHLORINE)
            }
            b'B' if self.peek_at(1) == Some(b'r') => {
                self.pos += 1;
                Atom::new(Element::BROMINE)
            }
            b'B' => Atom::new(Element::BORON),
            b'C' => Atom::new(Element::CARBON),
            b'N' => Atom::new(Element::NITROGEN),
            b'O' => Atom::new(Element::OXYGEN),
            b'P' => Atom::new(Element::PHOSPHORUS),
            b'S' => Atom::new(Element::SULFUR),
            b'F' => Atom::new(Element::FLUORINE),
            b'I' => Atom::new(Element::IODINE),
            b'b' => Atom::aromatic(Element::BORON),
            b'c' => Atom::aromatic(Element::CARBON),
            b'n' => Atom::aromatic(Element::NITROGEN),
            b'o' => Atom::aromatic(Element::OXYGEN),
            b'p' => Atom::aromatic(Element::PHOSPHORUS),
            b's' => Atom::aromatic(Element::SULFUR),
            _ => return Err(Self::error_at(start, SmilesErrorKind::UnexpectedCharacter(byte as char))),
        };
        self.pos += 1;
        Ok(atom)
    }

    fn bracket_atom(&mut self) -> Result<Atom, SmilesError> {
        let open = self.pos;
        self.pos += 1;

        let isotope = match self.read_number(4) {
            Some(value) => Some(
                u16::try_from(value).map_err(|_| self.error(SmilesErrorKind::NumberOutOfRange))?,
            ),
            None => None,
        };

        let mut atom = self.bracket_element()?;
        atom.isotope = isotope;

        if self.peek() == Some(b'@') {
            self.pos += 1;
            atom.chirality = if self.peek() == Some(b'@') {
                self.pos += 1;
                Chirality::Clockwise
            } else {
                Chirality::CounterClockwise
            };
            if self.peek().is_some_and(|b| b.is_ascii_uppercase() && b != b'H') {
                return Err(self.error(SmilesErrorKind::UnsupportedChirality));
            }
        }

        let mut hydrogens = 0u8;
        if self.peek() == Some(b'H') {
            self.pos += 1;
            hydrogens = match self.read_number(1) {
                Some(count) => count as u8,
                None => 1,
            };
        }
        atom.bracket_h = Some(hydrogens);

        atom.charge = self.bracket_charge()?;

        if self.peek() == Some(b':') {
            self.pos += 1;
            if self.read_number(6).is_none() {
                return Err(self.unexpected());
            }
        }

        match self.peek() {
            Some(b']') => {
                self.pos += 1;
                Ok(atom)
            }
            None => Err(Self::error_at(open, SmilesErrorKind::UnclosedBracket)),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn bracket_element(&mut self) -> Result<Atom, SmilesError> {
        let start = self.pos;
        let first = self.peek().ok_or_else(|| Self::error_at(start, SmilesErrorKind::UnclosedBracket))?;

        if first == b'*' {
            self.pos += 1;
            return Ok(Atom::new(Element::WILDCARD));
        }

        if first.is_ascii_lowercase() {
            // Two-letter aromatic symbols take precedence over their one-letter prefix.
            for len in [2usize, 1] {
                let Some(slice) = self.bytes.get(start..start + len) else {
                    continue;
                };
                let Ok(text) = std::str::from_utf8(slice) else {
                    continue;
                };
                if !slice.iter().all(|b| b.is_ascii_lowercase()) {
                    continue;
                }
                let mut symbol = text.to_string();
                symbol[..1].make_ascii_uppercase();
                if let Some(element) = Element::from_symbol(&symbol) {
                    if !element.can_be_aromatic() {
                        if len == 1 {
                            return Err(Self::error_at(
                                start,
                                SmilesErrorKind::NonAromaticElement(text.to_string()),
                            ));
                        }
                        continue;
                    }
                    self.pos += len;
                    return Ok(Atom::aromatic(element));
                }
            }
            return Err(Self::error_at(
                start,
                SmilesErrorKind::UnknownElement((first as char).to_string()),
            ));
        }

        if !first.is_ascii_uppercase() {
            return Err(self.unexpected());
        }

        if let Some(second) = self.peek_at(1).filter(u8::is_ascii_lowercase) {
            let symbol: String = [first as char, second as char].iter().collect();
            if let Some(element) = Element::from_symbol(&symbol) {
                self.pos += 2;
                return Ok(Atom::new(element));
            }
        }
        let symbol = (first as char).to_string();
        let element = Element::from_symbol(&symbol)
            .ok_or_else(|| Self::error_at(start, SmilesErrorKind::UnknownElement(symbol)))?;
        self.pos += 1;
        Ok(Atom::new(element))
    }

    fn bracket_charge(&mut self) -> Result<i8, SmilesError> {
        let sign: i8 = match self.peek() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return Ok(0),
        };
        let symbol = self.peek();
        self.pos += 1;
        if let Some(magnitude) = self.read_number(2) {
            let magnitude =
                i8::try_from(magnitude).map_err(|_| self.error(SmilesErrorKind::NumberOutOfRange))?;
            return Ok(sign * magnitude);
        }
        let mut magnitude = 1i8;
        while self.peek() == symbol {
            self.pos += 1;
            magnitude += 1;
        }
        Ok(sign * magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_branches_and_ring_closures() {
        let mol = parse("CC(=O)Oc1ccccc1").unwrap();
        assert_eq!(mol.atom_count(), 10);
        assert_eq!(mol.bond_count(), 10);
        let carbonyl = mol.bond_between(1, 2).unwrap();
        assert_eq!(mol.bond(carbonyl).unwrap().order, BondOrder::Double);
        let closure = mol.bond_between(4, 9).unwrap();
        assert_eq!(mol.bond(closure).unwrap().order, BondOrder::Aromatic);
    }

    #[test]
    fn parses_two_letter_organic_atoms() {
        let mol = parse("ClCBr").unwrap();
        let symbols: Vec<_> = mol.atoms().iter().map(|a| a.element.symbol()).collect();
        assert_eq!(symbols, vec!["Cl", "C", "Br"]);
    }

    #[test]
    fn parses_bracket_atom_fields() {
        let mol = parse("[13CH2-:7]O").unwrap();
        let atom = mol.atom(0).unwrap();
        assert_eq!(atom.isotope, Some(13));
        assert_eq!(atom.bracket_h, Some(2));
        assert_eq!(atom.charge, -1);
        let mol = parse("[NH4+]").unwrap();
        assert_eq!(mol.atom(0).unwrap().charge, 1);
        let mol = parse("[Fe++]").unwrap();
        assert_eq!(mol.atom(0).unwrap().charge, 2);
    }

    #[test]
    fn parses_aromatic_selenium_and_wildcard() {
        let mol = parse("c1cc[se]c1").unwrap();
        let se = mol.atom(3).unwrap();
        assert_eq!(se.element, Element::SELENIUM);
        assert!(se.aromatic);
        assert_eq!(parse("*C").unwrap().atom(0).unwrap().element, Element::WILDCARD);
    }

    #[test]
    fn percent_ring_labels_and_explicit_ring_bonds() {
        let mol = parse("C%10CCC=%10").unwrap();
        let bond = mol.bond_between(0, 3).unwrap();
        assert_eq!(mol.bond(bond).unwrap().order, BondOrder::Double);
    }

    #[test]
    fn directional_bonds_read_as_single() {
        let mol = parse("F/C=C/F").unwrap();
        assert_eq!(mol.bond(0).unwrap().order, BondOrder::Single);
        assert_eq!(mol.bond(1).unwrap().order, BondOrder::Double);
    }

    #[test]
    fn dot_separates_fragments() {
        let mol = parse("[Na+].[Cl-]").unwrap();
        assert_eq!(mol.bond_count(), 0);
        assert_eq!(mol.fragments().len(), 2);
    }

    #[test]
    fn chirality_records_neighbor_order_with_implicit_h() {
        let mol = parse("N[C@@H](C)C(=O)O").unwrap();
        let center = mol.atom(1).unwrap();
        assert_eq!(center.chirality, Chirality::Clockwise);
        assert_eq!(
            center.stereo_order,
            vec![
                NeighborRef::Atom(0),
                NeighborRef::ImplicitH,
                NeighborRef::Atom(2),
                NeighborRef::Atom(3)
            ]
        );
    }

    #[test]
    fn chirality_ring_closure_keeps_digit_position() {
        let mol = parse("[C@]1(F)(Cl)CC1").unwrap();
        let center = mol.atom(0).unwrap();
        assert_eq!(
            center.stereo_order,
            vec![
                NeighborRef::Atom(4),
                NeighborRef::Atom(1),
                NeighborRef::Atom(2),
                NeighborRef::Atom(3)
            ]
        );
    }

    #[test]
    fn explicit_hydrogen_atoms_are_folded() {
        let mol = parse("[H]OC").unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.atom(0).unwrap().element, Element::OXYGEN);
        assert_eq!(mol.atom(0).unwrap().bracket_h, None);
    }

    #[test]
    fn rejects_malformed_input() {
        let cases = [
            ("", SmilesErrorKind::Empty),
            ("C1CC", SmilesErrorKind::UnclosedRing(1)),
            ("C(C", SmilesErrorKind::UnclosedBranch),
            ("CC)", SmilesErrorKind::UnmatchedBranchClose),
            ("CC=", SmilesErrorKind::DanglingBond),
            ("[Xx]", SmilesErrorKind::UnknownElement("X".to_string())),
            ("C11", SmilesErrorKind::InvalidRingBond(1)),
            ("CQ", SmilesErrorKind::UnexpectedCharacter('Q')),
        ];
        for (input, expected) in cases {
            let err = parse(input).unwrap_err();
            assert_eq!(err.kind, expected, "input {input:?}");
        }
        assert!(matches!(
            parse("[CH3").unwrap_err().kind,
            SmilesErrorKind::UnclosedBracket | SmilesErrorKind::UnexpectedEnd
        ));
    }
}
