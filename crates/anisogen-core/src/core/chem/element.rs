use phf::{Map, Set, phf_map, phf_set};
use std::fmt;

static SYMBOLS: [&str; 104] = [
    "*", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr",
];

/// Allowed valence states, keyed by element symbol. Elements absent from this
/// table are not valence-checked and never receive implicit hydrogens.
static ALLOWED_VALENCES: Map<&'static str, &'static [u8]> = phf_map! {
    "H" => &[1],
    "B" => &[3],
    "C" => &[4],
    "N" => &[3],
    "O" => &[2],
    "F" => &[1],
    "Si" => &[4],
    "P" => &[3, 5, 7],
    "S" => &[2, 4, 6],
    "Cl" => &[1],
    "As" => &[3, 5, 7],
    "Se" => &[2, 4, 6],
    "Br" => &[1],
    "Te" => &[2, 4, 6],
    "I" => &[1, 3, 5],
};

/// Pauling electronegativities used by the node featuriser.
static PAULING_EN: Map<&'static str, f32> = phf_map! {
    "H" => 2.20, "C" => 2.55, "N" => 3.04, "O" => 3.44, "F" => 3.98,
    "P" => 2.19, "S" => 2.58, "Cl" => 3.16, "Br" => 2.96, "I" => 2.66,
    "B" => 2.04, "Si" => 1.90, "Se" => 2.55, "Zn" => 1.65, "Fe" => 1.83,
};

static ORGANIC_SUBSET: Set<&'static str> = phf_set! {
    "B", "C", "N", "O", "P", "S", "F", "Cl", "Br", "I",
};

static AROMATIC_CAPABLE: Set<&'static str> = phf_set! {
    "B", "C", "N", "O", "P", "S", "As", "Se", "Te",
};

/// A chemical element identified by its atomic number. Atomic number 0 is the
/// SMILES wildcard `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(u8);

impl Element {
    pub const WILDCARD: Element = Element(0);
    pub const HYDROGEN: Element = Element(1);
    pub const BORON: Element = Element(5);
    pub const CARBON: Element = Element(6);
    pub const NITROGEN: Element = Element(7);
    pub const OXYGEN: Element = Element(8);
    pub const FLUORINE: Element = Element(9);
    pub const PHOSPHORUS: Element = Element(15);
    pub const SULFUR: Element = Element(16);
    pub const CHLORINE: Element = Element(17);
    pub const SELENIUM: Element = Element(34);
    pub const BROMINE: Element = Element(35);
    pub const IODINE: Element = Element(53);

    pub fn from_atomic_number(z: u8) -> Option<Self> {
        ((z as usize) < SYMBOLS.len()).then_some(Element(z))
    }

    /// Looks up an element by its case-sensitive symbol (`"Cl"`, not `"CL"`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOLS
            .iter()
            .position(|&s| s == symbol)
            .map(|z| Element(z as u8))
    }

    #[inline]
    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self.0 as usize]
    }

    pub fn is_organic_subset(self) -> bool {
        ORGANIC_SUBSET.contains(self.symbol())
    }

    pub fn can_be_aromatic(self) -> bool {
        AROMATIC_CAPABLE.contains(self.symbol())
    }

    pub fn pauling_electronegativity(self) -> f32 {
        PAULING_EN.get(self.symbol()).copied().unwrap_or(0.0)
    }

    /// Returns the valence states available to this element carrying `charge`.
    ///
    /// Charged atoms take the valences of their isoelectronic neutral
    /// neighbour (N+ behaves as C, O- as F, ...). `None` means the element is
    /// outside the valence model.
    pub fn allowed_valences(self, charge: i8) -> Option<&'static [u8]> {
        if self == Element::WILDCARD {
            return None;
        }
        let effective = i16::from(self.0) - i16::from(charge);
        if !(1..SYMBOLS.len() as i16).contains(&effective) {
            return None;
        }
        ALLOWED_VALENCES.get(SYMBOLS[effective as usize]).copied()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_round_trip_through_atomic_numbers() {
        for symbol in ["C", "N", "Cl", "Se", "Br", "Co"] {
            let element = Element::from_symbol(symbol).unwrap();
            assert_eq!(element.symbol(), symbol);
        }
        assert_eq!(Element::from_symbol("Se"), Some(Element::SELENIUM));
        assert_eq!(Element::from_symbol("CL"), None);
    }

    #[test]
    fn charged_atoms_use_isoelectronic_valences() {
        assert_eq!(Element::NITROGEN.allowed_valences(0), Some(&[3u8][..]));
        assert_eq!(Element::NITROGEN.allowed_valences(1), Some(&[4u8][..]));
        assert_eq!(Element::OXYGEN.allowed_valences(-1), Some(&[1u8][..]));
        assert_eq!(Element::from_symbol("Co").unwrap().allowed_valences(0), None);
    }

    #[test]
    fn electronegativity_defaults_to_zero_for_unlisted_elements() {
        assert_eq!(Element::OXYGEN.pauling_electronegativity(), 3.44);
        assert_eq!(Element::from_symbol("Co").unwrap().pauling_electronegativity(), 0.0);
    }

    #[test]
    fn organic_subset_excludes_selenium() {
        assert!(Element::CHLORINE.is_organic_subset());
        assert!(!Element::SELENIUM.is_organic_subset());
        assert!(Element::SELENIUM.can_be_aromatic());
    }
}
