use super::element::Element;
use super::sanitize::{Hybridization, Sanitized};

const ITERATIONS: usize = 12;
/// Electronegativity of the hydrogen cation, used instead of `a + b + c`.
const HYDROGEN_CATION_EN: f64 = 20.02;

#[derive(Debug, Clone, Copy)]
struct Params {
    a: f64,
    b: f64,
    c: f64,
}

impl Params {
    const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    #[inline]
    fn electronegativity(&self, q: f64) -> f64 {
        self.a + self.b * q + self.c * q * q
    }

    #[inline]
    fn cation_electronegativity(&self) -> f64 {
        self.a + self.b + self.c
    }
}

const HYDROGEN: Params = Params::new(7.17, 6.24, -0.56);

fn params_for(element: Element, hybridization: Hybridization) -> Option<Params> {
    use Hybridization::*;
    let params = match (element.symbol(), hybridization) {
        ("H", _) => HYDROGEN,
        ("C", Sp3) => Params::new(7.98, 9.18, 1.88),
        ("C", Sp2) => Params::new(8.79, 9.32, 1.51),
        ("C", Sp) => Params::new(10.39, 9.45, 0.73),
        ("N", Sp3) => Params::new(11.54, 10.82, 1.36),
        ("N", Sp2) => Params::new(12.87, 11.15, 0.85),
        ("N", Sp) => Params::new(15.68, 11.70, -0.27),
        ("O", Sp3) => Params::new(14.18, 12.92, 1.39),
        ("O", Sp2) => Params::new(17.07, 13.79, 0.47),
        ("F", _) => Params::new(14.66, 13.85, 2.31),
        ("Cl", _) => Params::new(11.00, 9.69, 1.35),
        ("Br", _) => Params::new(10.08, 8.47, 1.16),
        ("I", _) => Params::new(9.90, 7.96, 0.96),
        ("S", Sp3) => Params::new(10.14, 9.13, 1.38),
        ("S", Sp2) => Params::new(10.88, 9.485, 1.325),
        ("P", Sp3) => Params::new(8.90, 8.24, 0.96),
        ("Si", Sp3) => Params::new(7.30, 6.567, 0.657),
        _ => return None,
    };
    Some(params)
}

/// Gasteiger–Marsili partial charges for every heavy atom.
///
/// Implicit hydrogens take part in the equalisation as pseudo-atoms; their
/// charge is not folded back into the heavy atom. If any atom has no
/// parameters, or the iteration produces a non-finite value, every charge is
/// zero.
pub fn gasteiger_charges(sanitized: &Sanitized) -> Vec<f32> {
    let molecule = sanitized.molecule();
    let heavy = molecule.atom_count();
    let zeros = vec![0.0; heavy];

    let mut params = Vec::with_capacity(heavy);
    let mut charges = Vec::with_capacity(heavy);
    for (atom, props) in molecule.atoms().iter().zip(sanitized.properties()) {
        let Some(p) = params_for(atom.element, props.hybridization) else {
            return zeros;
        };
        params.push(p);
        charges.push(f64::from(atom.charge));
    }

    let mut edges: Vec<(usize, usize)> = molecule.bonds().iter().map(|b| (b.a, b.b)).collect();
    for (index, props) in sanitized.properties().iter().enumerate() {
        for _ in 0..props.total_h {
            let h = params.len();
            params.push(HYDROGEN);
            charges.push(0.0);
            edges.push((index, h));
        }
    }

    let mut is_hydrogen = vec![false; params.len()];
    for (index, atom) in molecule.atoms().iter().enumerate() {
        is_hydrogen[index] = atom.element == Element::HYDROGEN;
    }
    is_hydrogen[heavy..].fill(true);

    let cation = |index: usize| -> f64 {
        if is_hydrogen[index] {
            HYDROGEN_CATION_EN
        } else {
            params[index].cation_electronegativity()
        }
    };

    let mut damping = 1.0;
    for _ in 0..ITERATIONS {
        damping *= 0.5;
        let chi: Vec<f64> = params
            .iter()
            .zip(&charges)
            .map(|(p, &q)| p.electronegativity(q))
            .collect();
        let mut delta = vec![0.0; params.len()];
        for &(i, j) in &edges {
            let (donor, acceptor) = if chi[j] > chi[i] { (i, j) } else { (j, i) };
            let denominator = cation(donor);
            if denominator == 0.0 {
                continue;
            }
            let transfer = (chi[acceptor] - chi[donor]) / denominator;
            delta[donor] += transfer;
            delta[acceptor] -= transfer;
        }
        for (q, d) in charges.iter_mut().zip(&delta) {
            *q += damping * d;
        }
    }

    if charges.iter().any(|q| !q.is_finite()) {
        return zeros;
    }
    charges[..heavy].iter().map(|&q| q as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chem::{sanitize::sanitize, smiles};

    fn charges(input: &str) -> Vec<f32> {
        gasteiger_charges(&sanitize(smiles::parse(input).unwrap()).unwrap())
    }

    #[test]
    fn oxygen_is_negative_in_methanol() {
        let q = charges("CO");
        assert!(q[1] < 0.0);
        assert!(q[0] > q[1]);
    }

    #[test]
    fn symmetric_atoms_share_charges() {
        let q = charges("c1ccccc1");
        for value in &q {
            assert!((value - q[0]).abs() < 1e-6);
        }
    }

    #[test]
    fn missing_parameters_zero_every_charge() {
        let q = charges("C[Se]C");
        assert_eq!(q, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn formal_charge_seeds_the_equalisation() {
        let q = charges("C[O-]");
        assert!(q[1] < -0.5);
    }
}
