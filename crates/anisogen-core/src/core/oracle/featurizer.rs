use crate::core::chem::{self, Element, charges};

/// Width of the node feature vectors produced by [`AtomFeaturizer`]:
/// `[Z, degree, total_H, aromatic, formal_charge, implicit_valence, 1.0,
/// pauling_en, is_donor, donor_en, gasteiger_charge]`.
pub const NODE_FEATURE_WIDTH: usize = 11;

/// A ligand as a graph of fixed-width node features. Edges are undirected and
/// index into the node list.
#[derive(Debug, Clone, PartialEq)]
pub struct LigandGraph {
    width: usize,
    features: Vec<f32>,
    edges: Vec<(usize, usize)>,
}

impl LigandGraph {
    pub fn new(width: usize, features: Vec<f32>, edges: Vec<(usize, usize)>) -> Self {
        debug_assert!(width > 0 && features.len() % width == 0);
        Self {
            width,
            features,
            edges,
        }
    }

    pub fn single_node(node: Vec<f32>) -> Self {
        Self {
            width: node.len(),
            features: node,
            edges: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn node_count(&self) -> usize {
        self.features.len().checked_div(self.width).unwrap_or(0)
    }

    pub fn node(&self, index: usize) -> &[f32] {
        &self.features[index * self.width..(index + 1) * self.width]
    }

    pub fn features(&self) -> &[f32] {
        &self.features
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }
}

/// Turns a ligand into a node-feature graph.
///
/// Implementations must return graphs of exactly [`width`](Self::width)
/// columns and never an empty graph.
pub trait NodeFeaturizer: Send + Sync {
    fn width(&self) -> usize;

    /// `donor_element` names the element expected to coordinate, if known.
    fn featurize(&self, smiles: &str, donor_element: Option<&str>) -> LigandGraph;

    /// The one-node stand-in for an empty ligand slot.
    fn empty_slot(&self) -> LigandGraph;
}

/// The atom-level featuriser the bundled oracle models were trained against.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomFeaturizer;

fn donor_element(symbol: Option<&str>) -> Option<Element> {
    let symbol = symbol?.trim();
    if crate::core::corpus::is_placeholder(symbol) {
        return None;
    }
    let mut normalized = symbol.to_ascii_lowercase();
    if let Some(first) = normalized.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    Element::from_symbol(&normalized)
}

fn finite(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

impl NodeFeaturizer for AtomFeaturizer {
    fn width(&self) -> usize {
        NODE_FEATURE_WIDTH
    }

    fn featurize(&self, smiles: &str, donor: Option<&str>) -> LigandGraph {
        let Ok(sanitized) = chem::read_smiles(smiles) else {
            return LigandGraph::single_node(vec![0.0; NODE_FEATURE_WIDTH]);
        };
        let molecule = sanitized.molecule();
        if molecule.is_empty() {
            return LigandGraph::single_node(vec![0.0; NODE_FEATURE_WIDTH]);
        }
        let donor = donor_element(donor);
        let partial = charges::gasteiger_charges(&sanitized);

        let mut features = Vec::with_capacity(molecule.atom_count() * NODE_FEATURE_WIDTH);
        for (index, (atom, props)) in molecule
            .atoms()
            .iter()
            .zip(sanitized.properties())
            .enumerate()
        {
            let en = atom.element.pauling_electronegativity();
            let is_donor = donor == Some(atom.element);
            features.extend(
                [
                    f32::from(atom.element.atomic_number()),
                    f32::from(props.degree),
                    f32::from(props.total_h),
                    if atom.aromatic { 1.0 } else { 0.0 },
                    f32::from(atom.charge),
                    f32::from(props.implicit_h),
                    1.0,
                    en,
                    if is_donor { 1.0 } else { 0.0 },
                    if is_donor { en } else { 0.0 },
                    partial.get(index).copied().unwrap_or(0.0),
                ]
                .map(finite),
            );
        }

        let edges = molecule.bonds().iter().map(|b| (b.a, b.b)).collect();
        LigandGraph::new(NODE_FEATURE_WIDTH, features, edges)
    }

    fn empty_slot(&self) -> LigandGraph {
        let mut node = vec![0.0; NODE_FEATURE_WIDTH];
        node[6] = 1.0;
        LigandGraph::single_node(node)
    }
}
