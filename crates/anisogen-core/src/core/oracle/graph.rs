use super::featurizer::LigandGraph;
use nalgebra::DMatrix;

/// Several ligand graphs merged into one disconnected graph per complex, and
/// several complexes stacked into one batch.
///
/// Node rows are laid out complex by complex. `graph_of` maps every node to
/// the complex it belongs to so predictions can be mean-pooled per complex.
#[derive(Debug, Clone)]
pub struct GraphBatch {
    features: DMatrix<f32>,
    edges: Vec<(usize, usize)>,
    graph_of: Vec<usize>,
    graph_count: usize,
}

impl GraphBatch {
    /// Stacks one list of ligand graphs per complex.
    ///
    /// Returns `None` if `complexes` is empty, a complex has no ligand graph,
    /// or widths disagree.
    pub fn from_complexes<'a, I, J>(complexes: I) -> Option<Self>
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = &'a LigandGraph>,
    {
        let mut width = None;
        let mut rows: Vec<f32> = Vec::new();
        let mut edges = Vec::new();
        let mut graph_of = Vec::new();
        let mut graph_count = 0;

        for complex in complexes {
            let before = graph_of.len();
            for ligand in complex {
                match width {
                    None => width = Some(ligand.width()),
                    Some(w) if w != ligand.width() => return None,
                    Some(_) => {}
                }
                let offset = graph_of.len();
                rows.extend_from_slice(ligand.features());
                edges.extend(
                    ligand
                        .edges()
                        .iter()
                        .map(|&(a, b)| (a + offset, b + offset)),
                );
                graph_of.extend(std::iter::repeat_n(graph_count, ligand.node_count()));
            }
            if graph_of.len() == before {
                return None;
            }
            graph_count += 1;
        }

        let width = width?;
        let features = DMatrix::from_row_slice(graph_of.len(), width, &rows);
        Some(Self {
            features,
            edges,
            graph_of,
            graph_count,
        })
    }

    pub fn features(&self) -> &DMatrix<f32> {
        &self.features
    }

    pub fn width(&self) -> usize {
        self.features.ncols()
    }

    pub fn node_count(&self) -> usize {
        self.graph_of.len()
    }

    pub fn graph_count(&self) -> usize {
        self.graph_count
    }

    /// Sums the rows of every node's neighbours (edges count in both
    /// directions).
    pub fn aggregate_neighbors(&self, h: &DMatrix<f32>) -> DMatrix<f32> {
        let mut out = DMatrix::zeros(h.nrows(), h.ncols());
        for &(a, b) in &self.edges {
            for c in 0..h.ncols() {
                out[(a, c)] += h[(b, c)];
                out[(b, c)] += h[(a, c)];
            }
        }
        out
    }

    /// Averages node rows per complex.
    pub fn mean_pool(&self, h: &DMatrix<f32>) -> DMatrix<f32> {
        let mut pooled = DMatrix::zeros(self.graph_count, h.ncols());
        let mut counts = vec![0u32; self.graph_count];
        for (node, &graph) in self.graph_of.iter().enumerate() {
            counts[graph] += 1;
            for c in 0..h.ncols() {
                pooled[(graph, c)] += h[(node, c)];
            }
        }
        for (graph, &count) in counts.iter().enumerate() {
            if count > 0 {
                pooled.row_mut(graph).scale_mut(1.0 / count as f32);
            }
        }
        pooled
    }
}
