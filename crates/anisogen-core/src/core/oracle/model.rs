use super::OracleError;
use super::graph::GraphBatch;
use nalgebra::{DMatrix, DVector};
use safetensors::{Dtype, SafeTensors};
use std::path::Path;

const BATCH_NORM_EPS: f32 = 1e-5;

#[derive(Debug, Clone)]
struct Linear {
    /// `out × in`, as stored by the training framework.
    weight: DMatrix<f32>,
    bias: Option<DVector<f32>>,
}

impl Linear {
    fn apply(&self, x: &DMatrix<f32>) -> DMatrix<f32> {
        let mut y = x * self.weight.transpose();
        if let Some(bias) = &self.bias {
            for mut row in y.row_iter_mut() {
                row += bias.transpose();
            }
        }
        y
    }

    fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    fn out_features(&self) -> usize {
        self.weight.nrows()
    }
}

/// Inference-mode batch norm folded into a per-channel affine map.
#[derive(Debug, Clone)]
struct BatchNorm {
    scale: DVector<f32>,
    shift: DVector<f32>,
}

impl BatchNorm {
    fn apply_mut(&self, x: &mut DMatrix<f32>) {
        for mut row in x.row_iter_mut() {
            row.component_mul_assign(&self.scale.transpose());
            row += self.shift.transpose();
        }
    }
}

/// `h' = W_rel · Σ_{j∈N(i)} h_j + b_rel + W_root · h_i`
#[derive(Debug, Clone)]
struct GraphConv {
    rel: Linear,
    root: Linear,
    norm: BatchNorm,
}

fn relu_mut(x: &mut DMatrix<f32>) {
    x.apply(|v| *v = v.max(0.0));
}

/// A graph-convolution regressor: stacked `GraphConv → BatchNorm → ReLU`
/// layers, mean pooling per complex, a two-layer MLP head and a scalar
/// output layer.
#[derive(Debug, Clone)]
pub struct GnnModel {
    convs: Vec<GraphConv>,
    head: [Linear; 2],
    output: Linear,
}

struct TensorSource<'a> {
    path: &'a Path,
    tensors: SafeTensors<'a>,
}

impl TensorSource<'_> {
    fn path(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    fn contains(&self, name: &str) -> bool {
        self.tensors.tensor(name).is_ok()
    }

    fn values(&self, name: &str) -> Result<(Vec<usize>, Vec<f32>), OracleError> {
        let view = self
            .tensors
            .tensor(name)
            .map_err(|_| OracleError::MissingTensor {
                path: self.path(),
                name: name.to_string(),
            })?;
        let data = view.data();
        let values = match view.dtype() {
            Dtype::F32 => data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            Dtype::F64 => data
                .chunks_exact(8)
                .map(|b| {
                    f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
                })
                .collect(),
            other => {
                return Err(OracleError::UnsupportedDtype {
                    path: self.path(),
                    name: name.to_string(),
                    dtype: format!("{other:?}"),
                });
            }
        };
        Ok((view.shape().to_vec(), values))
    }

    fn matrix(&self, name: &str, cols: Option<usize>) -> Result<DMatrix<f32>, OracleError> {
        let (shape, values) = self.values(name)?;
        match (shape.as_slice(), cols) {
            ([r, c], None) => Ok(DMatrix::from_row_slice(*r, *c, &values)),
            ([r, c], Some(expected)) if *c == expected => {
                Ok(DMatrix::from_row_slice(*r, *c, &values))
            }
            _ => Err(OracleError::ShapeMismatch {
                path: self.path(),
                name: name.to_string(),
                expected: match cols {
                    Some(c) => format!("[_, {c}]"),
                    None => "[_, _]".to_string(),
                },
                found: shape,
            }),
        }
    }

    fn vector(&self, name: &str, len: usize) -> Result<DVector<f32>, OracleError> {
        let (shape, values) = self.values(name)?;
        if shape != [len] {
            return Err(OracleError::ShapeMismatch {
                path: self.path(),
                name: name.to_string(),
                expected: format!("[{len}]"),
                found: shape,
            });
        }
        Ok(DVector::from_vec(values))
    }

    fn linear(&self, prefix: &str, in_features: Option<usize>, bias: bool) -> Result<Linear, OracleError> {
        let weight = self.matrix(&format!("{prefix}.weight"), in_features)?;
        let bias = if bias {
            Some(self.vector(&format!("{prefix}.bias"), weight.nrows())?)
        } else {
            None
        };
        Ok(Linear { weight, bias })
    }

    fn batch_norm(&self, prefix: &str, channels: usize) -> Result<BatchNorm, OracleError> {
        let weight = self.vector(&format!("{prefix}.weight"), channels)?;
        let bias = self.vector(&format!("{prefix}.bias"), channels)?;
        let mean = self.vector(&format!("{prefix}.running_mean"), channels)?;
        let var = self.vector(&format!("{prefix}.running_var"), channels)?;
        let scale = weight.zip_map(&var, |w, v| w / (v + BATCH_NORM_EPS).sqrt());
        let shift = bias - mean.component_mul(&scale);
        Ok(BatchNorm { scale, shift })
    }
}

impl GnnModel {
    /// Loads a model from a safetensors file.
    ///
    /// Expected tensors: `convs.{i}.lin_rel.{weight,bias}`,
    /// `convs.{i}.lin_root.weight`, `bns.{i}.{weight,bias,running_mean,running_var}`,
    /// `head.net.0.*`, `head.net.3.*` and `lin_out.*`. The number of layers is
    /// taken from the `convs.{i}` entries present.
    pub fn load(path: &Path) -> Result<Self, OracleError> {
        let bytes = std::fs::read(path).map_err(|source| OracleError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        let tensors = SafeTensors::deserialize(&bytes).map_err(|source| OracleError::Format {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        let source = TensorSource { path, tensors };

        let mut convs = Vec::new();
        let mut width = None;
        while source.contains(&format!("convs.{}.lin_rel.weight", convs.len())) {
            let i = convs.len();
            let rel = source.linear(&format!("convs.{i}.lin_rel"), width, true)?;
            let root = source.linear(&format!("convs.{i}.lin_root"), Some(rel.in_features()), false)?;
            if root.out_features() != rel.out_features() {
                return Err(OracleError::ShapeMismatch {
                    path: source.path(),
                    name: format!("convs.{i}.lin_root.weight"),
                    expected: format!("[{}, {}]", rel.out_features(), rel.in_features()),
                    found: vec![root.out_features(), root.in_features()],
                });
            }
            let norm = source.batch_norm(&format!("bns.{i}"), rel.out_features())?;
            width = Some(rel.out_features());
            convs.push(GraphConv { rel, root, norm });
        }
        let Some(hidden) = width else {
            return Err(OracleError::MissingTensor {
                path: source.path(),
                name: "convs.0.lin_rel.weight".to_string(),
            });
        };

        let first = source.linear("head.net.0", Some(hidden), true)?;
        let second = source.linear("head.net.3", Some(first.out_features()), true)?;
        let output = source.linear("lin_out", Some(second.out_features()), true)?;
        if output.out_features() != 1 {
            return Err(OracleError::ShapeMismatch {
                path: source.path(),
                name: "lin_out.weight".to_string(),
                expected: format!("[1, {}]", second.out_features()),
                found: vec![output.out_features(), output.in_features()],
            });
        }

        Ok(Self {
            convs,
            head: [first, second],
            output,
        })
    }

    /// Width of the node features the first layer consumes.
    pub fn input_width(&self) -> usize {
        self.convs[0].rel.in_features()
    }

    pub fn layer_count(&self) -> usize {
        self.convs.len()
    }

    /// One normalised prediction per complex in the batch.
    pub fn forward(&self, batch: &GraphBatch) -> Vec<f32> {
        let mut h = batch.features().clone();
        for conv in &self.convs {
            let aggregated = batch.aggregate_neighbors(&h);
            let mut next = conv.rel.apply(&aggregated) + conv.root.apply(&h);
            conv.norm.apply_mut(&mut next);
            relu_mut(&mut next);
            h = next;
        }
        let pooled = batch.mean_pool(&h);
        let mut hidden = self.head[0].apply(&pooled);
        relu_mut(&mut hidden);
        let hidden = self.head[1].apply(&hidden);
        self.output.apply(&hidden).column(0).iter().copied().collect()
    }
}
