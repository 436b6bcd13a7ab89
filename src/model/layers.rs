//! Basic layers: Linear, LayerNorm and the parameter reader used to load them.

use ndarray::{Array1, Array2, ArrayView2, Axis, Ix1, Ix2, Ix3};
use rand::Rng;
use rand_distr::Uniform;
use std::collections::BTreeSet;

use crate::error::{Result, SimError};
use crate::utils::checkpoint::{StateDict, TensorData};

/// Reads named tensors out of a state dict and remembers which were used,
/// so that leftover keys can be reported.
pub struct ParamReader<'a> {
    state: &'a StateDict,
    used: BTreeSet<String>,
}

impl<'a> ParamReader<'a> {
    pub fn new(state: &'a StateDict) -> Self {
        Self {
            state,
            used: BTreeSet::new(),
        }
    }

    fn get(&mut self, name: &str) -> Result<&'a TensorData> {
        let tensor = self
            .state
            .get(name)
            .ok_or_else(|| SimError::Checkpoint(format!("missing key '{}'", name)))?;
        self.used.insert(name.to_string());
        Ok(tensor)
    }

    pub fn vector(&mut self, name: &str, len: usize) -> Result<Array1<f64>> {
        self.get(name)?.to_array::<Ix1>(name, &[len])
    }

    pub fn matrix(&mut self, name: &str, rows: usize, cols: usize) -> Result<Array2<f64>> {
        self.get(name)?.to_array::<Ix2>(name, &[rows, cols])
    }

    /// Reads a `[1, rows, cols]` tensor and drops the leading batch axis.
    pub fn batched_matrix(&mut self, name: &str, rows: usize, cols: usize) -> Result<Array2<f64>> {
        let array = self.get(name)?.to_array::<Ix3>(name, &[1, rows, cols])?;
        Ok(array.index_axis_move(Axis(0), 0))
    }

    /// Fails if the state dict holds keys nothing asked for.
    pub fn finish(self) -> Result<()> {
        let unexpected: Vec<&String> = self
            .state
            .keys()
            .filter(|k| !self.used.contains(*k))
            .collect();

        if unexpected.is_empty() {
            Ok(())
        } else {
            Err(SimError::Checkpoint(format!(
                "unexpected keys: {}",
                unexpected
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }
}

/// Fully connected layer, `y = x W^T + b`, with `W` of shape `[out, in]`
#[derive(Debug, Clone)]
pub struct Linear {
    pub weight: Array2<f64>,
    pub bias: Array1<f64>,
}

impl Linear {
    /// Fan-in uniform init, `U(-1/sqrt(in), 1/sqrt(in))`, with zero bias
    pub fn new<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        Self {
            weight: Array2::from_shape_fn((out_features, in_features), |_| rng.sample(dist)),
            bias: Array1::zeros(out_features),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    /// `x`: `[n, in]` -> `[n, out]`
    pub fn forward(&self, x: &ArrayView2<f64>) -> Array2<f64> {
        x.dot(&self.weight.t()) + &self.bias
    }

    pub fn load(
        reader: &mut ParamReader<'_>,
        prefix: &str,
        in_features: usize,
        out_features: usize,
    ) -> Result<Self> {
        Ok(Self {
            weight: reader.matrix(&format!("{}.weight", prefix), out_features, in_features)?,
            bias: reader.vector(&format!("{}.bias", prefix), out_features)?,
        })
    }

    pub fn export(&self, prefix: &str, state: &mut StateDict) {
        state.insert(format!("{}.weight", prefix), TensorData::from_array(&self.weight));
        state.insert(format!("{}.bias", prefix), TensorData::from_array(&self.bias));
    }

    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

/// Layer normalization over the last axis
#[derive(Debug, Clone)]
pub struct LayerNorm {
    pub weight: Array1<f64>,
    pub bias: Array1<f64>,
    pub eps: f64,
}

impl LayerNorm {
    pub fn new(dim: usize, eps: f64) -> Self {
        Self {
            weight: Array1::ones(dim),
            bias: Array1::zeros(dim),
            eps,
        }
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut result = x.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            let n = row.len() as f64;
            let mean = row.sum() / n;
            let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = (var + self.eps).sqrt();
            row.mapv_inplace(|v| (v - mean) / std);
        }
        result * &self.weight + &self.bias
    }

    pub fn load(reader: &mut ParamReader<'_>, prefix: &str, dim: usize, eps: f64) -> Result<Self> {
        Ok(Self {
            weight: reader.vector(&format!("{}.weight", prefix), dim)?,
            bias: reader.vector(&format!("{}.bias", prefix), dim)?,
            eps,
        })
    }

    pub fn export(&self, prefix: &str, state: &mut StateDict) {
        state.insert(format!("{}.weight", prefix), TensorData::from_array(&self.weight));
        state.insert(format!("{}.bias", prefix), TensorData::from_array(&self.bias));
    }

    pub fn num_parameters(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

/// Row-wise softmax
pub fn softmax_rows(x: &Array2<f64>) -> Array2<f64> {
    let mut result = x.clone();
    for mut row in result.axis_iter_mut(Axis(0)) {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    result
}

pub fn relu(x: &Array2<f64>) -> Array2<f64> {
    x.mapv(|v| v.max(0.0))
}
