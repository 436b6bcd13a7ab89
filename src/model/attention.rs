//! Multi-head self-attention
//!
//! Query, key and value projections are packed into one `[3 * d_model, d_model]`
//! matrix (`in_proj_weight`), followed by an output projection.

use ndarray::{s, Array1, Array2, ArrayView2};
use rand::Rng;
use rand_distr::Uniform;

use crate::error::Result;
use crate::model::layers::{softmax_rows, Linear, ParamReader};
use crate::utils::checkpoint::{StateDict, TensorData};

/// Multi-head scaled dot-product self-attention
#[derive(Debug, Clone)]
pub struct MultiHeadAttention {
    /// Packed Q/K/V projection `[3 * d_model, d_model]`
    in_proj_weight: Array2<f64>,
    /// Packed Q/K/V bias `[3 * d_model]`
    in_proj_bias: Array1<f64>,
    out_proj: Linear,
    num_heads: usize,
    head_dim: usize,
}

impl MultiHeadAttention {
    /// Xavier-uniform packed projection, zero biases
    pub fn new<R: Rng>(d_model: usize, num_heads: usize, rng: &mut R) -> Self {
        let bound = (6.0 / (d_model + 3 * d_model) as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let in_proj_weight = Array2::from_shape_fn((3 * d_model, d_model), |_| rng.sample(dist));

        let mut out_proj = Linear::new(d_model, d_model, rng);
        out_proj.bias.fill(0.0);

        Self {
            in_proj_weight,
            in_proj_bias: Array1::zeros(3 * d_model),
            out_proj,
            num_heads,
            head_dim: d_model / num_heads,
        }
    }

    pub fn d_model(&self) -> usize {
        self.num_heads * self.head_dim
    }

    /// Self-attention over a sequence.
    ///
    /// `x`: `[seq_len, d_model]` -> `[seq_len, d_model]`
    pub fn forward(&self, x: &ArrayView2<f64>) -> Array2<f64> {
        self.forward_with_weights(x).0
    }

    /// Same as [`forward`](Self::forward), also returning the per-head
    /// attention matrices `[seq_len, seq_len]`.
    pub fn forward_with_weights(&self, x: &ArrayView2<f64>) -> (Array2<f64>, Vec<Array2<f64>>) {
        let d_model = self.d_model();
        let seq_len = x.nrows();
        let scale = 1.0 / (self.head_dim as f64).sqrt();

        let qkv = x.dot(&self.in_proj_weight.t()) + &self.in_proj_bias;
        let q = qkv.slice(s![.., ..d_model]);
        let k = qkv.slice(s![.., d_model..2 * d_model]);
        let v = qkv.slice(s![.., 2 * d_model..]);

        let mut concat = Array2::zeros((seq_len, d_model));
        let mut weights = Vec::with_capacity(self.num_heads);

        for head in 0..self.num_heads {
            let start = head * self.head_dim;
            let end = start + self.head_dim;

            let q_head = q.slice(s![.., start..end]);
            let k_head = k.slice(s![.., start..end]);
            let v_head = v.slice(s![.., start..end]);

            let scores = q_head.dot(&k_head.t()) * scale;
            let attn = softmax_rows(&scores);

            concat
                .slice_mut(s![.., start..end])
                .assign(&attn.dot(&v_head));
            weights.push(attn);
        }

        (self.out_proj.forward(&concat.view()), weights)
    }

    pub fn load(
        reader: &mut ParamReader<'_>,
        prefix: &str,
        d_model: usize,
        num_heads: usize,
    ) -> Result<Self> {
        Ok(Self {
            in_proj_weight: reader.matrix(
                &format!("{}.in_proj_weight", prefix),
                3 * d_model,
                d_model,
            )?,
            in_proj_bias: reader.vector(&format!("{}.in_proj_bias", prefix), 3 * d_model)?,
            out_proj: Linear::load(reader, &format!("{}.out_proj", prefix), d_model, d_model)?,
            num_heads,
            head_dim: d_model / num_heads,
        })
    }

    pub fn export(&self, prefix: &str, state: &mut StateDict) {
        state.insert(
            format!("{}.in_proj_weight", prefix),
            TensorData::from_array(&self.in_proj_weight),
        );
        state.insert(
            format!("{}.in_proj_bias", prefix),
            TensorData::from_array(&self.in_proj_bias),
        );
        self.out_proj.export(&format!("{}.out_proj", prefix), state);
    }

    pub fn num_parameters(&self) -> usize {
        self.in_proj_weight.len() + self.in_proj_bias.len() + self.out_proj.num_parameters()
    }
}
