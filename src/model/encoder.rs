//! Transformer encoder layer
//!
//! Post-norm layout:
//! `x = norm1(x + self_attn(x))`, then `x = norm2(x + linear2(relu(linear1(x))))`.
//! Dropout is inactive at inference time and therefore not represented.

use ndarray::Array2;
use rand::Rng;

use crate::error::Result;
use crate::model::attention::MultiHeadAttention;
use crate::model::config::ModelConfig;
use crate::model::layers::{relu, LayerNorm, Linear, ParamReader};
use crate::utils::checkpoint::StateDict;

#[derive(Debug, Clone)]
pub struct EncoderLayer {
    self_attn: MultiHeadAttention,
    linear1: Linear,
    linear2: Linear,
    norm1: LayerNorm,
    norm2: LayerNorm,
}

impl EncoderLayer {
    pub fn new<R: Rng>(config: &ModelConfig, rng: &mut R) -> Self {
        let d_model = config.hidden_dim;
        Self {
            self_attn: MultiHeadAttention::new(d_model, config.num_heads, rng),
            linear1: Linear::new(d_model, config.dim_feedforward, rng),
            linear2: Linear::new(config.dim_feedforward, d_model, rng),
            norm1: LayerNorm::new(d_model, config.layer_norm_eps),
            norm2: LayerNorm::new(d_model, config.layer_norm_eps),
        }
    }

    /// `x`: `[seq_len, d_model]` -> `[seq_len, d_model]`
    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        let attn_out = self.self_attn.forward(&x.view());
        let x = self.norm1.forward(&(x + &attn_out));

        let hidden = relu(&self.linear1.forward(&x.view()));
        let ff_out = self.linear2.forward(&hidden.view());
        self.norm2.forward(&(&x + &ff_out))
    }

    pub fn load(reader: &mut ParamReader<'_>, prefix: &str, config: &ModelConfig) -> Result<Self> {
        let d_model = config.hidden_dim;
        let d_ff = config.dim_feedforward;
        let eps = config.layer_norm_eps;

        Ok(Self {
            self_attn: MultiHeadAttention::load(
                reader,
                &format!("{}.self_attn", prefix),
                d_model,
                config.num_heads,
            )?,
            linear1: Linear::load(reader, &format!("{}.linear1", prefix), d_model, d_ff)?,
            linear2: Linear::load(reader, &format!("{}.linear2", prefix), d_ff, d_model)?,
            norm1: LayerNorm::load(reader, &format!("{}.norm1", prefix), d_model, eps)?,
            norm2: LayerNorm::load(reader, &format!("{}.norm2", prefix), d_model, eps)?,
        })
    }

    pub fn export(&self, prefix: &str, state: &mut StateDict) {
        self.self_attn.export(&format!("{}.self_attn", prefix), state);
        self.linear1.export(&format!("{}.linear1", prefix), state);
        self.linear2.export(&format!("{}.linear2", prefix), state);
        self.norm1.export(&format!("{}.norm1", prefix), state);
        self.norm2.export(&format!("{}.norm2", prefix), state);
    }

    pub fn num_parameters(&self) -> usize {
        self.self_attn.num_parameters()
            + self.linear1.num_parameters()
            + self.linear2.num_parameters()
            + self.norm1.num_parameters()
            + self.norm2.num_parameters()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Axis;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> ModelConfig {
        ModelConfig {
            hidden_dim: 8,
            num_heads: 2,
            dim_feedforward: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_encoder_output_is_normalized() {
        let mut rng = StdRng::seed_from_u64(11);
        let layer = EncoderLayer::new(&small_config(), &mut rng);
        let x = Array2::from_shape_fn((6, 8), |(i, j)| ((i * 8 + j) as f64 * 0.3).cos());

        let out = layer.forward(&x);
        assert_eq!(out.dim(), (6, 8));

        // Fresh LayerNorm has unit weight and zero bias, so every row is centered
        for row in out.axis_iter(Axis(0)) {
            assert_abs_diff_eq!(row.sum() / 8.0, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_parameter_count() {
        let mut rng = StdRng::seed_from_u64(12);
        let layer = EncoderLayer::new(&small_config(), &mut rng);
        let attn = 3 * 8 * 8 + 3 * 8 + 8 * 8 + 8;
        let ff = (8 * 16 + 16) + (16 * 8 + 8);
        let norms = 4 * 8;
        assert_eq!(layer.num_parameters(), attn + ff + norms);
    }

    #[test]
    fn test_export_names() {
        let mut rng = StdRng::seed_from_u64(13);
        let layer = EncoderLayer::new(&small_config(), &mut rng);
        let mut state = StateDict::new();
        layer.export("transformer.layers.0", &mut state);

        let keys: Vec<&str> = state.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "transformer.layers.0.linear1.bias",
                "transformer.layers.0.linear1.weight",
                "transformer.layers.0.linear2.bias",
                "transformer.layers.0.linear2.weight",
                "transformer.layers.0.norm1.bias",
                "transformer.layers.0.norm1.weight",
                "transformer.layers.0.norm2.bias",
                "transformer.layers.0.norm2.weight",
                "transformer.layers.0.self_attn.in_proj_bias",
                "transformer.layers.0.self_attn.in_proj_weight",
                "transformer.layers.0.self_attn.out_proj.bias",
                "transformer.layers.0.self_attn.out_proj.weight",
            ]
        );
    }
}
