//! Transformer price predictor
//!
//! Embeds each time step with a linear layer, adds a learned positional
//! matrix, runs the encoder stack and regresses the next value from the
//! last time step.

use ndarray::{Array2, ArrayView2, Axis, Ix3};
use rand::Rng;
use tracing::debug;

use crate::error::{Result, SimError};
use crate::model::config::ModelConfig;
use crate::model::encoder::EncoderLayer;
use crate::model::layers::{Linear, ParamReader};
use crate::utils::checkpoint::{StateDict, TensorData};

#[derive(Debug, Clone)]
pub struct TransformerPredictor {
    config: ModelConfig,
    embedding: Linear,
    /// Learned positional parameters `[seq_len, hidden_dim]`
    pos_encoder: Array2<f64>,
    layers: Vec<EncoderLayer>,
    fc: Linear,
}

impl TransformerPredictor {
    /// Creates an untrained model.
    pub fn new<R: Rng>(config: ModelConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;

        let embedding = Linear::new(config.input_dim, config.hidden_dim, rng);
        let pos_encoder = Array2::zeros((config.seq_len, config.hidden_dim));
        let layers = (0..config.num_layers)
            .map(|_| EncoderLayer::new(&config, rng))
            .collect();
        let fc = Linear::new(config.hidden_dim, 1, rng);

        Ok(Self {
            config,
            embedding,
            pos_encoder,
            layers,
            fc,
        })
    }

    /// Builds a model from checkpoint parameters.
    ///
    /// Loading is strict: every parameter must be present with the shape the
    /// configuration implies, and no extra parameters are accepted.
    pub fn from_state_dict(config: ModelConfig, state: &StateDict) -> Result<Self> {
        config.validate()?;

        let mut reader = ParamReader::new(state);
        let embedding = Linear::load(&mut reader, "embedding", config.input_dim, config.hidden_dim)?;
        let pos_encoder =
            reader.batched_matrix("pos_encoder", config.seq_len, config.hidden_dim)?;

        let mut layers = Vec::with_capacity(config.num_layers);
        for i in 0..config.num_layers {
            layers.push(EncoderLayer::load(
                &mut reader,
                &format!("transformer.layers.{}", i),
                &config,
            )?);
        }

        let fc = Linear::load(&mut reader, "fc", config.hidden_dim, 1)?;
        reader.finish()?;

        debug!(tensors = state.len(), "Loaded model parameters");

        Ok(Self {
            config,
            embedding,
            pos_encoder,
            layers,
            fc,
        })
    }

    /// Replaces the parameters with the ones in `state`.
    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        *self = Self::from_state_dict(self.config.clone(), state)?;
        Ok(())
    }

    /// Exports all parameters under their checkpoint names.
    pub fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        self.embedding.export("embedding", &mut state);

        let pos = self.pos_encoder.clone().insert_axis(Axis(0));
        state.insert("pos_encoder".to_string(), TensorData::from_array(&pos));

        for (i, layer) in self.layers.iter().enumerate() {
            layer.export(&format!("transformer.layers.{}", i), &mut state);
        }
        self.fc.export("fc", &mut state);
        state
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Predicts the next standardized value from one window.
    ///
    /// `window`: `[seq_len, input_dim]`
    pub fn forward(&self, window: &ArrayView2<f64>) -> Result<f64> {
        let expected = [self.config.seq_len, self.config.input_dim];
        if window.shape() != expected {
            return Err(SimError::shape("input window", &expected, window.shape()));
        }

        let mut hidden = self.embedding.forward(window) + &self.pos_encoder;
        for layer in &self.layers {
            hidden = layer.forward(&hidden);
        }

        let last = hidden.slice(ndarray::s![self.config.seq_len - 1.., ..]);
        let out = self.fc.forward(&last);
        Ok(out[[0, 0]])
    }

    /// Convenience wrapper over [`forward`](Self::forward) for owned arrays.
    pub fn predict(&self, window: &Array2<f64>) -> Result<f64> {
        self.forward(&window.view())
    }

    pub fn num_parameters(&self) -> usize {
        self.embedding.num_parameters()
            + self.pos_encoder.len()
            + self.layers.iter().map(EncoderLayer::num_parameters).sum::<usize>()
            + self.fc.num_parameters()
    }
}

/// Shape of the positional parameter as stored in a checkpoint
pub fn pos_encoder_shape(config: &ModelConfig) -> [usize; 3] {
    [1, config.seq_len, config.hidden_dim]
}

/// Checks whether a stored positional tensor matches the configuration.
pub fn check_pos_encoder(config: &ModelConfig, state: &StateDict) -> Result<()> {
    let tensor = state
        .get("pos_encoder")
        .ok_or_else(|| SimError::Checkpoint("missing key 'pos_encoder'".to_string()))?;
    tensor
        .to_array::<Ix3>("pos_encoder", &pos_encoder_shape(config))
        .map(|_| ())
}
