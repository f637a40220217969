//! The outfit-match classifier: a two-layer dense network.

use candle_core::{Result, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Dense(hidden, relu) → Dense(1, sigmoid) binary classifier over the
/// interleaved pair features.
pub struct MatchModel {
    fc1: Linear,
    fc2: Linear,
}

impl MatchModel {
    /// Build the model, registering weights under the given VarBuilder.
    pub fn new(vb: VarBuilder, input_dim: usize, hidden_units: usize) -> Result<Self> {
        let fc1 = linear(input_dim, hidden_units, vb.pp("fc1"))?;
        let fc2 = linear(hidden_units, 1, vb.pp("fc2"))?;
        Ok(Self { fc1, fc2 })
    }

    /// Forward pass returning match probabilities in (0, 1), shape (n, 1).
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = self.fc1.forward(xs)?.relu()?;
        let xs = self.fc2.forward(&xs)?;
        candle_nn::ops::sigmoid(&xs)
    }
}
