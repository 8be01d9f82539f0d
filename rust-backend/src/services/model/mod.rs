// src/services/model/mod.rs
pub mod gru;
pub mod hybrid;
pub mod lstm;
pub mod weights;

pub use hybrid::{HybridModel, HybridState, ModelConfig};

use ndarray::Array1;

use crate::utils::errors::ModelError;

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// A caller-supplied recurrent state must have one vector per layer, each of
/// the configured hidden size.
pub(crate) fn check_state(
    what: &str,
    state: &[Array1<f32>],
    num_layers: usize,
    hidden_size: usize,
) -> Result<(), ModelError> {
    if state.len() != num_layers {
        return Err(ModelError::ShapeMismatch(format!(
            "{what}: expected {num_layers} layers, got {}",
            state.len()
        )));
    }
    if let Some(bad) = state.iter().find(|v| v.len() != hidden_size) {
        return Err(ModelError::ShapeMismatch(format!(
            "{what}: expected hidden size {hidden_size}, got {}",
            bad.len()
        )));
    }
    Ok(())
}
