//! Serialized parameter store for the hybrid model.
//!
//! The artifact is a JSON object keyed by PyTorch `state_dict` names
//! (`lstm.weight_ih_l0`, `gru.bias_hh_l2`, `linear.weight`, …); each entry
//! holds the tensor shape and its row-major data.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::hybrid::ModelConfig;
use crate::utils::errors::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict {
    tensors: BTreeMap<String, Tensor>,
}

impl StateDict {
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ModelError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn insert(&mut self, name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) {
        self.tensors.insert(name.into(), Tensor { shape, data });
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Removes `name` and checks it is a `rows × cols` matrix.
    pub fn take_matrix(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<Array2<f32>, ModelError> {
        let t = self.take_checked(name, &[rows, cols])?;
        Array2::from_shape_vec((rows, cols), t.data)
            .map_err(|e| ModelError::ShapeMismatch(format!("{name}: {e}")))
    }

    /// Removes `name` and checks it is a vector of `len`.
    pub fn take_vector(&mut self, name: &str, len: usize) -> Result<Array1<f32>, ModelError> {
        let t = self.take_checked(name, &[len])?;
        Ok(Array1::from_vec(t.data))
    }

    fn take_checked(&mut self, name: &str, expected: &[usize]) -> Result<Tensor, ModelError> {
        let t = self
            .tensors
            .remove(name)
            .ok_or_else(|| ModelError::MissingTensor(name.to_string()))?;

        if t.shape != expected {
            return Err(ModelError::ShapeMismatch(format!(
                "{name}: expected {expected:?}, artifact has {:?}",
                t.shape
            )));
        }
        let numel: usize = t.shape.iter().product();
        if t.data.len() != numel {
            return Err(ModelError::ShapeMismatch(format!(
                "{name}: shape {:?} needs {numel} values, got {}",
                t.shape,
                t.data.len()
            )));
        }
        Ok(t)
    }
}

/// Name and shape of every tensor the hybrid model reads, in load order.
pub fn expected_tensors(config: &ModelConfig) -> Vec<(String, Vec<usize>)> {
    let h = config.hidden_size;
    let mut out = Vec::with_capacity(8 * config.num_layers + 2);

    for (prefix, gates) in [("lstm", 4), ("gru", 3)] {
        for layer in 0..config.num_layers {
            let input = match (prefix, layer) {
                ("lstm", 0) => config.input_size,
                _ => h,
            };
            out.push((format!("{prefix}.weight_ih_l{layer}"), vec![gates * h, input]));
            out.push((format!("{prefix}.weight_hh_l{layer}"), vec![gates * h, h]));
            out.push((format!("{prefix}.bias_ih_l{layer}"), vec![gates * h]));
            out.push((format!("{prefix}.bias_hh_l{layer}"), vec![gates * h]));
        }
    }
    out.push(("linear.weight".into(), vec![config.output_size, h]));
    out.push(("linear.bias".into(), vec![config.output_size]));
    out
}

/// Builds a full state dict by drawing every parameter from `sample`.
pub fn initialise(config: &ModelConfig, mut sample: impl FnMut() -> f32) -> StateDict {
    let mut dict = StateDict::default();
    for (name, shape) in expected_tensors(config) {
        let numel: usize = shape.iter().product();
        let data = (0..numel).map(|_| sample()).collect();
        dict.insert(name, shape, data);
    }
    dict
}
