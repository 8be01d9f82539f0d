//! LSTM → GRU → linear price model.
//!
//! The model holds parameters only. Recurrent state is a value the caller
//! passes in and gets back, so a single `Arc<HybridModel>` can serve any
//! number of concurrent requests.

use std::path::Path;

use ndarray::{Array1, Array2};

use super::gru::{Gru, GruState};
use super::lstm::{Lstm, LstmState};
use super::weights::StateDict;
use crate::utils::errors::ModelError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    /// Layers per stage.
    pub num_layers: usize,
    /// Only meaningful during training; inference never drops units.
    pub dropout: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_size: 1,
            hidden_size: 155,
            output_size: 1,
            num_layers: 3,
            dropout: 0.3,
        }
    }
}

#[derive(Debug, Clone)]
struct Linear {
    weight: Array2<f32>, // [out, in]
    bias: Array1<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridState {
    pub lstm: LstmState,
    pub gru: GruState,
}

#[derive(Debug, Clone)]
pub struct HybridModel {
    config: ModelConfig,
    lstm: Lstm,
    gru: Gru,
    linear: Linear,
}

impl HybridModel {
    /// Reads the weights artifact at `path`.
    pub fn load(path: &Path, config: ModelConfig) -> Result<Self, ModelError> {
        let dict = StateDict::from_path(path)?;
        Self::from_state_dict(dict, config)
    }

    pub fn from_state_dict(mut dict: StateDict, config: ModelConfig) -> Result<Self, ModelError> {
        if config.input_size == 0
            || config.hidden_size == 0
            || config.output_size == 0
            || config.num_layers == 0
        {
            return Err(ModelError::ShapeMismatch(format!(
                "every model dimension must be non-zero: {config:?}"
            )));
        }

        let h = config.hidden_size;
        let lstm = Lstm::load(&mut dict, config.input_size, h, config.num_layers)?;
        let gru = Gru::load(&mut dict, h, h, config.num_layers)?;
        let linear = Linear {
            weight: dict.take_matrix("linear.weight", config.output_size, h)?,
            bias: dict.take_vector("linear.bias", config.output_size)?,
        };

        for extra in dict.keys() {
            log::debug!("weights: ignoring unused tensor {extra}");
        }

        Ok(Self { config, lstm, gru, linear })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Fresh all-zero state for both stages.
    pub fn zero_state(&self) -> HybridState {
        let c = &self.config;
        HybridState {
            lstm: LstmState::zeros(c.num_layers, c.hidden_size),
            gru: GruState::zeros(c.num_layers, c.hidden_size),
        }
    }

    /// `seq` is row-major `[steps, input_size]`. Returns the first output of
    /// the projection at the last step together with the carried state.
    pub fn forward(&self, seq: &[f32], state: HybridState) -> Result<(f32, HybridState), ModelError> {
        let width = self.config.input_size;
        if seq.is_empty() || seq.len() % width != 0 {
            return Err(ModelError::ShapeMismatch(format!(
                "sequence of {} values is not a non-empty multiple of input size {width}",
                seq.len()
            )));
        }
        let input = Array2::from_shape_vec((seq.len() / width, width), seq.to_vec())
            .map_err(|e| ModelError::ShapeMismatch(e.to_string()))?;

        let (summaries, lstm) = self.lstm.forward(&input, state.lstm)?;
        let (refined, gru) = self.gru.forward(&summaries, state.gru)?;

        let last = refined.row(refined.nrows() - 1);
        let out = self.linear.weight.dot(&last) + &self.linear.bias;

        Ok((out[0], HybridState { lstm, gru }))
    }

    /// Stateless prediction: every call starts from zeroed hidden and cell state.
    pub fn predict(&self, seq: &[f32]) -> Result<f32, ModelError> {
        self.forward(seq, self.zero_state()).map(|(y, _)| y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::model::weights::initialise;
    use approx::assert_abs_diff_eq;

    fn unit_config() -> ModelConfig {
        ModelConfig { input_size: 1, hidden_size: 1, output_size: 1, num_layers: 1, dropout: 0.0 }
    }

    /// Single-unit model whose output can be worked out by hand.
    fn unit_model() -> HybridModel {
        let cfg = unit_config();
        let mut dict = initialise(&cfg, || 0.0);
        dict.insert("lstm.bias_ih_l0", vec![4], vec![0.0, 0.0, 1.0, 0.0]);
        dict.insert("gru.weight_ih_l0", vec![3, 1], vec![0.0, 0.0, 1.0]);
        dict.insert("linear.weight", vec![1, 1], vec![1.0]);
        HybridModel::from_state_dict(dict, cfg).unwrap()
    }

    fn seeded_model(cfg: ModelConfig) -> HybridModel {
        let mut k = 0u32;
        let dict = initialise(&cfg, || {
            k = k.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            ((k >> 16) % 2001) as f32 / 10_000.0 - 0.1
        });
        HybridModel::from_state_dict(dict, cfg).unwrap()
    }

    #[test]
    fn zero_weights_yield_linear_bias() {
        let cfg = unit_config();
        let mut dict = initialise(&cfg, || 0.0);
        dict.insert("linear.bias", vec![1], vec![0.75]);
        let m = HybridModel::from_state_dict(dict, cfg).unwrap();
        assert_abs_diff_eq!(m.predict(&[0.3, -0.2, 0.9]).unwrap(), 0.75, epsilon = 1e-7);
    }

    #[test]
    fn single_step_matches_hand_computation() {
        let m = unit_model();

        let c = 0.5 * 1f64.tanh();
        let h_lstm = 0.5 * c.tanh();
        let expected = 0.5 * h_lstm.tanh();

        let y = m.predict(&[0.0]).unwrap();
        assert_abs_diff_eq!(y as f64, expected, epsilon = 1e-6);
    }

    #[test]
    fn repeated_predictions_are_identical() {
        let m = seeded_model(ModelConfig { hidden_size: 8, num_layers: 3, ..ModelConfig::default() });
        let seq: Vec<f32> = (0..20).map(|i| (i as f32 / 10.0) - 1.0).collect();
        let first = m.predict(&seq).unwrap();
        for _ in 0..5 {
            assert_eq!(m.predict(&seq).unwrap(), first);
        }
    }

    #[test]
    fn carried_state_matches_one_long_pass() {
        let m = seeded_model(ModelConfig { hidden_size: 6, num_layers: 2, ..ModelConfig::default() });
        let seq = [0.1f32, -0.4, 0.8, 0.2, -0.9, 0.5];

        let (whole, whole_state) = m.forward(&seq, m.zero_state()).unwrap();
        let (_, mid) = m.forward(&seq[..3], m.zero_state()).unwrap();
        let (split, split_state) = m.forward(&seq[3..], mid).unwrap();

        assert_abs_diff_eq!(whole, split, epsilon = 1e-6);
        assert_eq!(whole_state, split_state);
    }

    #[test]
    fn non_zero_state_changes_the_output() {
        let m = seeded_model(ModelConfig { hidden_size: 6, num_layers: 2, ..ModelConfig::default() });
        let seq = [0.1f32, -0.4, 0.8];
        let (_, warm) = m.forward(&seq, m.zero_state()).unwrap();
        assert_ne!(warm, m.zero_state());

        let (warm_y, _) = m.forward(&seq, warm).unwrap();
        assert_ne!(warm_y, m.predict(&seq).unwrap());
    }

    #[test]
    fn empty_sequence_is_a_shape_mismatch() {
        let m = unit_model();
        assert!(matches!(m.predict(&[]), Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn foreign_state_is_a_shape_mismatch() {
        let m = unit_model();
        let mut state = m.zero_state();
        state.gru.h.push(Array1::zeros(1));
        assert!(matches!(m.forward(&[0.0], state), Err(ModelError::ShapeMismatch(_))));

        let mut state = m.zero_state();
        state.lstm.c[0] = Array1::zeros(4);
        assert!(matches!(m.forward(&[0.0], state), Err(ModelError::ShapeMismatch(_))));
    }

    #[test]
    fn weights_for_other_dimensions_are_rejected() {
        let dict = initialise(&unit_config(), || 0.0);
        let err = HybridModel::from_state_dict(dict, ModelConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch(_)));
    }

    #[test]
    fn incomplete_artifact_names_missing_tensor() {
        let cfg = unit_config();
        let mut json = serde_json::to_value(initialise(&cfg, || 0.0)).unwrap();
        json.as_object_mut().unwrap().remove("gru.bias_hh_l0");
        let dict: StateDict = serde_json::from_value(json).unwrap();

        match HybridModel::from_state_dict(dict, cfg) {
            Err(ModelError::MissingTensor(n)) => assert_eq!(n, "gru.bias_hh_l0"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn default_sized_model_produces_finite_output() {
        let m = seeded_model(ModelConfig::default());
        let seq: Vec<f32> = (0..20).map(|i| ((i * 7) % 11) as f32 / 5.5 - 1.0).collect();
        assert!(m.predict(&seq).unwrap().is_finite());
    }

    #[test]
    fn zero_dimension_config_is_rejected() {
        let cfg = ModelConfig { num_layers: 0, ..unit_config() };
        let err = HybridModel::from_state_dict(StateDict::default(), cfg).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch(_)));
    }
}
