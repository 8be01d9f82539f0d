//! Stacked GRU, inference only, PyTorch parameter layout.

use ndarray::{s, Array1, Array2, ArrayView1};

use super::weights::StateDict;
use super::{check_state, sigmoid};
use crate::utils::errors::ModelError;

/// One layer. Gate rows are stacked `[reset, update, new]`.
#[derive(Debug, Clone)]
pub struct GruLayer {
    hidden_size: usize,
    w_ih: Array2<f32>, // [3h, input]
    w_hh: Array2<f32>, // [3h, h]
    b_ih: Array1<f32>,
    b_hh: Array1<f32>,
}

impl GruLayer {
    fn load(
        dict: &mut StateDict,
        layer: usize,
        input_size: usize,
        hidden_size: usize,
    ) -> Result<Self, ModelError> {
        let g = 3 * hidden_size;
        Ok(Self {
            hidden_size,
            w_ih: dict.take_matrix(&format!("gru.weight_ih_l{layer}"), g, input_size)?,
            w_hh: dict.take_matrix(&format!("gru.weight_hh_l{layer}"), g, hidden_size)?,
            b_ih: dict.take_vector(&format!("gru.bias_ih_l{layer}"), g)?,
            b_hh: dict.take_vector(&format!("gru.bias_hh_l{layer}"), g)?,
        })
    }

    /// One timestep. The reset gate scales the recurrent part of the
    /// candidate after its bias is added.
    pub fn step(&self, x: ArrayView1<f32>, h: &Array1<f32>) -> Array1<f32> {
        let n = self.hidden_size;
        let gi = self.w_ih.dot(&x) + &self.b_ih;
        let gh = self.w_hh.dot(h) + &self.b_hh;

        let r = (&gi.slice(s![0..n]) + &gh.slice(s![0..n])).mapv(sigmoid);
        let z = (&gi.slice(s![n..2 * n]) + &gh.slice(s![n..2 * n])).mapv(sigmoid);
        let cand = (&gi.slice(s![2 * n..3 * n]) + &(&r * &gh.slice(s![2 * n..3 * n])))
            .mapv(f32::tanh);

        let keep = z.mapv(|v| 1.0 - v);
        &keep * &cand + &z * h
    }
}

/// Per-layer hidden vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct GruState {
    pub h: Vec<Array1<f32>>,
}

impl GruState {
    pub fn zeros(num_layers: usize, hidden_size: usize) -> Self {
        Self { h: vec![Array1::zeros(hidden_size); num_layers] }
    }
}

#[derive(Debug, Clone)]
pub struct Gru {
    hidden_size: usize,
    layers: Vec<GruLayer>,
}

impl Gru {
    pub fn load(
        dict: &mut StateDict,
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
    ) -> Result<Self, ModelError> {
        let layers = (0..num_layers)
            .map(|k| {
                let input = if k == 0 { input_size } else { hidden_size };
                GruLayer::load(dict, k, input, hidden_size)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { hidden_size, layers })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn forward(
        &self,
        input: &Array2<f32>,
        state: GruState,
    ) -> Result<(Array2<f32>, GruState), ModelError> {
        check_state("gru.h", &state.h, self.num_layers(), self.hidden_size)?;

        let mut hs = state.h;
        let mut seq = input.to_owned();

        for (k, layer) in self.layers.iter().enumerate() {
            let mut out = Array2::zeros((seq.nrows(), self.hidden_size));
            for (t, x) in seq.outer_iter().enumerate() {
                let h = layer.step(x, &hs[k]);
                out.row_mut(t).assign(&h);
                hs[k] = h;
            }
            seq = out;
        }

        Ok((seq, GruState { h: hs }))
    }
}
