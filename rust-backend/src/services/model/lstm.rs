//! Stacked LSTM, inference only, PyTorch parameter layout.

use ndarray::{s, Array1, Array2, ArrayView1};

use super::weights::StateDict;
use super::{check_state, sigmoid};
use crate::utils::errors::ModelError;

/// One layer. Gate rows are stacked `[input, forget, cell, output]`.
#[derive(Debug, Clone)]
pub struct LstmLayer {
    hidden_size: usize,
    w_ih: Array2<f32>, // [4h, input]
    w_hh: Array2<f32>, // [4h, h]
    b_ih: Array1<f32>,
    b_hh: Array1<f32>,
}

impl LstmLayer {
    fn load(
        dict: &mut StateDict,
        layer: usize,
        input_size: usize,
        hidden_size: usize,
    ) -> Result<Self, ModelError> {
        let g = 4 * hidden_size;
        Ok(Self {
            hidden_size,
            w_ih: dict.take_matrix(&format!("lstm.weight_ih_l{layer}"), g, input_size)?,
            w_hh: dict.take_matrix(&format!("lstm.weight_hh_l{layer}"), g, hidden_size)?,
            b_ih: dict.take_vector(&format!("lstm.bias_ih_l{layer}"), g)?,
            b_hh: dict.take_vector(&format!("lstm.bias_hh_l{layer}"), g)?,
        })
    }

    /// One timestep: returns `(h', c')`.
    pub fn step(
        &self,
        x: ArrayView1<f32>,
        h: &Array1<f32>,
        c: &Array1<f32>,
    ) -> (Array1<f32>, Array1<f32>) {
        let n = self.hidden_size;
        let gates = self.w_ih.dot(&x) + &self.b_ih + self.w_hh.dot(h) + &self.b_hh;

        let i = gates.slice(s![0..n]).mapv(sigmoid);
        let f = gates.slice(s![n..2 * n]).mapv(sigmoid);
        let g = gates.slice(s![2 * n..3 * n]).mapv(f32::tanh);
        let o = gates.slice(s![3 * n..4 * n]).mapv(sigmoid);

        let c_next = &f * c + &i * &g;
        let h_next = &o * &c_next.mapv(f32::tanh);
        (h_next, c_next)
    }
}

/// Per-layer hidden and cell vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct LstmState {
    pub h: Vec<Array1<f32>>,
    pub c: Vec<Array1<f32>>,
}

impl LstmState {
    pub fn zeros(num_layers: usize, hidden_size: usize) -> Self {
        Self {
            h: vec![Array1::zeros(hidden_size); num_layers],
            c: vec![Array1::zeros(hidden_size); num_layers],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lstm {
    hidden_size: usize,
    layers: Vec<LstmLayer>,
}

impl Lstm {
    pub fn load(
        dict: &mut StateDict,
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
    ) -> Result<Self, ModelError> {
        let layers = (0..num_layers)
            .map(|k| {
                let input = if k == 0 { input_size } else { hidden_size };
                LstmLayer::load(dict, k, input, hidden_size)
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

    /// Runs the whole `[seq_len, input]` sequence through every layer.
    ///
    /// Returns the top layer's output at each step, `[seq_len, hidden]`, and
    /// the final state of every layer.
    pub fn forward(
        &self,
        input: &Array2<f32>,
        state: LstmState,
    ) -> Result<(Array2<f32>, LstmState), ModelError> {
        check_state("lstm.h", &state.h, self.num_layers(), self.hidden_size)?;
        check_state("lstm.c", &state.c, self.num_layers(), self.hidden_size)?;

        let LstmState { h: mut hs, c: mut cs } = state;
        let mut seq = input.to_owned();

        for (k, layer) in self.layers.iter().enumerate() {
            let mut out = Array2::zeros((seq.nrows(), self.hidden_size));
            for (t, x) in seq.outer_iter().enumerate() {
                let (h, c) = layer.step(x, &hs[k], &cs[k]);
                out.row_mut(t).assign(&h);
                hs[k] = h;
                cs[k] = c;
            }
            seq = out;
        }

        Ok((seq, LstmState { h: hs, c: cs }))
    }
}
