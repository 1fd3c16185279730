use std::str::FromStr;

use burn::{
    nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

// ─── Cell selection ───────────────────────────────────────────────────────────
/// The supported recurrent cell kinds. A closed set, resolved once at model
/// construction into per-kind weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Lstm,
    Gru,
    Basic,
}

impl FromStr for CellKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LSTM" | "lstm" => Ok(Self::Lstm),
            "GRU" | "gru" => Ok(Self::Gru),
            "BasicRNN" | "basic" | "rnn" => Ok(Self::Basic),
            other => Err(ModelError::ConfigurationError(format!(
                "unsupported cell kind '{other}'"
            ))),
        }
    }
}

/// Per-layer state carried across timesteps. Transient — recreated at zeros
/// on every forward pass, never persisted across batches.
#[derive(Debug, Clone)]
pub struct CellState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    /// Gated memory, present for LSTM-like cells only.
    pub memory: Option<Tensor<B, 2>>,
}

// ─── Cells ────────────────────────────────────────────────────────────────────
/// LSTM cell: four gates computed in one fused projection, then split.
/// Gate weights are uniform over ±1/sqrt(input width).
#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    input_gates:  Linear<B>,
    hidden_gates: Linear<B>,
}

impl<B: Backend> LstmCell<B> {
    fn new(d_in: usize, hid_dim: usize, device: &B::Device) -> Self {
        let bound = 1.0 / (d_in as f64).sqrt();
        let init = Initializer::Uniform { min: -bound, max: bound };
        Self {
            input_gates: LinearConfig::new(d_in, 4 * hid_dim)
                .with_initializer(init.clone())
                .init(device),
            hidden_gates: LinearConfig::new(hid_dim, 4 * hid_dim)
                .with_bias(false)
                .with_initializer(init)
                .init(device),
        }
    }

    fn step(&self, x: Tensor<B, 2>, state: &CellState<B>) -> CellState<B> {
        let memory = state
            .memory
            .clone()
            .unwrap_or_else(|| state.hidden.zeros_like());
        let gates = self.input_gates.forward(x) + self.hidden_gates.forward(state.hidden.clone());
        let parts = gates.chunk(4, 1);
        let input_gate  = sigmoid(parts[0].clone());
        let forget_gate = sigmoid(parts[1].clone());
        let candidate   = tanh(parts[2].clone());
        let output_gate = sigmoid(parts[3].clone());

        let memory = forget_gate * memory + input_gate * candidate;
        let hidden = output_gate * tanh(memory.clone());
        CellState { hidden, memory: Some(memory) }
    }
}

/// GRU cell: reset/update gates plus a reset-modulated candidate.
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    gate_input:  Linear<B>,
    gate_hidden: Linear<B>,
    cand_input:  Linear<B>,
    cand_hidden: Linear<B>,
}

impl<B: Backend> GruCell<B> {
    fn new(d_in: usize, hid_dim: usize, device: &B::Device) -> Self {
        Self {
            gate_input:  LinearConfig::new(d_in, 2 * hid_dim).init(device),
            gate_hidden: LinearConfig::new(hid_dim, 2 * hid_dim).with_bias(false).init(device),
            cand_input:  LinearConfig::new(d_in, hid_dim).init(device),
            cand_hidden: LinearConfig::new(hid_dim, hid_dim).with_bias(false).init(device),
        }
    }

    fn step(&self, x: Tensor<B, 2>, state: &CellState<B>) -> CellState<B> {
        let hidden = state.hidden.clone();
        let gates =
            sigmoid(self.gate_input.forward(x.clone()) + self.gate_hidden.forward(hidden.clone()));
        let parts = gates.chunk(2, 1);
        let reset  = parts[0].clone();
        let update = parts[1].clone();

        let candidate =
            tanh(self.cand_input.forward(x) + self.cand_hidden.forward(reset * hidden.clone()));
        let hidden = update.clone() * hidden + (update.ones_like() - update) * candidate;
        CellState { hidden, memory: None }
    }
}

/// Basic recurrent cell: `h' = tanh(W x + U h + b)`.
#[derive(Module, Debug)]
pub struct BasicCell<B: Backend> {
    input:  Linear<B>,
    hidden: Linear<B>,
}

impl<B: Backend> BasicCell<B> {
    fn new(d_in: usize, hid_dim: usize, device: &B::Device) -> Self {
        Self {
            input:  LinearConfig::new(d_in, hid_dim).init(device),
            hidden: LinearConfig::new(hid_dim, hid_dim).with_bias(false).init(device),
        }
    }

    fn step(&self, x: Tensor<B, 2>, state: &CellState<B>) -> CellState<B> {
        let hidden = tanh(self.input.forward(x) + self.hidden.forward(state.hidden.clone()));
        CellState { hidden, memory: None }
    }
}

/// Tagged per-kind weights, resolved once at construction.
#[derive(Module, Debug)]
pub enum RecurrentCell<B: Backend> {
    Lstm(LstmCell<B>),
    Gru(GruCell<B>),
    Basic(BasicCell<B>),
}

impl<B: Backend> RecurrentCell<B> {
    fn new(kind: CellKind, d_in: usize, hid_dim: usize, device: &B::Device) -> Self {
        match kind {
            CellKind::Lstm => Self::Lstm(LstmCell::new(d_in, hid_dim, device)),
            CellKind::Gru => Self::Gru(GruCell::new(d_in, hid_dim, device)),
            CellKind::Basic => Self::Basic(BasicCell::new(d_in, hid_dim, device)),
        }
    }

    fn init_state(&self, batch: usize, hid_dim: usize, device: &B::Device) -> CellState<B> {
        let hidden = Tensor::zeros([batch, hid_dim], device);
        let memory = match self {
            Self::Lstm(_) => Some(Tensor::zeros([batch, hid_dim], device)),
            _ => None,
        };
        CellState { hidden, memory }
    }

    fn step(&self, x: Tensor<B, 2>, state: &CellState<B>) -> CellState<B> {
        match self {
            Self::Lstm(cell) => cell.step(x, state),
            Self::Gru(cell) => cell.step(x, state),
            Self::Basic(cell) => cell.step(x, state),
        }
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────
/// Unrolls a (possibly stacked) recurrent cell over a padded batch and
/// extracts, per example, the hidden state at that example's last valid
/// timestep.
///
/// Timesteps at or beyond an example's true length are a pass-through of
/// state: the candidate update is blended out by a 0/1 mask, so padding
/// tokens never corrupt the state that gets extracted.
#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    layers:  Vec<RecurrentCell<B>>,
    dropout: Dropout,
    hid_dim: usize,
}

impl<B: Backend> RecurrentEncoder<B> {
    /// `keep_prob` is the dropout keep-probability on stack input and stack
    /// output (1.0 = no dropout). Layers beyond the first consume the
    /// previous layer's hidden state, so their input width is `hid_dim`.
    pub fn new(
        kind: CellKind,
        emb_dim: usize,
        hid_dim: usize,
        nlayer: usize,
        keep_prob: f64,
        device: &B::Device,
    ) -> ModelResult<Self> {
        if emb_dim == 0 || hid_dim == 0 {
            return Err(ModelError::ConfigurationError(
                "emb_dim and hid_dim must be positive".into(),
            ));
        }
        if nlayer == 0 {
            return Err(ModelError::ConfigurationError("layer count must be positive".into()));
        }
        if !(0.0..=1.0).contains(&keep_prob) || keep_prob == 0.0 {
            return Err(ModelError::ConfigurationError(format!(
                "dropout keep-probability must be in (0, 1], got {keep_prob}"
            )));
        }
        let layers = (0..nlayer)
            .map(|i| {
                let d_in = if i == 0 { emb_dim } else { hid_dim };
                RecurrentCell::new(kind, d_in, hid_dim, device)
            })
            .collect();
        Ok(Self {
            layers,
            dropout: DropoutConfig::new(1.0 - keep_prob).init(),
            hid_dim,
        })
    }

    pub fn hid_dim(&self) -> usize {
        self.hid_dim
    }

    /// `[batch, seq_len, emb_dim]` + per-example true lengths →
    /// `[batch, hid_dim]`.
    ///
    /// The extraction index into the flattened `[batch * seq_len, hid_dim]`
    /// output is `example_index * seq_len + (true_length - 1)`. Lengths must
    /// be in `1..=seq_len`; a zero length would address a different example's
    /// final timestep and is rejected upstream.
    pub fn forward(&self, embedded: Tensor<B, 3>, lengths: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        let [batch, seq_len, _] = embedded.dims();
        let device = embedded.device();

        // [batch, seq_len] mask: 1.0 where the timestep is a real token
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .reshape([1, seq_len])
            .expand([batch, seq_len]);
        let limits = lengths.clone().reshape([batch, 1]).expand([batch, seq_len]);
        let mask = positions.lower(limits).float();

        let mut states: Vec<CellState<B>> = self
            .layers
            .iter()
            .map(|layer| layer.init_state(batch, self.hid_dim, &device))
            .collect();

        let mut outputs: Vec<Tensor<B, 2>> = Vec::with_capacity(seq_len);
        for t in 0..seq_len {
            let token = embedded
                .clone()
                .slice([0..batch, t..t + 1])
                .squeeze::<2>(1);
            let mask_t = mask.clone().slice([0..batch, t..t + 1]);

            // dropout wraps the whole stack: input and output only
            let mut layer_input = self.dropout.forward(token);
            for (layer, state) in self.layers.iter().zip(states.iter_mut()) {
                let next = layer.step(layer_input, &*state);
                *state = masked_state(next, &*state, &mask_t);
                layer_input = state.hidden.clone();
            }
            outputs.push(self.dropout.forward(layer_input));
        }

        let stacked = Tensor::stack::<3>(outputs, 1);
        let flat = stacked.reshape([batch * seq_len, self.hid_dim]);
        let offsets =
            Tensor::<B, 1, Int>::arange(0..batch as i64, &device).mul_scalar(seq_len as i64);
        let gather_idx = offsets + lengths.sub_scalar(1);
        flat.select(0, gather_idx)
    }
}

/// Blend the candidate state with the previous one: rows whose mask is 0
/// keep their old hidden (and memory) unchanged.
fn masked_state<B: Backend>(
    next: CellState<B>,
    prev: &CellState<B>,
    mask: &Tensor<B, 2>,
) -> CellState<B> {
    let hidden = blend(next.hidden, prev.hidden.clone(), mask);
    let memory = match (next.memory, prev.memory.clone()) {
        (Some(n), Some(p)) => Some(blend(n, p, mask)),
        (n, _) => n,
    };
    CellState { hidden, memory }
}

fn blend<B: Backend>(next: Tensor<B, 2>, prev: Tensor<B, 2>, mask: &Tensor<B, 2>) -> Tensor<B, 2> {
    let [batch, width] = next.dims();
    let keep = mask.clone().expand([batch, width]);
    next * keep.clone() + prev * (keep.ones_like() - keep)
}
