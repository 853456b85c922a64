use candle_core::{Result, Tensor};
use candle_nn::{Init, Linear, Module, VarBuilder};

/// Graph convolution: `Â · X · W + b`.
///
/// `Â` is the normalized propagation matrix from
/// [`normalized_adjacency`](super::tensors::normalized_adjacency), so a node's
/// output mixes its own features with those of its in-neighbours.
#[derive(Debug, Clone)]
pub struct GcnLayer {
    weight: Linear,
    bias: Tensor,
}

impl GcnLayer {
    pub fn new(in_dim: usize, out_dim: usize, vb: VarBuilder) -> Result<Self> {
        let weight = candle_nn::linear_no_bias(in_dim, out_dim, vb.pp("lin"))?;
        let bias = vb.get_with_hints(out_dim, "bias", Init::Const(0.0))?;
        Ok(Self { weight, bias })
    }

    pub fn forward(&self, xs: &Tensor, adjacency: &Tensor) -> Result<Tensor> {
        let transformed = self.weight.forward(xs)?;
        adjacency.matmul(&transformed)?.broadcast_add(&self.bias)
    }
}
