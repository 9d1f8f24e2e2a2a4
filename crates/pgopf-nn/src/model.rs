//! Physics-guided GCNN: a stack of [`PhysicsGuidedConv`] layers feeding a
//! dense prediction head.
//!
//! ```text
//! X (n, in) ─► conv₀ ─► conv₁ … conv_L ─► flatten (n·gcn) ─► fc … fc ─► (n, out)
//! ```
//!
//! ReLU sits between consecutive dense layers; the last one is linear. Every
//! conv layer receives the same physics parameters.

use ndarray::{Array1, Array2, Array3};
use pgopf_algo::PhysicsParams;
use rand::Rng;
use tracing::debug;

use crate::error::{NnError, NnResult};
use crate::layer::PhysicsGuidedConv;
use crate::linear::Linear;
use crate::registry::ModelConfig;

#[derive(Debug, Clone)]
pub struct Gcnn {
    n_buses: usize,
    gcn_channels: usize,
    output_dim: usize,
    conv_layers: Vec<PhysicsGuidedConv>,
    head: Vec<Linear>,
}

impl Gcnn {
    pub fn new<R: Rng + ?Sized>(
        n_buses: usize,
        config: &ModelConfig,
        rng: &mut R,
    ) -> NnResult<Self> {
        if n_buses == 0 {
            return Err(NnError::Config("n_buses must be positive".to_string()));
        }
        config.validate()?;

        let conv_layers = (0..config.num_gcn_layers)
            .map(|i| {
                let in_ch = if i == 0 {
                    config.in_channels
                } else {
                    config.gcn_channels
                };
                PhysicsGuidedConv::new(in_ch, config.gcn_channels, &mut *rng)
            })
            .collect::<NnResult<Vec<_>>>()?;

        let flat = n_buses * config.gcn_channels;
        let out = n_buses * config.output_dim;
        let head = if config.num_fc_layers == 1 {
            vec![Linear::new(flat, out, &mut *rng)?]
        } else {
            let mut dims = vec![flat];
            dims.extend(std::iter::repeat(config.fc_hidden_dim).take(config.num_fc_layers - 1));
            dims.push(out);
            dims.windows(2)
                .map(|w| Linear::new(w[0], w[1], &mut *rng))
                .collect::<NnResult<Vec<_>>>()?
        };

        let model = Self {
            n_buses,
            gcn_channels: config.gcn_channels,
            output_dim: config.output_dim,
            conv_layers,
            head,
        };
        debug!(
            n_buses,
            conv_layers = model.conv_layers.len(),
            fc_layers = model.head.len(),
            parameters = model.parameter_count(),
            "built gcnn"
        );
        Ok(model)
    }

    pub fn n_buses(&self) -> usize {
        self.n_buses
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn conv_layers(&self) -> &[PhysicsGuidedConv] {
        &self.conv_layers
    }

    pub fn head(&self) -> &[Linear] {
        &self.head
    }

    /// Replace the dense head, e.g. with stored weights. Dimensions must chain.
    pub fn set_head(&mut self, head: Vec<Linear>) -> NnResult<()> {
        let mut width = self.n_buses * self.gcn_channels;
        for layer in &head {
            if layer.in_features() != width {
                return Err(NnError::shape("head layer input", width, layer.in_features()));
            }
            width = layer.out_features();
        }
        if width != self.n_buses * self.output_dim || head.is_empty() {
            return Err(NnError::shape(
                "head output",
                self.n_buses * self.output_dim,
                width,
            ));
        }
        self.head = head;
        Ok(())
    }

    pub fn parameter_count(&self) -> usize {
        let conv: usize = self.conv_layers.iter().map(|l| l.parameter_count()).sum();
        let head: usize = self
            .head
            .iter()
            .map(|l| l.weight.len() + l.bias.len())
            .sum();
        conv + head
    }

    /// Output of the conv stack, `(n_buses, gcn_channels)`.
    pub fn embed(&self, x: &Array2<f64>, physics: &PhysicsParams<'_>) -> NnResult<Array2<f64>> {
        self.check_buses(x.nrows())?;
        self.conv_layers
            .iter()
            .try_fold(x.clone(), |h, layer| layer.forward(&h, physics))
    }

    /// Per-bus predictions, `(n_buses, output_dim)`.
    pub fn forward(&self, x: &Array2<f64>, physics: &PhysicsParams<'_>) -> NnResult<Array2<f64>> {
        let h = self.embed(x, physics)?;
        let flat: Array1<f64> = h.iter().copied().collect();
        let last = self.head.len() - 1;
        let out = self
            .head
            .iter()
            .enumerate()
            .try_fold(flat, |z, (i, layer)| {
                let z = layer.forward(&z)?;
                Ok::<_, NnError>(if i < last { relu(z) } else { z })
            })?;
        out.into_shape((self.n_buses, self.output_dim))
            .map_err(|e| NnError::shape("model output", (self.n_buses, self.output_dim), e))
    }

    /// Batched predictions, `(batch, n_buses, output_dim)`.
    pub fn forward_batch(
        &self,
        x: &Array3<f64>,
        physics: &PhysicsParams<'_>,
    ) -> NnResult<Array3<f64>> {
        let (batch, n, _) = x.dim();
        self.check_buses(n)?;
        let h = self
            .conv_layers
            .iter()
            .try_fold(x.clone(), |h, layer| layer.forward_batch(&h, physics))?;

        let width = n * self.gcn_channels;
        let flat = h
            .into_shape((batch, width))
            .map_err(|e| NnError::shape("flattened embedding", (batch, width), e))?;
        let last = self.head.len() - 1;
        let out = self
            .head
            .iter()
            .enumerate()
            .try_fold(flat, |z, (i, layer)| {
                let z = layer.forward_batch(&z)?;
                Ok::<_, NnError>(if i < last { relu(z) } else { z })
            })?;
        out.into_shape((batch, self.n_buses, self.output_dim))
            .map_err(|e| {
                NnError::shape("model output", (batch, self.n_buses, self.output_dim), e)
            })
    }

    fn check_buses(&self, n: usize) -> NnResult<()> {
        if n != self.n_buses {
            return Err(NnError::shape("bus count", self.n_buses, n));
        }
        Ok(())
    }
}

fn relu<D: ndarray::Dimension>(z: ndarray::Array<f64, D>) -> ndarray::Array<f64, D> {
    z.mapv_into(|v| v.max(0.0))
}
