use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NnError, NnResult};
use crate::init::fan_in_uniform;

/// Fully connected layer `y = x·W + b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    /// `(in_features, out_features)`
    pub weight: Array2<f64>,
    pub bias: Array1<f64>,
}

impl Linear {
    pub fn new<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> NnResult<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(NnError::Config(format!(
                "linear layer dimensions must be positive (in={in_features}, out={out_features})"
            )));
        }
        Ok(Self {
            weight: fan_in_uniform(in_features, out_features, rng),
            bias: Array1::zeros(out_features),
        })
    }

    pub fn in_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn forward(&self, x: &Array1<f64>) -> NnResult<Array1<f64>> {
        if x.len() != self.in_features() {
            return Err(NnError::shape("linear input", self.in_features(), x.len()));
        }
        Ok(x.dot(&self.weight) + &self.bias)
    }

    /// Row-wise over a `(batch, in_features)` matrix.
    pub fn forward_batch(&self, x: &Array2<f64>) -> NnResult<Array2<f64>> {
        if x.ncols() != self.in_features() {
            return Err(NnError::shape("linear input", self.in_features(), x.ncols()));
        }
        Ok(x.dot(&self.weight) + &self.bias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_forward_matches_batch_row() {
        let layer = Linear::new(3, 2, &mut StdRng::seed_from_u64(1)).unwrap();
        let x = array![0.5, -1.0, 2.0];
        let single = layer.forward(&x).unwrap();
        let batch = layer.forward_batch(&x.clone().insert_axis(ndarray::Axis(0))).unwrap();
        for (a, b) in batch.row(0).iter().zip(single.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rejects_wrong_width() {
        let layer = Linear::new(3, 2, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(layer.forward(&array![1.0, 2.0]).is_err());
        assert!(Linear::new(0, 2, &mut StdRng::seed_from_u64(1)).is_err());
    }
}
