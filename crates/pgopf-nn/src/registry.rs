//! Supported model architectures.
//!
//! The set of models is closed: [`ModelKind`] lists every architecture and
//! [`ModelKind::build`] is the dispatch table. Unknown model ids fail when a
//! configuration is parsed, not when a model is built.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Array3};
use pgopf_algo::PhysicsParams;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NnError, NnResult};
use crate::model::Gcnn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelKind {
    /// Physics-guided GCNN with a dense prediction head
    #[default]
    #[serde(rename = "01_gcnn_gao")]
    GcnnGao01,
}

impl ModelKind {
    pub const ALL: &'static [ModelKind] = &[ModelKind::GcnnGao01];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::GcnnGao01 => "01_gcnn_gao",
        }
    }

    /// Supported ids, sorted.
    pub fn available() -> Vec<&'static str> {
        let mut ids: Vec<_> = Self::ALL.iter().map(|k| k.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn build<R: Rng + ?Sized>(
        &self,
        config: &ModelConfig,
        n_buses: usize,
        rng: &mut R,
    ) -> NnResult<Model> {
        match self {
            ModelKind::GcnnGao01 => Ok(Model::GcnnGao01(Gcnn::new(n_buses, config, rng)?)),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = NnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| NnError::UnknownModel {
                name: s.to_string(),
                supported: Self::available().join(", "),
            })
    }
}

/// Model hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: ModelKind,
    /// Node feature width, `2K`
    pub in_channels: usize,
    pub gcn_channels: usize,
    pub num_gcn_layers: usize,
    pub num_fc_layers: usize,
    pub fc_hidden_dim: usize,
    /// Outputs per bus (`[P_G, V_G]` by default)
    pub output_dim: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: ModelKind::default(),
            in_channels: 8,
            gcn_channels: 8,
            num_gcn_layers: 3,
            num_fc_layers: 3,
            fc_hidden_dim: 1000,
            output_dim: 2,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> NnResult<()> {
        let positive = [
            ("in_channels", self.in_channels),
            ("gcn_channels", self.gcn_channels),
            ("num_gcn_layers", self.num_gcn_layers),
            ("num_fc_layers", self.num_fc_layers),
            ("output_dim", self.output_dim),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(NnError::Config(format!("{field} must be positive")));
        }
        if self.num_fc_layers > 1 && self.fc_hidden_dim == 0 {
            return Err(NnError::Config(
                "fc_hidden_dim must be positive with more than one fc layer".to_string(),
            ));
        }
        if self.in_channels % 2 != 0 {
            return Err(NnError::Config(format!(
                "in_channels must be even, got {}",
                self.in_channels
            )));
        }
        if self.num_gcn_layers > 1 && self.gcn_channels % 2 != 0 {
            return Err(NnError::Config(format!(
                "gcn_channels must be even when layers are stacked, got {}",
                self.gcn_channels
            )));
        }
        Ok(())
    }
}

/// A built model of one of the supported kinds.
#[derive(Debug, Clone)]
pub enum Model {
    GcnnGao01(Gcnn),
}

impl Model {
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::GcnnGao01(_) => ModelKind::GcnnGao01,
        }
    }

    pub fn forward(&self, x: &Array2<f64>, physics: &PhysicsParams<'_>) -> NnResult<Array2<f64>> {
        match self {
            Model::GcnnGao01(m) => m.forward(x, physics),
        }
    }

    pub fn forward_batch(
        &self,
        x: &Array3<f64>,
        physics: &PhysicsParams<'_>,
    ) -> NnResult<Array3<f64>> {
        match self {
            Model::GcnnGao01(m) => m.forward_batch(x, physics),
        }
    }

    pub fn parameter_count(&self) -> usize {
        match self {
            Model::GcnnGao01(m) => m.parameter_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_parse_known_and_unknown() {
        assert_eq!("01_gcnn_gao".parse::<ModelKind>().unwrap(), ModelKind::GcnnGao01);
        let err = "gat".parse::<ModelKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown model 'gat'; supported: 01_gcnn_gao"
        );
    }

    #[test]
    fn test_available_sorted() {
        assert_eq!(ModelKind::available(), vec!["01_gcnn_gao"]);
        assert_eq!(ModelKind::GcnnGao01.to_string(), "01_gcnn_gao");
    }

    #[test]
    fn test_default_config_matches_paper_settings() {
        let c = ModelConfig::default();
        assert_eq!(
            (c.in_channels, c.gcn_channels, c.num_gcn_layers, c.num_fc_layers),
            (8, 8, 3, 3)
        );
        assert_eq!((c.fc_hidden_dim, c.output_dim), (1000, 2));
        c.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero_fields() {
        let config = ModelConfig {
            num_gcn_layers: 0,
            ..ModelConfig::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("num_gcn_layers"));
        let config = ModelConfig {
            in_channels: 5,
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_dispatch() {
        let config = ModelConfig {
            fc_hidden_dim: 32,
            ..ModelConfig::default()
        };
        let model = ModelKind::GcnnGao01
            .build(&config, 6, &mut StdRng::seed_from_u64(42))
            .unwrap();
        assert_eq!(model.kind(), ModelKind::GcnnGao01);
        // 3 conv layers of 2*(4*8) + 2*8 plus fc 48->32->32->12
        let expected = 3 * (64 + 16) + (48 * 32 + 32) + (32 * 32 + 32) + (32 * 12 + 12);
        assert_eq!(model.parameter_count(), expected);
    }
}
