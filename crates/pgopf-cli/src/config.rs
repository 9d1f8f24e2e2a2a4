//! Experiment configuration loaded from TOML.
//!
//! Every section is optional; missing keys take their defaults.
//!
//! ```toml
//! name = "case6ww-baseline"
//! seed = 42
//!
//! [features]
//! num_iterations = 4
//!
//! [features.solve]
//! tolerance = 1e-8
//! max_iterations = 10
//!
//! [model]
//! name = "01_gcnn_gao"
//! in_channels = 8
//! fc_hidden_dim = 1000
//! ```

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pgopf_algo::SolveOptions;
use pgopf_nn::ModelConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub name: String,
    pub seed: u64,
    pub model: ModelConfig,
    pub features: FeatureConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "experiment".to_string(),
            seed: 42,
            model: ModelConfig::default(),
            features: FeatureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// K, the number of voltage iterates
    pub num_iterations: usize,
    pub solve: SolveOptions,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            num_iterations: 4,
            solve: SolveOptions::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("parsing TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.num_iterations == 0 {
            bail!("features.num_iterations must be at least 1");
        }
        self.model.validate()?;
        let width = 2 * self.features.num_iterations;
        if self.model.in_channels != width {
            bail!(
                "model.in_channels ({}) must equal 2 * features.num_iterations ({width})",
                self.model.in_channels
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgopf_nn::ModelKind;
    use std::io::Write;

    #[test]
    fn test_defaults_are_consistent() {
        let config = ExperimentConfig::default();
        config.validate().unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.features.num_iterations, 4);
        assert_eq!(config.model.name, ModelKind::GcnnGao01);
    }

    #[test]
    fn test_partial_toml() {
        let config = ExperimentConfig::from_toml_str(
            r#"
            name = "small"

            [features]
            num_iterations = 3

            [model]
            in_channels = 6
            fc_hidden_dim = 32
            "#,
        )
        .unwrap();
        assert_eq!(config.name, "small");
        assert_eq!(config.seed, 42);
        assert_eq!(config.model.in_channels, 6);
        assert_eq!(config.model.num_gcn_layers, 3);
        assert_eq!(config.features.solve, SolveOptions::default());
    }

    #[test]
    fn test_channel_mismatch_rejected() {
        let err = ExperimentConfig::from_toml_str("[features]\nnum_iterations = 3\n").unwrap_err();
        assert!(format!("{err:#}").contains("in_channels"));
    }

    #[test]
    fn test_unknown_model_rejected_at_parse() {
        let err = ExperimentConfig::from_toml_str("[model]\nname = \"resnet\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("unknown variant"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed = 7").unwrap();
        let config = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(config.seed, 7);

        let missing = ExperimentConfig::load(Path::new("/nonexistent/pgopf.toml")).unwrap_err();
        assert!(missing.to_string().contains("reading config"));
    }
}
