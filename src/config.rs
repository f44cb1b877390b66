//! Experiment configuration.
//!
//! A JSON file with the keys below; unknown keys (output directories,
//! preprocessing switches) are ignored so one file can drive the whole
//! pipeline.
//!
//! | key             | default    |                                               |
//! |-----------------|------------|-----------------------------------------------|
//! | `name`          | required   | experiment name                               |
//! | `algo`          | `"cyk"`    | `"cyk"` or `"parse_tree"` for positives       |
//! | `neg_mode`      | none       | `"auto"` or `"manual"`                        |
//! | `neg_data`      | none       | negatives file, required for `"manual"`       |
//! | `max_neg_len`   | 5          | exclusive bound on sampled lengths            |
//! | `neg_ratio`     | 0.1        | largest fraction of each length to sample     |
//! | `neg_per_len`   | 5          | largest count per length                      |
//! | `restrict_term` | required   | at most one terminal per nonterminal          |
//! | `relax_chomsky` | required   | allow the start symbol on right-hand sides    |
//! | `seed`          | 142857     | sampler seed                                  |

use crate::grammar::GrammarConfig;
use crate::harness::Algo;
use crate::sampling::{SamplingConfig, SamplingError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("neg_mode \"manual\" requires neg_data")]
    MissingNegData,
    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

/// How negative examples are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegMode {
    Auto,
    Manual,
}

fn default_max_neg_len() -> usize {
    SamplingConfig::default().max_len
}

fn default_neg_ratio() -> f64 {
    SamplingConfig::default().neg_ratio
}

fn default_neg_per_len() -> usize {
    SamplingConfig::default().neg_per_len
}

fn default_seed() -> u64 {
    142857
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(default)]
    pub algo: Algo,
    #[serde(default)]
    pub neg_mode: Option<NegMode>,
    #[serde(default)]
    pub neg_data: Option<PathBuf>,
    #[serde(default = "default_max_neg_len")]
    pub max_neg_len: usize,
    #[serde(default = "default_neg_ratio")]
    pub neg_ratio: f64,
    #[serde(default = "default_neg_per_len")]
    pub neg_per_len: usize,
    pub restrict_term: bool,
    pub relax_chomsky: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl ExperimentConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ExperimentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neg_mode == Some(NegMode::Manual) && self.neg_data.is_none() {
            return Err(ConfigError::MissingNegData);
        }
        if self.neg_mode == Some(NegMode::Auto) {
            self.sampling_config().validate()?;
        }
        Ok(())
    }

    pub fn grammar_config(&self) -> GrammarConfig {
        GrammarConfig {
            relax_chomsky: self.relax_chomsky,
            restrict_term: self.restrict_term,
        }
    }

    pub fn sampling_config(&self) -> SamplingConfig {
        SamplingConfig {
            max_len: self.max_neg_len,
            neg_ratio: self.neg_ratio,
            neg_per_len: self.neg_per_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ExperimentConfig::from_json_str(
            r#"{"name": "pos", "restrict_term": true, "relax_chomsky": false}"#,
        )
        .unwrap();
        assert_eq!(config.algo, Algo::Cyk);
        assert_eq!(config.neg_mode, None);
        assert_eq!(config.seed, 142857);
        assert_eq!(config.sampling_config(), SamplingConfig::default());
        assert_eq!(
            config.grammar_config(),
            GrammarConfig {
                relax_chomsky: false,
                restrict_term: true,
            }
        );
    }

    #[test]
    fn test_pipeline_keys_are_ignored() {
        let config = ExperimentConfig::from_json_str(
            r#"{
                "name": "wsj",
                "out_dir": "runs",
                "data": "data/wsj.txt",
                "small_vocab": true,
                "algo": "parse_tree",
                "neg_mode": "auto",
                "max_neg_len": 4,
                "neg_ratio": 0.2,
                "neg_per_len": 3,
                "restrict_term": false,
                "relax_chomsky": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.algo, Algo::ParseTree);
        assert_eq!(config.neg_mode, Some(NegMode::Auto));
        assert_eq!(config.sampling_config().max_len, 4);
        assert!(config.grammar_config().relax_chomsky);
    }

    #[test]
    fn test_required_flags() {
        let err = ExperimentConfig::from_json_str(r#"{"name": "x", "restrict_term": true}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_manual_needs_data() {
        let err = ExperimentConfig::from_json_str(
            r#"{"name": "x", "neg_mode": "manual", "restrict_term": true, "relax_chomsky": false}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingNegData));
    }

    #[test]
    fn test_bad_ratio() {
        let err = ExperimentConfig::from_json_str(
            r#"{"name": "x", "neg_mode": "auto", "neg_ratio": -1.0, "restrict_term": true, "relax_chomsky": false}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Sampling(SamplingError::InvalidRatio(_))));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "f", "seed": 7, "restrict_term": false, "relax_chomsky": false}}"#
        )
        .unwrap();
        let config = ExperimentConfig::from_path(file.path()).unwrap();
        assert_eq!(config.name, "f");
        assert_eq!(config.seed, 7);

        let missing = ExperimentConfig::from_path(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
