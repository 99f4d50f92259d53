//! Scenario and engine configuration loaded from YAML.

use crate::snapshot::WorldSnapshot;
use serde::{Deserialize, Serialize};
use sim_ai::EligibilityLimits;
use sim_core::{validate_producer, Producer, SimConfig, ValidationError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tunables of the decision engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub eligibility: EligibilityLimits,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let l = &self.eligibility;
        let checks = [
            ("market_pipeline_share", l.market_pipeline_share),
            ("technology_pipeline_ratio", l.technology_pipeline_ratio),
            ("technology_pipeline_floor_mw", l.technology_pipeline_floor_mw),
        ];
        for (field, value) in checks {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Engine { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid scenario: {0}")]
    Invalid(#[from] ValidationError),
    #[error("producer {producer}: {source}")]
    Producer {
        producer: String,
        source: ValidationError,
    },
    #[error("engine setting {field} = {value} must be finite and non-negative")]
    Engine { field: &'static str, value: f64 },
}

/// A complete simulation setup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub sim: SimConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub world: WorldSnapshot,
    #[serde(default)]
    pub producers: Vec<Producer>,
}

impl Scenario {
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Check the engine settings, the world and every producer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.world.validate()?;
        let mut ids = BTreeSet::new();
        for p in &self.producers {
            let wrap = |source: ValidationError| ConfigError::Producer {
                producer: p.id.to_string(),
                source,
            };
            validate_producer(p).map_err(wrap)?;
            if !ids.insert(&p.id) {
                return Err(wrap(ValidationError::DuplicateId(p.id.to_string())));
            }
            if !self.world.markets.iter().any(|m| m.id == p.investor_market) {
                return Err(wrap(ValidationError::UnknownReference(format!(
                    "market {}",
                    p.investor_market
                ))));
            }
        }
        Ok(())
    }
}
