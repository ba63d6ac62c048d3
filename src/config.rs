/*!
Runtime configuration.

Loaded from a JSON file; every field is optional:

```json
{
  "max_workers": 10,
  "fail_fast": false,
  "incomplete_error_ratio": 0.25,
  "management_interfaces": ["MgmtEth0/RP0/CPU0/0"],
  "fetch_timeout": "30s",
  "inventory_path": "hosts.json"
}
```
*/

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::topology::{
    builder::{DEFAULT_INCOMPLETE_ERROR_RATIO, TopologyGraphBuilder},
    collector::{DEFAULT_MAX_WORKERS, ParallelCollector},
    inference::{DEFAULT_MANAGEMENT_INTERFACES, SubnetLinkInferencer},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("incomplete_error_ratio must be within (0, 1], got {0}")]
    InvalidRatio(f64),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopologyConfig {
    pub max_workers: usize,
    pub fail_fast: bool,
    pub incomplete_error_ratio: f64,
    pub management_interfaces: Vec<String>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub fetch_timeout: Option<Duration>,
    pub inventory_path: Option<PathBuf>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            fail_fast: false,
            incomplete_error_ratio: DEFAULT_INCOMPLETE_ERROR_RATIO,
            management_interfaces: DEFAULT_MANAGEMENT_INTERFACES
                .iter()
                .map(|name| name.to_string())
                .collect(),
            fetch_timeout: None,
            inventory_path: None,
        }
    }
}

impl TopologyConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.incomplete_error_ratio > 0.0 && self.incomplete_error_ratio <= 1.0) {
            return Err(ConfigError::InvalidRatio(self.incomplete_error_ratio));
        }
        Ok(())
    }

    pub fn collector(&self) -> ParallelCollector {
        ParallelCollector::new(self.max_workers).with_fail_fast(self.fail_fast)
    }

    pub fn inferencer(&self) -> SubnetLinkInferencer {
        SubnetLinkInferencer::new(self.management_interfaces.iter().cloned())
    }

    pub fn builder(&self) -> TopologyGraphBuilder {
        TopologyGraphBuilder::new(self.incomplete_error_ratio)
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|value| humantime::parse_duration(&value).map_err(serde::de::Error::custom))
        .transpose()
}
