use anyhow::{anyhow, Result};
use ciscope_diff::SamplingConfig;
use ciscope_inspect::InspectConfig;
use ciscope_protocol::env::{non_empty_var, CONFIG_ENV, WORKSPACE_ENV};
use ciscope_protocol::load_json_file;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    inspect: InspectConfig,
    sampling: SamplingConfig,
}

/// Server-wide settings: `CISCOPE_CONFIG` file, then environment overrides.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Default workspace when a tool call does not name one.
    pub workspace: PathBuf,
    pub inspect: InspectConfig,
    pub sampling: SamplingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            inspect: InspectConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        let file = match non_empty_var(CONFIG_ENV) {
            Some(path) => load_json_file::<ConfigFile>(&PathBuf::from(path))?,
            None => ConfigFile::default(),
        };
        let config = Self {
            workspace: non_empty_var(WORKSPACE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            inspect: file.inspect.with_env_overrides(),
            sampling: file.sampling.with_env_overrides(),
        };
        config
            .inspect
            .validate()
            .map_err(|err| anyhow!("Invalid inspect config: {err}"))?;
        config
            .sampling
            .validate()
            .map_err(|err| anyhow!("Invalid sampling config: {err}"))?;
        Ok(config)
    }
}
