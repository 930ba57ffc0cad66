use anyhow::{anyhow, Result};
use ciscope_diff::SamplingConfig;
use ciscope_inspect::InspectConfig;
use ciscope_protocol::env::{non_empty_var, CONFIG_ENV, WORKSPACE_ENV};
use ciscope_protocol::load_json_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything the CLI reads from `--config` / `CISCOPE_CONFIG`.
///
/// Precedence, lowest first: defaults, config file, environment, flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub inspect: InspectConfig,
    pub sampling: SamplingConfig,
}

impl AppConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| non_empty_var(CONFIG_ENV).map(PathBuf::from));
        let config = match path {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                load_json_file::<Self>(&path)?
            }
            None => Self::default(),
        };
        Ok(Self {
            inspect: config.inspect.with_env_overrides(),
            sampling: config.sampling.with_env_overrides(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.inspect
            .validate()
            .map_err(|err| anyhow!("Invalid inspect config: {err}"))?;
        self.sampling
            .validate()
            .map_err(|err| anyhow!("Invalid sampling config: {err}"))?;
        Ok(())
    }
}

/// `--workspace`, else `CISCOPE_WORKSPACE`, else the current directory.
pub fn resolve_workspace(flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| non_empty_var(WORKSPACE_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ciscope.json");
        std::fs::write(
            &path,
            r#"{"inspect": {"thresholds": {"large_bytes": 400000}}, "sampling": {"small_threshold": 50}}"#,
        )
        .expect("write config");

        let config: AppConfig = load_json_file(&path).expect("load");
        assert_eq!(config.inspect.thresholds.large_bytes, 400_000);
        assert_eq!(config.inspect.thresholds.small_bytes, 50_000);
        assert_eq!(config.sampling.small_threshold, 50);
        assert_eq!(config.sampling.medium_threshold, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        let mut config = AppConfig::default();
        config.inspect.thresholds.small_bytes = 300_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("inspect"));
    }

    #[test]
    fn explicit_workspace_wins() {
        assert_eq!(
            resolve_workspace(Some(Path::new("/tmp/ws"))),
            PathBuf::from("/tmp/ws")
        );
    }
}
