// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration file contents.
///
/// ```yaml
/// executor_options:
///   max_concurrency: 8
///   step_timeout_ms: 30000
/// graph_output: target/buildchain.dot
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    /// Where to write the assembled graph in DOT form, if anywhere.
    #[serde(default)]
    pub graph_output: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorOptions {
    /// Upper bound on concurrently running steps. Defaults to the number of
    /// available cores.
    pub max_concurrency: Option<usize>,
    /// Optional per-step time limit in milliseconds. Unset means no limit.
    pub step_timeout_ms: Option<u64>,
}

impl ExecutorOptions {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms.map(Duration::from_millis)
    }
}

enum Format {
    Yaml,
    Toml,
}

fn format_of(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => Ok(Format::Yaml),
        Some("toml") => Ok(Format::Toml),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Read an engine configuration, choosing YAML or TOML by file extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let format = format_of(path)?;
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };
    match format {
        Format::Yaml => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

/// [`load_config`], then reject values that can never work.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let cfg = load_config(path)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn validate_config(cfg: &EngineConfig) -> Result<(), ConfigError> {
    let options = &cfg.executor_options;
    if options.max_concurrency == Some(0) {
        return Err(ConfigError::Invalid {
            message: "executor_options.max_concurrency must be at least 1".into(),
        });
    }
    if options.step_timeout_ms == Some(0) {
        return Err(ConfigError::Invalid {
            message: "executor_options.step_timeout_ms must be at least 1; omit it to disable the timeout".into(),
        });
    }
    Ok(())
}
