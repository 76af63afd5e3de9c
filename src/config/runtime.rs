// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::default_concurrency;
use crate::config::EngineConfig;
use crate::engine::ChainExecutor;

pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build an executor from configuration. Unset options take their defaults.
    pub fn from_config(cfg: &EngineConfig) -> ChainExecutor {
        let options = &cfg.executor_options;
        let executor = ChainExecutor::new(options.max_concurrency.unwrap_or_else(default_concurrency));
        match options.step_timeout() {
            Some(timeout) => executor.with_step_timeout(timeout),
            None => executor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorOptions;
    use std::time::Duration;

    #[test]
    fn test_from_config_applies_options() {
        let cfg = EngineConfig {
            executor_options: ExecutorOptions {
                max_concurrency: Some(3),
                step_timeout_ms: Some(1500),
            },
            graph_output: None,
        };
        let executor = RuntimeBuilder::from_config(&cfg);
        assert_eq!(executor.max_concurrency(), 3);
        assert_eq!(executor.step_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_from_default_config() {
        let executor = RuntimeBuilder::from_config(&EngineConfig::default());
        assert_eq!(executor.max_concurrency(), default_concurrency());
        assert_eq!(executor.step_timeout(), None);
    }
}
