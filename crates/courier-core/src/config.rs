//! Processor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;

/// Settings for one message processor.
///
/// `dequeue_interval_ms == 0` means an idle worker retries immediately.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProcessorConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_executor_count")]
    pub executor_count: usize,

    #[serde(default)]
    pub dequeue_interval_ms: u64,
}

fn default_name() -> String {
    "message-processor".to_string()
}

fn default_executor_count() -> usize {
    1
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            executor_count: default_executor_count(),
            dequeue_interval_ms: 0,
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from files and environment.
    ///
    /// Sources, later ones win:
    /// 1. `courier.toml` in the working directory (optional)
    /// 2. Environment variables with the `COURIER__` prefix,
    ///    e.g. `COURIER__EXECUTOR_COUNT=4`
    pub fn load() -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("courier").required(false))
            .add_source(
                config::Environment::with_prefix("COURIER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: ProcessorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ProcessorConfig = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.executor_count == 0 {
            return Err(ConfigError::NoExecutors {
                processor: self.name.clone(),
            });
        }
        Ok(())
    }

    pub fn dequeue_interval(&self) -> Duration {
        Duration::from_millis(self.dequeue_interval_ms)
    }
}
