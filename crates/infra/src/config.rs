//! Engine configuration.
//!
//! Loaded in layers:
//! 1. Default values in code
//! 2. Optional `wareflow.toml` (or another file stem)
//! 3. Environment variables with the `WAREFLOW_` prefix, `__` between
//!    nested keys (e.g. `WAREFLOW_PICKING__NUMBER_PREFIX=PK`)

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    pub picking: PickingConfig,
    pub notifications: NotificationConfig,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PickingConfig {
    /// Picking order numbers read `<prefix>-000001`.
    pub number_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Maximum undelivered notifications kept for a later flush.
    pub outbox_capacity: usize,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error(transparent)]
    Source(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl EngineConfig {
    /// Load from `wareflow.toml` in the working directory and the environment.
    pub fn load() -> Result<Self, ConfigLoadError> {
        Self::load_from("wareflow")
    }

    pub fn load_from(file: &str) -> Result<Self, ConfigLoadError> {
        let config = config::Config::builder()
            .set_default("picking.number_prefix", "PCK")?
            .set_default("notifications.enabled", true)?
            .set_default("notifications.outbox_capacity", 1024_i64)?
            .set_default("log_filter", "info")?
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix("WAREFLOW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Install the process-wide JSON subscriber with `log_filter` as the
    /// default directive. Later calls are no-ops.
    pub fn init_logging(&self) {
        wareflow_observability::init_with(&self.log_filter);
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.picking.number_prefix.trim().is_empty() {
            return Err(ConfigLoadError::Invalid(
                "picking.number_prefix cannot be empty".to_string(),
            ));
        }
        if self.notifications.outbox_capacity == 0 {
            return Err(ConfigLoadError::Invalid(
                "notifications.outbox_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            picking: PickingConfig {
                number_prefix: "PCK".to_string(),
            },
            notifications: NotificationConfig {
                enabled: true,
                outbox_capacity: 1024,
            },
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(name: &str, contents: &str) -> String {
        let path = std::env::temp_dir().join(format!("{name}-{}.toml", uuid::Uuid::now_v7()));
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let loaded = EngineConfig::load_from("does-not-exist/wareflow").unwrap();
        assert_eq!(loaded.picking.number_prefix, EngineConfig::default().picking.number_prefix);
        assert!(loaded.notifications.outbox_capacity > 0);
    }

    #[test]
    fn file_overrides_defaults() {
        let path = write_file(
            "wareflow-config",
            "log_filter = \"debug\"\n[picking]\nnumber_prefix = \"PK\"\n[notifications]\noutbox_capacity = 8\n",
        );
        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.picking.number_prefix, "PK");
        assert_eq!(loaded.notifications.outbox_capacity, 8);
        assert_eq!(loaded.log_filter, "debug");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn logging_starts_from_the_loaded_filter() {
        let path = write_file("wareflow-log", "log_filter = \"wareflow_infra=debug\"\n");
        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.log_filter, "wareflow_infra=debug");
        loaded.init_logging();
        loaded.init_logging();
        tracing::debug!(filter = %loaded.log_filter, "logging initialized");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn zero_outbox_capacity_is_rejected() {
        let path = write_file("wareflow-bad", "[notifications]\noutbox_capacity = 0\n");
        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid(_)));
        let _ = std::fs::remove_file(path);
    }
}
