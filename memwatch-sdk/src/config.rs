//! Configuration validation.
//!
//! Options themselves are plain data ([`MonitorOptions`] in
//! `memwatch-types`); validation happens once, at monitor construction.
//! An invalid configuration is a programmer error, so it fails fast here
//! rather than degrading at runtime.

use memwatch_types::MonitorOptions;
use thiserror::Error;

/// A rejected monitor configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("monitoring interval must be greater than zero")]
    ZeroMonitoringInterval,

    #[error("gc interval must be greater than zero")]
    ZeroGcInterval,

    #[error("memory threshold must be greater than zero")]
    ZeroMemoryThreshold,

    #[error("alert threshold must be within (0, 1], got {0}")]
    AlertThresholdOutOfRange(f64),
}

/// Validate options before a monitor is built from them.
pub(crate) fn validate(options: &MonitorOptions) -> Result<(), ConfigError> {
    if options.monitoring_interval_ms == 0 {
        return Err(ConfigError::ZeroMonitoringInterval);
    }
    if options.gc_interval_ms == 0 {
        return Err(ConfigError::ZeroGcInterval);
    }
    if options.memory_threshold == 0 {
        return Err(ConfigError::ZeroMemoryThreshold);
    }
    if !(options.alert_threshold > 0.0 && options.alert_threshold <= 1.0) {
        return Err(ConfigError::AlertThresholdOutOfRange(options.alert_threshold));
    }
    Ok(())
}
