//! Tracing subscriber initialisation.
//!
//! Library code only emits `tracing` events. The embedding application calls
//! [`init_tracing`] once at startup to install a subscriber.

use crate::{PlumeError, PlumeResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to startup events.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Default log level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Whether to include the event target in output.
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

fn default_service_name() -> String {
    "plume".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            with_target: default_with_target(),
        }
    }
}

impl TelemetryConfig {
    /// Builds the filter directive used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_directive(&self) -> String {
        format!("{},plume=debug", self.log_level.to_lowercase())
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> PlumeResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let result = match config.log_format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    result.map_err(|e| PlumeError::internal(format!("Failed to install tracing subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        log_format = ?config.log_format,
        "Tracing initialized"
    );

    Ok(())
}
