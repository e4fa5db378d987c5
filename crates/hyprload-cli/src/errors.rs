//! Error types for the driver runtime.

use std::io;
use std::sync::Arc;

use hyprload_plugins::PluginError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Plugins(#[from] PluginError),
    #[error("failed to read dispatcher input: {0}")]
    ReadInput(io::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
    #[error("{failures} plugin(s) failed to {kind}")]
    BatchFailed { kind: String, failures: usize },
}
