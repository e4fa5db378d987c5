//! Domain errors raised by plugin source, build, and session operations.
//!
//! All errors use a `thiserror`-derived enum with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint and so a worker's error can
//! be handed across the result channel unchanged.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin source could not be fetched into its local path.
    #[error("source '{source_name}' is unavailable: {message}")]
    SourceUnavailable {
        /// Display name of the source (URL or path).
        source_name: String,
        /// Human-readable failure description.
        message: String,
    },

    /// Bringing an existing source up to date failed.
    #[error("source '{source_name}' could not be updated: {message}")]
    StaleSource {
        /// Display name of the source (URL or path).
        source_name: String,
        /// Human-readable failure description.
        message: String,
    },

    /// A manifest build step exited with a non-zero status.
    #[error("build of '{name}' failed with status {status}: {output}")]
    BuildFailed {
        /// Plugin name.
        name: String,
        /// Exit status of the build script.
        status: i32,
        /// Combined stdout and stderr of the build script.
        output: String,
    },

    /// The source manifest is missing or malformed.
    #[error("manifest error: {message}")]
    Manifest {
        /// Description of the manifest problem.
        message: String,
    },

    /// The build succeeded but the declared artifact does not exist.
    #[error("plugin '{name}' binary does not exist at {path}")]
    ArtifactMissing {
        /// Plugin name.
        name: String,
        /// Declared artifact path that was checked.
        path: PathBuf,
    },

    /// Another process claimed the session directory or its lock.
    #[error("session at {path} is claimed by another process")]
    SessionCollision {
        /// Session lock path that could not be claimed.
        path: PathBuf,
    },

    /// The host header setup reported failure.
    #[error("Failed to setup host headers: {message}")]
    HeadersUnready {
        /// Failure reported by the header setup task.
        message: String,
    },

    /// An external program could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The user configuration document is invalid.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// The host rejected a command.
    #[error("host command '{command}' failed: {message}")]
    Host {
        /// Command that was invoked.
        command: String,
        /// Failure description reported by the host.
        message: String,
    },

    /// Wraps an error with the operation and plugin it belongs to.
    #[error("Failed to {operation} {subject}: {source}")]
    Context {
        /// Operation that failed, such as `install` or `update`.
        operation: &'static str,
        /// What the operation targeted, such as `hyprfoo source`.
        subject: String,
        /// Underlying error.
        #[source]
        source: Box<PluginError>,
    },
}

impl PluginError {
    /// Builds an [`PluginError::Io`] from a path and an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Wraps `self` with an operation and subject prefix.
    #[must_use]
    pub fn context(self, operation: &'static str, subject: impl Into<String>) -> Self {
        Self::Context {
            operation,
            subject: subject.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error beneath any [`PluginError::Context`] layers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
