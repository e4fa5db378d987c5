//! Layered settings for the plugin manager.

use std::path::{Path, PathBuf};

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_log_filter, default_log_format, default_root_path, default_user_config_path,
};
use crate::logging::LogFormat;

/// Settings consumed by the plugin manager and its host driver.
///
/// These are the values the host exposes as `plugin:hyprload:*` keys. Each
/// field is optional so a layer can leave it untouched; use the accessors to
/// read the resolved value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HYPRLOAD")]
pub struct Settings {
    /// Root directory holding plugin sources, binaries, and sessions.
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Path to the user configuration document listing plugins.
    #[serde(default)]
    pub config: Option<PathBuf>,
    /// Explicit host headers directory. When set, header setup is skipped.
    #[serde(default)]
    pub hyprland_headers: Option<PathBuf>,
    /// Suppresses informational notifications.
    #[serde(default)]
    pub quiet: Option<bool>,
    /// Enables debug notifications.
    #[serde(default)]
    pub debug: Option<bool>,
    /// Log filter expression understood by `tracing-subscriber`.
    #[serde(default)]
    pub log_filter: Option<String>,
    /// Output format for structured logs.
    #[serde(default)]
    pub log_format: Option<LogFormat>,
}

impl Settings {
    /// Returns the plugin root directory.
    #[must_use]
    pub fn root_path(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(default_root_path)
    }

    /// Returns the user configuration document path.
    #[must_use]
    pub fn user_config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_user_config_path)
    }

    /// Returns the configured headers directory, ignoring empty values.
    #[must_use]
    pub fn headers_override(&self) -> Option<&Path> {
        self.hyprland_headers
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    /// Returns whether informational notifications are suppressed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet.unwrap_or(false)
    }

    /// Returns whether debug notifications are enabled.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    /// Returns the log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(default_log_filter())
    }

    /// Returns the log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or(default_log_format())
    }
}
