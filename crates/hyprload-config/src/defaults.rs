//! Default values used when a settings layer leaves a key unset.

use std::env;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Directory name used beneath the data and config directories.
const APP_DIR: &str = "hyprload";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Computes the default plugin root, `$XDG_DATA_HOME/hyprload`.
///
/// Falls back to `~/.local/share/hyprload` and finally to the temporary
/// directory when no home directory can be determined.
#[must_use]
pub fn default_root_path() -> PathBuf {
    if let Some(mut dir) = dirs::data_dir() {
        dir.push(APP_DIR);
        return dir;
    }
    if let Some(mut dir) = dirs::home_dir() {
        dir.push(".local/share");
        dir.push(APP_DIR);
        return dir;
    }
    env::temp_dir().join(APP_DIR)
}

/// Computes the default user configuration document path,
/// `$XDG_CONFIG_HOME/hypr/hyprload.toml`.
#[must_use]
pub fn default_user_config_path() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(env::temp_dir);
    base.join("hypr").join("hyprload.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_ends_with_application_directory() {
        let root = default_root_path();
        assert!(root.ends_with(APP_DIR), "unexpected root: {}", root.display());
    }

    #[test]
    fn user_config_path_points_at_hypr_directory() {
        let path = default_user_config_path();
        assert!(path.ends_with("hypr/hyprload.toml"));
    }
}
