//! Filesystem layout beneath the plugin root.
//!
//! ```text
//! <root>/plugins/bin/            shared built artifacts
//! <root>/plugins/session.<id>/   per-run staged copies plus `lock`
//! <root>/plugins/src/<name>...   git clone paths
//! <root>/include/                default host headers
//! <root>/pkgconfig/              pkg-config override directory
//! <root>/hyprland/               host source checkout used for headers
//! <root>/src/                    the manager's own source checkout
//! ```

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PluginError;

/// Prefix of session directory names.
pub const SESSION_PREFIX: &str = "session.";

/// File name of the lock guarding a session directory.
pub const SESSION_LOCK_FILE: &str = "lock";

/// Extension of loadable plugin binaries on this platform.
pub const PLUGIN_EXTENSION: &str = std::env::consts::DLL_EXTENSION;

/// Canonical paths derived from the plugin root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPaths {
    root: PathBuf,
    plugins_dir: PathBuf,
    binaries_dir: PathBuf,
    sources_dir: PathBuf,
}

impl PluginPaths {
    /// Derives the layout for `root` without touching the filesystem.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let plugins_dir = root.join("plugins");
        Self {
            binaries_dir: plugins_dir.join("bin"),
            sources_dir: plugins_dir.join("src"),
            plugins_dir,
            root,
        }
    }

    /// Creates the directories every operation expects to exist.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if a directory cannot be created.
    pub fn ensure(&self) -> Result<(), PluginError> {
        for dir in [&self.binaries_dir, &self.sources_dir] {
            fs::create_dir_all(dir).map_err(|source| PluginError::io(dir.as_path(), source))?;
        }
        Ok(())
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding binaries, sources, and sessions.
    #[must_use]
    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Directory of shared built artifacts.
    #[must_use]
    pub fn binaries_dir(&self) -> &Path {
        &self.binaries_dir
    }

    /// Directory of git clones.
    #[must_use]
    pub fn sources_dir(&self) -> &Path {
        &self.sources_dir
    }

    /// Shared artifact path for the plugin called `name`.
    #[must_use]
    pub fn binary_path(&self, name: &str) -> PathBuf {
        self.binaries_dir.join(binary_file_name(name))
    }

    /// Directory of the session identified by `id`.
    #[must_use]
    pub fn session_dir(&self, id: &str) -> PathBuf {
        self.plugins_dir.join(format!("{SESSION_PREFIX}{id}"))
    }

    /// Default host headers directory.
    #[must_use]
    pub fn default_headers_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    /// Directory injected as `PKG_CONFIG_PATH` for builds.
    #[must_use]
    pub fn pkg_config_dir(&self) -> PathBuf {
        self.root.join("pkgconfig")
    }

    /// Host source checkout used to prepare headers.
    #[must_use]
    pub fn host_checkout_dir(&self) -> PathBuf {
        self.root.join("hyprland")
    }

    /// The manager's own source checkout.
    #[must_use]
    pub fn self_source_dir(&self) -> PathBuf {
        self.root.join("src")
    }
}

/// File name of the shared artifact for `name`.
#[must_use]
pub fn binary_file_name(name: &str) -> String {
    format!("{name}.{PLUGIN_EXTENSION}")
}

/// Returns `true` when `path` has the platform plugin extension.
#[must_use]
pub fn is_plugin_binary(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(PLUGIN_EXTENSION))
}

/// Extracts the identifier from a `session.<id>` directory name.
#[must_use]
pub fn session_id_from_name(name: &str) -> Option<&str> {
    name.strip_prefix(SESSION_PREFIX)
        .filter(|id| !id.is_empty())
}
