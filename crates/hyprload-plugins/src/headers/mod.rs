//! Host header preparation.
//!
//! Plugins compile against the headers of the exact host build that will
//! load them. With an explicitly configured headers directory the headers are
//! taken as-is. Otherwise the host project is cloned beneath the plugin
//! root, checked out at the running host's commit, and its headers are
//! installed into `<root>/include`. Either way a `hyprland.pc` file is
//! written to the pkg-config override directory so build steps resolve the
//! right include paths.

mod barrier;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use self::barrier::HeaderBarrier;
use crate::error::PluginError;
use crate::paths::PluginPaths;
use crate::process::{CommandOutput, run_git, run_shell};

/// Tracing target for header preparation.
const HEADERS_TARGET: &str = "hyprload_plugins::headers";

/// Upstream repository of the host project.
pub const HOST_UPSTREAM_URL: &str = "https://github.com/hyprwm/Hyprland";

/// Name of the generated pkg-config file.
pub const PKG_CONFIG_FILE: &str = "hyprland.pc";

/// How the headers for a batch are obtained.
#[derive(Debug, Clone)]
pub struct HeaderSetup {
    paths: PluginPaths,
    configured: Option<PathBuf>,
    host_commit: Option<String>,
}

impl HeaderSetup {
    /// Describes header preparation for the host at `host_commit`.
    ///
    /// `configured` is the user's explicit headers directory, if any.
    #[must_use]
    pub fn new(paths: PluginPaths, configured: Option<PathBuf>, host_commit: Option<String>) -> Self {
        Self {
            paths,
            configured,
            host_commit,
        }
    }

    /// Directory holding the headers builds compile against.
    #[must_use]
    pub fn headers_dir(&self) -> PathBuf {
        self.configured
            .clone()
            .unwrap_or_else(|| self.paths.default_headers_dir())
    }

    /// Returns `true` when no checkout is needed.
    #[must_use]
    pub const fn is_immediate(&self) -> bool {
        self.configured.is_some()
    }

    /// Commit of the running host, if known.
    #[must_use]
    pub fn host_commit(&self) -> Option<&str> {
        self.host_commit.as_deref()
    }

    /// Path of the generated pkg-config file.
    #[must_use]
    pub fn pkg_config_file(&self) -> PathBuf {
        self.paths.pkg_config_dir().join(PKG_CONFIG_FILE)
    }

    /// Makes the headers available, blocking until done.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::HeadersUnready`] if the host checkout or header
    /// installation fails, or [`PluginError::Io`] if the pkg-config file
    /// cannot be written.
    pub fn prepare(&self) -> Result<(), PluginError> {
        if !self.is_immediate() {
            self.install_from_checkout()?;
        }
        self.write_pkg_config()?;
        Ok(())
    }

    /// Writes `hyprland.pc` pointing at [`HeaderSetup::headers_dir`].
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the file cannot be written.
    pub fn write_pkg_config(&self) -> Result<PathBuf, PluginError> {
        let dir = self.paths.pkg_config_dir();
        fs::create_dir_all(&dir).map_err(|source| PluginError::io(&dir, source))?;
        let file = self.pkg_config_file();
        let contents = pkg_config_contents(&self.headers_dir(), self.host_commit());
        fs::write(&file, contents).map_err(|source| PluginError::io(&file, source))?;
        debug!(target: HEADERS_TARGET, path = %file.display(), "wrote pkg-config file");
        Ok(file)
    }

    fn install_from_checkout(&self) -> Result<(), PluginError> {
        let commit = self.host_commit().ok_or_else(|| PluginError::HeadersUnready {
            message: String::from("could not determine the running host commit"),
        })?;
        let checkout = self.paths.host_checkout_dir();
        info!(target: HEADERS_TARGET, commit, path = %checkout.display(), "preparing host headers");

        if !checkout.join(".git").exists() {
            let target = checkout.display().to_string();
            require(
                "clone host source",
                &run_git(None, ["clone", "--recursive", HOST_UPSTREAM_URL, target.as_str()])?,
            )?;
        }
        require("fetch host source", &run_git(Some(&checkout), ["fetch", "origin"])?)?;
        require("check out host commit", &run_git(Some(&checkout), ["checkout", commit])?)?;
        require(
            "update host submodules",
            &run_git(Some(&checkout), ["submodule", "update", "--init"])?,
        )?;

        let script = format!("make installheaders PREFIX={}", self.paths.root().display());
        let no_env: &[(&str, &str)] = &[];
        require("install host headers", &run_shell(&script, &checkout, no_env)?)
    }
}

fn require(what: &str, output: &CommandOutput) -> Result<(), PluginError> {
    if output.success() {
        Ok(())
    } else {
        Err(PluginError::HeadersUnready {
            message: format!("failed to {what}: {}", output.combined()),
        })
    }
}

/// Renders a pkg-config description of the host headers under `headers_dir`.
#[must_use]
pub fn pkg_config_contents(headers_dir: &Path, version: Option<&str>) -> String {
    format!(
        "prefix={prefix}\n\
         includedir=${{prefix}}\n\
         \n\
         Name: Hyprland\n\
         URL: {HOST_UPSTREAM_URL}\n\
         Description: Hyprland header files\n\
         Version: {version}\n\
         Cflags: -I${{includedir}}/hyprland/protocols -I${{includedir}}/hyprland -I${{includedir}}\n",
        prefix = headers_dir.display(),
        version = version.unwrap_or("0"),
    )
}
