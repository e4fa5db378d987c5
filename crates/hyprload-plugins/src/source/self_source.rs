use std::path::{Path, PathBuf};

use super::git::tracking_branch_is_current;
use super::{BuildContext, HOST_COMMIT_ENV, PKG_CONFIG_ENV};
use crate::error::PluginError;
use crate::paths::PluginPaths;
use crate::process::{run_git, run_shell};

/// Upstream repository of the manager itself.
pub const SELF_UPSTREAM_URL: &str = "https://github.com/Duckonaut/hyprload.git";

/// Script that builds and installs the manager from its checkout.
const SELF_BUILD_SCRIPT: &str = "make install";

/// The manager's own checkout, kept current by `update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfSource {
    path: PathBuf,
}

impl SelfSource {
    /// Locates the checkout beneath the plugin root.
    #[must_use]
    pub fn new(paths: &PluginPaths) -> Self {
        Self {
            path: paths.self_source_dir(),
        }
    }

    /// Checkout directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn install_source(&self) -> Result<(), PluginError> {
        let path = self.path.display().to_string();
        let output = run_git(None, ["clone", SELF_UPSTREAM_URL, path.as_str()])?;
        if !output.success() {
            return Err(PluginError::SourceUnavailable {
                source_name: SELF_UPSTREAM_URL.to_owned(),
                message: format!("Failed to clone own source: {}", output.combined()),
            });
        }
        Ok(())
    }

    pub(super) fn is_source_available(&self) -> bool {
        self.path.join(".git").exists()
    }

    pub(super) fn is_up_to_date(&self) -> bool {
        self.is_source_available() && tracking_branch_is_current(&self.path)
    }

    pub(super) fn update(&self, context: &BuildContext) -> Result<(), PluginError> {
        if self.is_source_available() {
            let output = run_git(Some(&self.path), ["pull"])?;
            if !output.success() {
                return Err(PluginError::StaleSource {
                    source_name: SELF_UPSTREAM_URL.to_owned(),
                    message: format!("Failed to update own source: {}", output.combined()),
                });
            }
        }
        self.install(context)
    }

    pub(super) fn install(&self, context: &BuildContext) -> Result<(), PluginError> {
        if !self.is_source_available() {
            self.install_source()?;
        }
        self.build(context)
    }

    /// Builds with the host commit injected so the result matches the
    /// running host.
    pub(super) fn build(&self, context: &BuildContext) -> Result<(), PluginError> {
        let pkg_config = context.pkg_config_dir().display().to_string();
        let commit = context.host_commit().unwrap_or_default().to_owned();
        let env = [(PKG_CONFIG_ENV, pkg_config), (HOST_COMMIT_ENV, commit)];
        let output = run_shell(SELF_BUILD_SCRIPT, &self.path, &env)?;
        if !output.success() {
            return Err(PluginError::BuildFailed {
                name: String::from("hyprload"),
                status: output.status(),
                output: output.combined(),
            });
        }
        Ok(())
    }
}
