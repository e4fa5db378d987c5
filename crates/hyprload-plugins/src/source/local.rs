use std::path::{Path, PathBuf};

use super::{BuildContext, artifact};
use crate::error::PluginError;

/// A plugin built in place from an existing directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSource {
    path: PathBuf,
}

impl LocalSource {
    /// Wraps `path`; nothing is checked until the source is used.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Source directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(super) const fn install_source(&self) -> Result<(), PluginError> {
        Ok(())
    }

    pub(super) fn is_source_available(&self) -> bool {
        self.path.exists()
    }

    // No versioning signal exists for a plain directory, so always rebuild.
    pub(super) const fn is_up_to_date(&self) -> bool {
        false
    }

    pub(super) fn update(&self, name: &str, context: &BuildContext) -> Result<(), PluginError> {
        self.install(name, context)
    }

    pub(super) fn install(&self, name: &str, context: &BuildContext) -> Result<(), PluginError> {
        if !self.is_source_available() {
            return Err(PluginError::SourceUnavailable {
                source_name: self.path.display().to_string(),
                message: format!("Source for {name} does not exist"),
            });
        }
        artifact::build_and_install(&self.path, name, context)
    }
}
