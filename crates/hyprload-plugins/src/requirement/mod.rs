//! User-declared plugin requirements.
//!
//! The user configuration document lists wanted plugins:
//!
//! ```toml
//! plugins = [
//!     "acme/hyprfoo",
//!     { git = "https://gitlab.com/acme/hyprbar", branch = "dev", name = "bar" },
//!     { local = "/home/me/src/hyprbaz" },
//! ]
//! ```
//!
//! A string entry is shorthand for an unpinned git source. Requirements are
//! rebuilt wholesale on every reload; each resolves its source through the
//! [`SourceRegistry`] so equivalent sources are shared.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::PluginError;
use crate::paths::PluginPaths;
use crate::registry::SourceRegistry;
use crate::source::{PluginSource, git_repository_name};

/// One wanted plugin and the source that provides it.
#[derive(Debug, Clone)]
pub struct PluginRequirement {
    name: String,
    binary_path: PathBuf,
    source: Arc<PluginSource>,
}

impl PluginRequirement {
    /// Builds a requirement whose binary lives in the shared binaries
    /// directory.
    #[must_use]
    pub fn new(name: impl Into<String>, source: Arc<PluginSource>, paths: &PluginPaths) -> Self {
        let name = name.into();
        Self {
            binary_path: paths.binary_path(&name),
            name,
            source,
        }
    }

    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the installed binary.
    #[must_use]
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Shared source.
    #[must_use]
    pub fn source(&self) -> &Arc<PluginSource> {
        &self.source
    }

    /// Returns `true` when the binary has been installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.binary_path.exists()
    }
}

#[derive(Debug, Deserialize)]
struct UserConfig {
    #[serde(default)]
    plugins: Vec<toml::Value>,
}

#[derive(Debug, Deserialize)]
struct RequirementTable {
    git: Option<String>,
    local: Option<PathBuf>,
    branch: Option<String>,
    rev: Option<String>,
    name: Option<String>,
}

/// Outcome of resolving a user configuration document.
#[derive(Debug, Default)]
pub struct RequirementSet {
    requirements: Vec<PluginRequirement>,
    rejected: Vec<PluginError>,
}

impl RequirementSet {
    /// Requirements that resolved successfully.
    #[must_use]
    pub fn requirements(&self) -> &[PluginRequirement] {
        &self.requirements
    }

    /// Entries that were skipped, with the reason.
    #[must_use]
    pub fn rejected(&self) -> &[PluginError] {
        &self.rejected
    }

    /// Splits the set into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<PluginRequirement>, Vec<PluginError>) {
        (self.requirements, self.rejected)
    }
}

/// Parses `text` and resolves every entry against `registry`.
///
/// Malformed entries are collected in [`RequirementSet::rejected`] and do not
/// prevent the remaining entries from resolving.
///
/// # Errors
///
/// Returns [`PluginError::Config`] if the document itself is not valid.
pub fn parse_requirements(
    text: &str,
    registry: &mut SourceRegistry,
    paths: &PluginPaths,
) -> Result<RequirementSet, PluginError> {
    let config: UserConfig = toml::from_str(text).map_err(|err| PluginError::Config {
        message: format!("Failed to parse config file: {}", err.message()),
    })?;

    let mut set = RequirementSet::default();
    for entry in config.plugins {
        match resolve_entry(entry, registry, paths) {
            Ok(requirement) => set.requirements.push(requirement),
            Err(error) => set.rejected.push(error),
        }
    }
    Ok(set)
}

/// Reads the document at `path` and resolves it with [`parse_requirements`].
///
/// # Errors
///
/// Returns [`PluginError::Io`] if the file cannot be read, or
/// [`PluginError::Config`] if it cannot be parsed.
pub fn load_requirements(
    path: &Path,
    registry: &mut SourceRegistry,
    paths: &PluginPaths,
) -> Result<RequirementSet, PluginError> {
    let text = fs::read_to_string(path).map_err(|source| PluginError::io(path, source))?;
    parse_requirements(&text, registry, paths)
}

fn resolve_entry(
    entry: toml::Value,
    registry: &mut SourceRegistry,
    paths: &PluginPaths,
) -> Result<PluginRequirement, PluginError> {
    match entry {
        toml::Value::String(location) => {
            let name = checked_name(git_repository_name(&location))?;
            let source = registry.resolve(PluginSource::git(&location, None, None, paths));
            Ok(PluginRequirement::new(name, source, paths))
        }
        toml::Value::Table(table) => {
            let entry: RequirementTable = toml::Value::Table(table).try_into().map_err(
                |err: toml::de::Error| PluginError::Config {
                    message: format!("Failed to parse plugin: {}", err.message()),
                },
            )?;
            resolve_table(entry, registry, paths)
        }
        other => Err(PluginError::Config {
            message: format!("Plugin must be a string or table, got {}", other.type_str()),
        }),
    }
}

fn resolve_table(
    entry: RequirementTable,
    registry: &mut SourceRegistry,
    paths: &PluginPaths,
) -> Result<PluginRequirement, PluginError> {
    let (candidate, default_name) = match (entry.git, entry.local) {
        (Some(location), _) => {
            let name = git_repository_name(&location).to_owned();
            (PluginSource::git(&location, entry.branch, entry.rev, paths), name)
        }
        (None, Some(path)) => {
            let name = git_repository_name(&path.to_string_lossy()).to_owned();
            (PluginSource::local(path), name)
        }
        (None, None) => {
            return Err(PluginError::Config {
                message: String::from("Plugin must have a source"),
            });
        }
    };
    let name = checked_name(entry.name.as_deref().unwrap_or(&default_name))?;
    let source = registry.resolve(candidate);
    Ok(PluginRequirement::new(name, source, paths))
}

/// Accepts names that stay a single file name inside the binaries directory.
fn checked_name(name: &str) -> Result<String, PluginError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(PluginError::Config {
            message: format!("Invalid plugin name: {name:?}"),
        });
    }
    Ok(name.to_owned())
}
