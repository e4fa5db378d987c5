//! Source manifests describing how to build each plugin.
//!
//! Every source carries a `hyprload.toml` at its root. Each top-level table in
//! that document declares one plugin:
//!
//! ```toml
//! [hyprfoo]
//! authors = ["acme"]
//! version = "1.2.0"
//! description = "Adds foo to the compositor"
//!
//! [hyprfoo.build]
//! output = "build/hyprfoo.so"
//! steps = ["make all"]
//! ```
//!
//! Manifests are parsed afresh on every build attempt and never cached.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::PluginError;
use crate::paths::binary_file_name;

/// File name of the manifest at the root of each source.
pub const MANIFEST_FILE: &str = "hyprload.toml";

/// Tracing target for manifest parsing.
const MANIFEST_TARGET: &str = "hyprload_plugins::manifest";

const DEFAULT_VERSION: &str = "0.0.0";
const DEFAULT_DESCRIPTION: &str = "No description provided";

/// Build description of a single plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginManifest {
    name: String,
    authors: Vec<String>,
    version: String,
    description: String,
    output: PathBuf,
    steps: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Authors {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawPlugin {
    authors: Option<Authors>,
    author: Option<String>,
    version: Option<String>,
    description: Option<String>,
    build: Option<RawBuild>,
}

#[derive(Debug, Deserialize)]
struct RawBuild {
    output: Option<PathBuf>,
    steps: Option<Vec<String>>,
}

impl PluginManifest {
    /// Parses the table declared under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if a field has the wrong type, the
    /// `build` table is missing, or it declares no steps.
    pub fn from_table(name: &str, table: toml::Table) -> Result<Self, PluginError> {
        let raw: RawPlugin =
            toml::Value::Table(table)
                .try_into()
                .map_err(|err: toml::de::Error| PluginError::Manifest {
                    message: format!("plugin '{name}': {}", err.message()),
                })?;

        let build = raw.build.ok_or_else(|| PluginError::Manifest {
            message: format!("plugin '{name}' must have a build table"),
        })?;
        let steps = build
            .steps
            .filter(|steps| !steps.is_empty())
            .ok_or_else(|| PluginError::Manifest {
                message: format!("plugin '{name}' must have build steps"),
            })?;

        let authors = match (raw.authors, raw.author) {
            (Some(Authors::Many(authors)), _) => authors,
            (Some(Authors::One(author)), _) | (None, Some(author)) => vec![author],
            (None, None) => Vec::new(),
        };

        Ok(Self {
            name: name.to_owned(),
            authors,
            version: raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_owned()),
            description: raw
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_owned()),
            output: build
                .output
                .unwrap_or_else(|| PathBuf::from(binary_file_name(name))),
            steps,
        })
    }

    /// Plugin name, the key of its table.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared authors.
    #[must_use]
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Declared version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Free-text description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Artifact path relative to the source root.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Shell build steps, run in order.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

/// All plugins declared by one source manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyprloadManifest {
    plugins: Vec<PluginManifest>,
}

impl HyprloadManifest {
    /// Parses manifest text.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if the text is not valid TOML or any
    /// declared plugin is malformed.
    pub fn parse(text: &str) -> Result<Self, PluginError> {
        let document: toml::Table = toml::from_str(text).map_err(|err| PluginError::Manifest {
            message: format!("Failed to parse source manifest: {}", err.message()),
        })?;

        let mut plugins = Vec::new();
        for (key, value) in document {
            let toml::Value::Table(table) = value else {
                continue;
            };
            debug!(target: MANIFEST_TARGET, plugin = %key, "found plugin in manifest");
            plugins.push(PluginManifest::from_table(&key, table)?);
        }
        Ok(Self { plugins })
    }

    /// Reads and parses `<source_dir>/hyprload.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if the file is absent or invalid, and
    /// [`PluginError::Io`] if it cannot be read.
    pub fn load(source_dir: &Path) -> Result<Self, PluginError> {
        let path = source_dir.join(MANIFEST_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(PluginError::Manifest {
                    message: format!("Source does not have a {MANIFEST_FILE} manifest"),
                });
            }
            Err(error) => return Err(PluginError::io(path, error)),
        };
        Self::parse(&text)
    }

    /// Declared plugins.
    #[must_use]
    pub fn plugins(&self) -> &[PluginManifest] {
        &self.plugins
    }

    /// Looks up the plugin called `name`.
    #[must_use]
    pub fn plugin(&self, name: &str) -> Option<&PluginManifest> {
        self.plugins.iter().find(|plugin| plugin.name() == name)
    }
}

/// Loads the manifest of `source_dir` and extracts the entry for `name`.
///
/// # Errors
///
/// Returns [`PluginError::Manifest`] when the manifest cannot be loaded or
/// does not declare `name`.
pub fn find_plugin_manifest(source_dir: &Path, name: &str) -> Result<PluginManifest, PluginError> {
    let manifest = HyprloadManifest::load(source_dir)?;
    manifest
        .plugin(name)
        .cloned()
        .ok_or_else(|| PluginError::Manifest {
            message: format!("Plugin does not have a manifest for {name}"),
        })
}
