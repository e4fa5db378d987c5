//! Handles for in-flight build operations and their results.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::PluginError;
use crate::source::PluginSource;

/// Which entry point started a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    /// Fetch missing sources and build every requirement.
    Install,
    /// Refresh stale sources and rebuild, including the manager itself.
    Update,
}

impl BatchKind {
    /// Verb used in log lines.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Terminal state of a successful worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// New artifacts were built and installed.
    Built,
    /// The source was current; nothing was rebuilt.
    UpToDate,
}

/// One in-flight install or update attempt.
#[derive(Debug, Clone)]
pub struct BuildProcessDescriptor {
    id: usize,
    name: String,
    source: Arc<PluginSource>,
    headers_dir: PathBuf,
}

impl BuildProcessDescriptor {
    /// Creates a descriptor for plugin `name`.
    #[must_use]
    pub fn new(
        id: usize,
        name: impl Into<String>,
        source: Arc<PluginSource>,
        headers_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source,
            headers_dir: headers_dir.into(),
        }
    }

    /// Position within the batch.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source being built.
    #[must_use]
    pub fn source(&self) -> &Arc<PluginSource> {
        &self.source
    }

    /// Headers used for this attempt.
    #[must_use]
    pub fn headers_dir(&self) -> &Path {
        &self.headers_dir
    }

    /// Pairs this descriptor with a worker's result.
    #[must_use]
    pub fn outcome(&self, result: Result<BuildStatus, PluginError>) -> BuildOutcome {
        BuildOutcome {
            id: self.id,
            name: self.name.clone(),
            result,
        }
    }
}

/// Result a worker sends when it finishes.
#[derive(Debug)]
pub struct BuildOutcome {
    id: usize,
    name: String,
    result: Result<BuildStatus, PluginError>,
}

impl BuildOutcome {
    /// Descriptor this outcome resolves.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Worker result.
    #[must_use]
    pub const fn result(&self) -> &Result<BuildStatus, PluginError> {
        &self.result
    }
}
