//! Plugin sources: where a plugin's code comes from and how it is fetched,
//! built, and installed.
//!
//! A [`PluginSource`] wraps one of three strategies:
//!
//! - [`GitSource`] clones a repository, optionally pinned to a branch or
//!   revision.
//! - [`LocalSource`] builds an existing directory in place.
//! - [`SelfSource`] keeps the manager's own checkout current. It never
//!   provides a loadable plugin.
//!
//! Sources are shared between every requirement that resolves to them, so
//! each carries a checkout mutex that workers hold while they touch the
//! source tree.

mod artifact;
mod git;
mod local;
mod self_source;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::PluginError;
use crate::manifest::find_plugin_manifest;
use crate::paths::PluginPaths;

pub use self::git::GitSource;
pub(crate) use self::git::repository_name as git_repository_name;
pub use self::local::LocalSource;
pub use self::self_source::{SELF_UPSTREAM_URL, SelfSource};

/// Environment variable carrying the pkg-config override directory.
pub const PKG_CONFIG_ENV: &str = "PKG_CONFIG_PATH";

/// Environment variable carrying the host commit for self builds.
pub const HOST_COMMIT_ENV: &str = "HYPRLAND_COMMIT";

/// Inputs every build needs besides the source itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    paths: PluginPaths,
    headers_dir: PathBuf,
    host_commit: Option<String>,
}

impl BuildContext {
    /// Bundles the layout, the headers used for this batch, and the host
    /// commit.
    #[must_use]
    pub fn new(paths: PluginPaths, headers_dir: PathBuf, host_commit: Option<String>) -> Self {
        Self {
            paths,
            headers_dir,
            host_commit,
        }
    }

    /// Filesystem layout.
    #[must_use]
    pub const fn paths(&self) -> &PluginPaths {
        &self.paths
    }

    /// Host headers used for this batch.
    #[must_use]
    pub fn headers_dir(&self) -> &Path {
        &self.headers_dir
    }

    /// Directory injected as `PKG_CONFIG_PATH`.
    #[must_use]
    pub fn pkg_config_dir(&self) -> PathBuf {
        self.paths.pkg_config_dir()
    }

    /// Commit hash of the running host, when known.
    #[must_use]
    pub fn host_commit(&self) -> Option<&str> {
        self.host_commit.as_deref()
    }
}

/// Strategy-specific part of a source.
#[derive(Debug)]
pub enum SourceKind {
    /// A git repository.
    Git(GitSource),
    /// A local directory.
    Local(LocalSource),
    /// The manager's own repository.
    SelfSource(SelfSource),
}

/// Per-batch bookkeeping guarded by the checkout mutex.
#[derive(Debug, Default)]
pub struct CheckoutState {
    refreshed: bool,
}

impl CheckoutState {
    /// Returns `true` once a worker has fetched new code in this batch.
    #[must_use]
    pub const fn is_refreshed(&self) -> bool {
        self.refreshed
    }

    /// Records that new code was fetched.
    pub const fn mark_refreshed(&mut self) {
        self.refreshed = true;
    }

    /// Forgets any refresh from a previous batch.
    pub const fn reset(&mut self) {
        self.refreshed = false;
    }
}

/// A plugin source shared by the requirements that resolve to it.
#[derive(Debug)]
pub struct PluginSource {
    kind: SourceKind,
    checkout: Mutex<CheckoutState>,
}

impl From<SourceKind> for PluginSource {
    fn from(kind: SourceKind) -> Self {
        Self {
            kind,
            checkout: Mutex::new(CheckoutState::default()),
        }
    }
}

impl PluginSource {
    /// Git source from a URL or `owner/repo` shorthand.
    #[must_use]
    pub fn git(
        location: &str,
        branch: Option<String>,
        rev: Option<String>,
        paths: &PluginPaths,
    ) -> Self {
        SourceKind::Git(GitSource::new(location, branch, rev, paths.sources_dir())).into()
    }

    /// Local source rooted at `path`.
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        SourceKind::Local(LocalSource::new(path)).into()
    }

    /// The manager's own source.
    #[must_use]
    pub fn self_source(paths: &PluginPaths) -> Self {
        SourceKind::SelfSource(SelfSource::new(paths)).into()
    }

    /// Strategy-specific details.
    #[must_use]
    pub const fn kind(&self) -> &SourceKind {
        &self.kind
    }

    /// Human-readable identity, used in messages.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.kind {
            SourceKind::Git(git) => git.url().to_owned(),
            SourceKind::Local(local) => local.path().display().to_string(),
            SourceKind::SelfSource(_) => String::from("hyprload"),
        }
    }

    /// Directory the source is built in.
    #[must_use]
    pub fn source_dir(&self) -> &Path {
        match &self.kind {
            SourceKind::Git(git) => git.path(),
            SourceKind::Local(local) => local.path(),
            SourceKind::SelfSource(own) => own.path(),
        }
    }

    /// Locks the checkout for exclusive use by one worker.
    pub fn lock_checkout(&self) -> MutexGuard<'_, CheckoutState> {
        self.checkout.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the source into its canonical local path.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::SourceUnavailable`] if the fetch fails.
    pub fn install_source(&self) -> Result<(), PluginError> {
        match &self.kind {
            SourceKind::Git(git) => git.install_source(),
            SourceKind::Local(local) => local.install_source(),
            SourceKind::SelfSource(own) => own.install_source(),
        }
    }

    /// Returns `true` when the source is present locally.
    #[must_use]
    pub fn is_source_available(&self) -> bool {
        match &self.kind {
            SourceKind::Git(git) => git.is_source_available(),
            SourceKind::Local(local) => local.is_source_available(),
            SourceKind::SelfSource(own) => own.is_source_available(),
        }
    }

    /// Returns `true` when the local copy matches upstream.
    ///
    /// Any failure to determine this reports `false`, so the caller rebuilds.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        match &self.kind {
            SourceKind::Git(git) => git.is_up_to_date(),
            SourceKind::Local(local) => local.is_up_to_date(),
            SourceKind::SelfSource(own) => own.is_up_to_date(),
        }
    }

    /// Returns `true` when the source manifest declares `name`.
    #[must_use]
    pub fn provides_plugin(&self, name: &str) -> bool {
        match &self.kind {
            SourceKind::Git(_) | SourceKind::Local(_) => {
                artifact::provides(self.source_dir(), name)
            }
            SourceKind::SelfSource(_) => false,
        }
    }

    /// Brings the source current, then rebuilds and installs `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::StaleSource`] if fetching fails, or any error
    /// from [`PluginSource::install`].
    pub fn update(&self, name: &str, context: &BuildContext) -> Result<(), PluginError> {
        match &self.kind {
            SourceKind::Git(git) => git.update(name, context),
            SourceKind::Local(local) => local.update(name, context),
            SourceKind::SelfSource(own) => own.update(context),
        }
    }

    /// Runs the manifest build steps for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] or [`PluginError::BuildFailed`].
    pub fn build(&self, name: &str, context: &BuildContext) -> Result<(), PluginError> {
        match &self.kind {
            SourceKind::Git(_) | SourceKind::Local(_) => {
                let manifest = find_plugin_manifest(self.source_dir(), name)?;
                artifact::build(self.source_dir(), &manifest, context)
            }
            SourceKind::SelfSource(own) => own.build(context),
        }
    }

    /// Ensures the source is available, builds `name`, and copies its
    /// artifact into the shared binaries directory.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; on
    /// [`PluginError::ArtifactMissing`] the binaries directory is untouched.
    pub fn install(&self, name: &str, context: &BuildContext) -> Result<(), PluginError> {
        match &self.kind {
            SourceKind::Git(git) => git.install(name, context),
            SourceKind::Local(local) => local.install(name, context),
            SourceKind::SelfSource(own) => own.install(context),
        }
    }
}

/// Structural equality used to deduplicate sources.
///
/// Git sources match on URL, branch, revision, and clone path; local sources
/// match on path. A self source never matches anything, itself included.
#[must_use]
pub fn is_equivalent(left: &PluginSource, right: &PluginSource) -> bool {
    match (left.kind(), right.kind()) {
        (SourceKind::Git(a), SourceKind::Git(b)) => a.same_origin(b),
        (SourceKind::Local(a), SourceKind::Local(b)) => a.path() == b.path(),
        _ => false,
    }
}

#[cfg(test)]
mod tests;
