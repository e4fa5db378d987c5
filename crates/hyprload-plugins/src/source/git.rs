use std::path::{Path, PathBuf};

use tracing::debug;

use super::{BuildContext, artifact};
use crate::error::PluginError;
use crate::process::{CommandOutput, run_git};

/// Tracing target for git operations.
const GIT_TARGET: &str = "hyprload_plugins::git";

const GITHUB_PREFIX: &str = "https://github.com/";

/// A plugin repository cloned beneath the sources directory.
///
/// Pinned clones get their own directory, suffixed `@<branch>` and
/// `@<rev>`, so differently pinned requirements on one repository never share
/// a working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSource {
    url: String,
    branch: Option<String>,
    rev: Option<String>,
    path: PathBuf,
}

impl GitSource {
    /// Resolves `location` (a URL or `owner/repo`) and derives its clone path.
    #[must_use]
    pub fn new(
        location: &str,
        branch: Option<String>,
        rev: Option<String>,
        sources_dir: &Path,
    ) -> Self {
        let url = canonical_url(location);
        let mut dir_name = repository_name(&url).to_owned();
        for pin in [&branch, &rev].into_iter().flatten() {
            dir_name.push('@');
            dir_name.push_str(pin);
        }
        Self {
            path: sources_dir.join(dir_name),
            url,
            branch,
            rev,
        }
    }

    /// Clone URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Pinned branch, if any.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Pinned revision, if any.
    #[must_use]
    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    /// Local clone path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(super) fn same_origin(&self, other: &Self) -> bool {
        self == other
    }

    pub(super) fn install_source(&self) -> Result<(), PluginError> {
        let mut args = vec![
            String::from("clone"),
            self.url.clone(),
            self.path.display().to_string(),
        ];
        if let Some(branch) = &self.branch {
            args.push(String::from("--branch"));
            args.push(branch.clone());
        }
        let output = run_git(None, &args)?;
        if !output.success() {
            return Err(self.unavailable("Failed to clone plugin source", &output));
        }

        if let Some(rev) = &self.rev {
            let output = run_git(Some(&self.path), ["checkout", rev.as_str()])?;
            if !output.success() {
                return Err(self.unavailable("Failed to checkout revision", &output));
            }
        }
        Ok(())
    }

    pub(super) fn is_source_available(&self) -> bool {
        self.path.join(".git").exists()
    }

    pub(super) fn is_up_to_date(&self) -> bool {
        if !self.is_source_available() {
            return false;
        }
        match &self.rev {
            Some(rev) => head_matches(&self.path, rev),
            None => tracking_branch_is_current(&self.path),
        }
    }

    pub(super) fn update(&self, name: &str, context: &BuildContext) -> Result<(), PluginError> {
        if !self.is_source_available() {
            return self.install(name, context);
        }

        if let Some(rev) = &self.rev {
            let fetch = run_git(Some(&self.path), ["fetch", "origin"])?;
            if !fetch.success() {
                return Err(self.stale("Failed to fetch plugin source", &fetch));
            }
            let output = run_git(Some(&self.path), ["checkout", rev.as_str()])?;
            if !output.success() {
                return Err(self.stale("Failed to checkout revision", &output));
            }
            return self.install(name, context);
        }

        if let Some(branch) = &self.branch {
            let output = run_git(Some(&self.path), ["checkout", branch.as_str()])?;
            if !output.success() {
                return Err(self.stale("Failed to checkout branch", &output));
            }
        }

        let output = run_git(Some(&self.path), ["pull"])?;
        if !output.success() {
            return Err(self.stale("Failed to update plugin source", &output));
        }
        self.install(name, context)
    }

    pub(super) fn install(&self, name: &str, context: &BuildContext) -> Result<(), PluginError> {
        if !self.is_source_available() {
            self.install_source()?;
        }
        artifact::build_and_install(&self.path, name, context)
    }

    fn unavailable(&self, what: &str, output: &CommandOutput) -> PluginError {
        PluginError::SourceUnavailable {
            source_name: self.url.clone(),
            message: format!("{what}: {}", output.combined()),
        }
    }

    fn stale(&self, what: &str, output: &CommandOutput) -> PluginError {
        PluginError::StaleSource {
            source_name: self.url.clone(),
            message: format!("{what}: {}", output.combined()),
        }
    }
}

/// Expands `owner/repo` shorthand into a GitHub HTTPS URL.
pub(crate) fn canonical_url(location: &str) -> String {
    if location.starts_with("https://") || location.starts_with("git@") {
        location.to_owned()
    } else {
        format!("{GITHUB_PREFIX}{location}.git")
    }
}

/// Final path segment of a URL or path, without any `.git` suffix.
pub(crate) fn repository_name(location: &str) -> &str {
    let trimmed = location.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last)
}

fn head_matches(dir: &Path, rev: &str) -> bool {
    let Ok(output) = run_git(Some(dir), ["rev-parse", "HEAD"]) else {
        return false;
    };
    let head = output.stdout().trim();
    output.success() && !rev.is_empty() && head.starts_with(rev)
}

/// Refreshes remote-tracking refs and checks whether the checkout is behind.
///
/// A failed refresh (for example, no network) reports `false` so the plugin
/// is rebuilt rather than silently skipped.
pub(super) fn tracking_branch_is_current(dir: &Path) -> bool {
    match run_git(Some(dir), ["remote", "update"]) {
        Ok(output) if output.success() => {}
        _ => {
            debug!(target: GIT_TARGET, dir = %dir.display(), "remote update failed");
            return false;
        }
    }
    match run_git(Some(dir), ["status", "-uno"]) {
        Ok(output) if output.success() => !output.stdout().contains("behind"),
        _ => false,
    }
}
