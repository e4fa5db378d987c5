//! Session staging and crash recovery.
//!
//! Built binaries live in the shared `plugins/bin` directory. Loading never
//! hands those files to the host directly: each run claims a fresh
//! `plugins/session.<id>` directory, guards it with an exclusive lock on its
//! `lock` file, copies the binaries in, and loads the copies. Clearing
//! unloads, unlocks, and deletes the directory. A process that dies while a
//! session is active leaves the directory behind with an unlocked lock file,
//! which [`SessionManager::sweep_orphans`] recognises and removes.

mod lock;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, info, warn};

pub use self::lock::SessionLock;
use crate::error::PluginError;
use crate::host::{Host, Notifier};
use crate::paths::{PluginPaths, SESSION_LOCK_FILE, is_plugin_binary, session_id_from_name};

/// Tracing target for session lifecycle events.
const SESSION_TARGET: &str = "hyprload_plugins::session";

/// Number of digits in a generated session identifier.
pub const SESSION_ID_LEN: usize = 16;

/// Identifier draws before giving up on finding a free session name.
const MAX_ID_ATTEMPTS: usize = 64;

/// Produces candidate session identifiers.
pub type IdGenerator = Box<dyn FnMut() -> String + Send>;

/// Returns a random identifier of [`SESSION_ID_LEN`] decimal digits.
#[must_use]
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    (0..SESSION_ID_LEN)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

#[derive(Debug)]
struct ActiveSession {
    id: String,
    dir: PathBuf,
    lock: SessionLock,
    loaded: Vec<String>,
}

/// Result of a crash sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Session directories deleted.
    pub removed: Vec<PathBuf>,
    /// Session directories left alone because a live process holds them.
    pub skipped: Vec<PathBuf>,
}

/// Owns the session of this process, if one is active.
pub struct SessionManager {
    paths: PluginPaths,
    next_id: IdGenerator,
    active: Option<ActiveSession>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("paths", &self.paths)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager drawing random identifiers.
    #[must_use]
    pub fn new(paths: PluginPaths) -> Self {
        Self::with_id_generator(paths, Box::new(generate_session_id))
    }

    /// Creates a manager drawing identifiers from `next_id`.
    #[must_use]
    pub fn with_id_generator(paths: PluginPaths, next_id: IdGenerator) -> Self {
        Self {
            paths,
            next_id,
            active: None,
        }
    }

    /// Returns `true` while a session is held.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Identifier of the active session.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.active.as_ref().map(|session| session.id.as_str())
    }

    /// Directory of the active session.
    #[must_use]
    pub fn session_dir(&self) -> Option<&Path> {
        self.active.as_ref().map(|session| session.dir.as_path())
    }

    /// File names loaded into the host by the active session.
    #[must_use]
    pub fn loaded(&self) -> &[String] {
        self.active
            .as_ref()
            .map(|session| session.loaded.as_slice())
            .unwrap_or_default()
    }

    /// Claims a session, stages every built binary into it, and asks the
    /// host to load the staged copies.
    ///
    /// Returns the number of plugins loaded. Loading while a session is
    /// already active does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::SessionCollision`] if the session's lock file
    /// could not be claimed; nothing is loaded in that case. I/O failures
    /// while staging return [`PluginError::Io`] and release the claim.
    pub fn load(&mut self, host: &dyn Host, notifier: &Notifier) -> Result<usize, PluginError> {
        if self.active.is_some() {
            notifier.debug("Session already exists, will not load plugins");
            return Ok(0);
        }
        self.paths.ensure()?;

        let (id, dir) = self.claim_directory()?;
        notifier.debug(&format!("Session id: {id}"));
        let lock = SessionLock::create_and_lock(&dir.join(SESSION_LOCK_FILE))?;

        let staged = match stage_binaries(self.paths.binaries_dir(), &dir) {
            Ok(staged) => staged,
            Err(error) => {
                discard(lock, &dir);
                return Err(error);
            }
        };

        let mut loaded = Vec::with_capacity(staged.len());
        for file in staged {
            notifier.info(&format!("Loading plugin: {file}"));
            let path = dir.join(&file);
            match host.invoke("plugin", &format!("load {}", path.display())) {
                Ok(_) => loaded.push(file),
                Err(error) => notifier.error(&error.to_string()),
            }
        }

        info!(target: SESSION_TARGET, session = %id, plugins = loaded.len(), "session active");
        let count = loaded.len();
        self.active = Some(ActiveSession {
            id,
            dir,
            lock,
            loaded,
        });
        Ok(count)
    }

    /// Unloads the session's plugins, releases its lock, deletes its
    /// directory, and prunes built binaries whose plugin is not in `keep`.
    ///
    /// Passing `None` for `keep` leaves the binaries directory alone, for
    /// when the wanted plugins are not known. Plugins the host no longer
    /// reports as active are not unloaded again. Clearing without a session
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the lock cannot be released or the
    /// session directory cannot be removed.
    pub fn clear(
        &mut self,
        host: &dyn Host,
        notifier: &Notifier,
        keep: Option<&[String]>,
    ) -> Result<(), PluginError> {
        let Some(session) = self.active.take() else {
            notifier.debug("No session exists, will not clear plugins");
            return Ok(());
        };

        let active = host.active_plugins();
        for file in &session.loaded {
            notifier.info(&format!("Unloading plugin: {file}"));
            let path = session.dir.join(file);
            if !active.contains(&path) {
                notifier.debug("Plugin not found in host, likely already unloaded");
                continue;
            }
            if let Err(error) = host.invoke("plugin", &format!("unload {}", path.display())) {
                notifier.error(&error.to_string());
            }
        }

        session.lock.release()?;
        fs::remove_dir_all(&session.dir).map_err(|source| PluginError::io(&session.dir, source))?;
        info!(target: SESSION_TARGET, session = %session.id, "session cleared");

        match keep {
            Some(keep) => self.prune_binaries(keep),
            None => {
                warn!(target: SESSION_TARGET, "wanted plugins unknown, keeping every binary");
                Ok(())
            }
        }
    }

    /// Removes session directories abandoned by crashed or interrupted runs.
    ///
    /// A directory without a lock file, or whose lock file can be locked, is
    /// deleted. A directory whose lock is held elsewhere is left untouched.
    /// The session held by this manager is never considered.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the plugins directory cannot be read.
    pub fn sweep_orphans(&self) -> Result<SweepReport, PluginError> {
        let mut report = SweepReport::default();
        let plugins_dir = self.paths.plugins_dir();
        let entries = match fs::read_dir(plugins_dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(error) => return Err(PluginError::io(plugins_dir, error)),
        };

        for entry in entries {
            let entry = entry.map_err(|source| PluginError::io(plugins_dir, source))?;
            let dir = entry.path();
            let is_session = entry
                .file_name()
                .to_str()
                .and_then(session_id_from_name)
                .is_some();
            if !is_session || !dir.is_dir() || self.session_dir() == Some(dir.as_path()) {
                continue;
            }

            match sweep_one(&dir) {
                Ok(true) => report.removed.push(dir),
                Ok(false) => report.skipped.push(dir),
                Err(error) => {
                    warn!(target: SESSION_TARGET, dir = %dir.display(), %error, "could not sweep session");
                    report.skipped.push(dir);
                }
            }
        }
        Ok(report)
    }

    fn claim_directory(&mut self) -> Result<(String, PathBuf), PluginError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = (self.next_id)();
            let dir = self.paths.session_dir(&id);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok((id, dir)),
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(target: SESSION_TARGET, session = %id, "session id collision, retrying");
                }
                Err(error) => return Err(PluginError::io(&dir, error)),
            }
        }
        Err(PluginError::SessionCollision {
            path: self.paths.plugins_dir().to_path_buf(),
        })
    }

    fn prune_binaries(&self, keep: &[String]) -> Result<(), PluginError> {
        let bin = self.paths.binaries_dir();
        let entries = match fs::read_dir(bin) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(PluginError::io(bin, error)),
        };
        for entry in entries {
            let path = entry.map_err(|source| PluginError::io(bin, source))?.path();
            if !is_plugin_binary(&path) {
                continue;
            }
            let required = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| keep.iter().any(|name| name == stem));
            if !required {
                fs::remove_file(&path).map_err(|source| PluginError::io(&path, source))?;
                debug!(target: SESSION_TARGET, file = %path.display(), "pruned stale binary");
            }
        }
        Ok(())
    }
}

/// Copies every plugin binary in `bin` into `dir`, returning the file names
/// in sorted order.
fn stage_binaries(bin: &Path, dir: &Path) -> Result<Vec<String>, PluginError> {
    let mut staged = Vec::new();
    for entry in fs::read_dir(bin).map_err(|source| PluginError::io(bin, source))? {
        let path = entry.map_err(|source| PluginError::io(bin, source))?.path();
        if !path.is_file() || !is_plugin_binary(&path) {
            continue;
        }
        let Some(file) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let target = dir.join(file);
        fs::copy(&path, &target).map_err(|source| PluginError::io(&target, source))?;
        debug!(target: SESSION_TARGET, from = %path.display(), to = %target.display(), "staged plugin");
        staged.push(file.to_owned());
    }
    staged.sort();
    Ok(staged)
}

fn discard(lock: SessionLock, dir: &Path) {
    if let Err(error) = lock.release() {
        warn!(target: SESSION_TARGET, %error, "could not release session lock");
    }
    if let Err(error) = fs::remove_dir_all(dir) {
        warn!(target: SESSION_TARGET, dir = %dir.display(), %error, "could not remove session");
    }
}

/// Deletes `dir` if no live process holds it. Returns `true` if deleted.
fn sweep_one(dir: &Path) -> Result<bool, PluginError> {
    let lock_path = dir.join(SESSION_LOCK_FILE);
    if lock_path.exists() {
        let Some(lock) = SessionLock::try_acquire(&lock_path)? else {
            debug!(target: SESSION_TARGET, dir = %dir.display(), "session held by a live process");
            return Ok(false);
        };
        lock.release()?;
        info!(target: SESSION_TARGET, dir = %dir.display(), "removing crashed session");
    } else {
        info!(target: SESSION_TARGET, dir = %dir.display(), "removing abandoned session");
    }
    fs::remove_dir_all(dir).map_err(|source| PluginError::io(dir, source))?;
    Ok(true)
}
