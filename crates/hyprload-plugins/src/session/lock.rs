use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use tracing::debug;

use super::SESSION_TARGET;
use crate::error::PluginError;

/// Exclusive advisory lock on a session's lock file.
///
/// Dropping the guard closes the descriptor, which releases the lock; a
/// crashed process therefore leaves an unlocked lock file behind.
pub struct SessionLock {
    path: PathBuf,
    lock: Flock<File>,
}

impl fmt::Debug for SessionLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLock").field("path", &self.path).finish_non_exhaustive()
    }
}

impl SessionLock {
    /// Creates `path` exclusively and locks it without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::SessionCollision`] if the file already exists
    /// or is locked by someone else, and [`PluginError::Io`] for other
    /// failures.
    pub fn create_and_lock(path: &Path) -> Result<Self, PluginError> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create_new(true).mode(0o600);
        let file = match options.open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                return Err(PluginError::SessionCollision {
                    path: path.to_path_buf(),
                });
            }
            Err(error) => return Err(PluginError::io(path, error)),
        };
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => {
                debug!(target: SESSION_TARGET, file = %path.display(), "acquired session lock");
                Ok(Self {
                    path: path.to_path_buf(),
                    lock,
                })
            }
            Err((_, Errno::EWOULDBLOCK)) => Err(PluginError::SessionCollision {
                path: path.to_path_buf(),
            }),
            Err((_, errno)) => Err(PluginError::io(path, io::Error::from(errno))),
        }
    }

    /// Locks an existing lock file without blocking.
    ///
    /// Returns `Ok(None)` when another open descriptor holds the lock.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the file cannot be opened or locking
    /// fails for a reason other than contention.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, PluginError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| PluginError::io(path, source))?;
        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(Some(Self {
                path: path.to_path_buf(),
                lock,
            })),
            Err((_, Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, errno)) => Err(PluginError::io(path, io::Error::from(errno))),
        }
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlocks and closes the lock file.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if unlocking fails.
    pub fn release(self) -> Result<(), PluginError> {
        let Self { path, lock } = self;
        match lock.unlock() {
            Ok(_) => {
                debug!(target: SESSION_TARGET, file = %path.display(), "released session lock");
                Ok(())
            }
            Err((_, errno)) => Err(PluginError::io(path, io::Error::from(errno))),
        }
    }
}
