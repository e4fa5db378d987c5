//! Collaborator surface exposed by the host process.
//!
//! The host owns plugin activation and the user-visible notification sink.
//! [`Notifier`] applies the quiet and debug switches on top of
//! [`Host::notify`] and mirrors every message into `tracing`.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::PluginError;

/// Tracing target for user-facing notifications.
const NOTIFY_TARGET: &str = "hyprload_plugins::notify";

/// Prefix prepended to every notification.
const MESSAGE_PREFIX: &str = "[hyprload] ";

/// Operations the plugin manager needs from its host.
pub trait Host: Send + Sync {
    /// Invokes the named host command with a free-text argument string and
    /// returns its reply.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Host`] if the host rejects the command.
    fn invoke(&self, command: &str, args: &str) -> Result<String, PluginError>;

    /// Paths of the plugin binaries the host currently has loaded.
    fn active_plugins(&self) -> Vec<PathBuf>;

    /// Commit hash the running host was built from, when known.
    fn commit_hash(&self) -> Option<String>;

    /// Shows a notification to the user.
    fn notify(&self, severity: Severity, message: &str);
}

impl<T> Host for Arc<T>
where
    T: Host + ?Sized,
{
    fn invoke(&self, command: &str, args: &str) -> Result<String, PluginError> {
        (**self).invoke(command, args)
    }

    fn active_plugins(&self) -> Vec<PathBuf> {
        (**self).active_plugins()
    }

    fn commit_hash(&self) -> Option<String> {
        (**self).commit_hash()
    }

    fn notify(&self, severity: Severity, message: &str) {
        (**self).notify(severity, message);
    }
}

/// Kind of notification, selecting the icon and colour shown by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Progress information.
    Info,
    /// A completed operation.
    Success,
    /// A failed operation.
    Error,
    /// Diagnostic detail, shown only in debug mode.
    Debug,
}

impl Severity {
    /// Icon identifier understood by the host notification API.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Info | Self::Debug => "info",
            Self::Success => "ok",
            Self::Error => "error",
        }
    }

    /// RGBA colour of the notification.
    #[must_use]
    pub const fn color(self) -> [u8; 4] {
        match self {
            Self::Info | Self::Success | Self::Error => [0x98, 0xc3, 0x79, 0xff],
            Self::Debug => [0x98, 0x5f, 0xdd, 0xff],
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
            Self::Debug => "debug",
        })
    }
}

/// Routes messages to the host sink and to `tracing`.
#[derive(Clone)]
pub struct Notifier {
    host: Arc<dyn Host>,
    quiet: bool,
    debug: bool,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("quiet", &self.quiet)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    /// Builds a notifier; `quiet` hides info, success, and error messages
    /// from the host while `debug` reveals debug messages.
    #[must_use]
    pub fn new(host: Arc<dyn Host>, quiet: bool, debug: bool) -> Self {
        Self { host, quiet, debug }
    }

    /// Emits an informational message.
    pub fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }

    /// Emits a success message.
    pub fn success(&self, message: &str) {
        self.emit(Severity::Success, message);
    }

    /// Emits an error message.
    pub fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }

    /// Emits a debug message.
    pub fn debug(&self, message: &str) {
        self.emit(Severity::Debug, message);
    }

    /// Emits `message` with the given severity.
    pub fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => error!(target: NOTIFY_TARGET, %severity, "{message}"),
            Severity::Debug => debug!(target: NOTIFY_TARGET, %severity, "{message}"),
            Severity::Info | Severity::Success => {
                info!(target: NOTIFY_TARGET, %severity, "{message}");
            }
        }
        let visible = match severity {
            Severity::Debug => self.debug,
            Severity::Info | Severity::Success | Severity::Error => !self.quiet,
        };
        if visible {
            self.host
                .notify(severity, &format!("{MESSAGE_PREFIX}{message}"));
        }
    }
}
