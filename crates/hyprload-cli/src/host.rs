//! Compositor access through `hyprctl`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};

use hyprload_plugins::{Host, PluginError, Severity};
use tracing::{debug, warn};

/// Tracing target for compositor calls.
const HOST_TARGET: &str = "hyprload_cli::host";

/// How long notifications stay on screen, in milliseconds.
const NOTIFY_TIMEOUT_MS: u32 = 5_000;

/// [`Host`] backed by the `hyprctl` control tool.
///
/// `hyprctl` does not report plugin paths, so the set of active plugins is
/// the set this driver loaded and has not unloaded since.
#[derive(Debug)]
pub struct HyprctlHost {
    program: OsString,
    loaded: Mutex<Vec<PathBuf>>,
}

impl Default for HyprctlHost {
    fn default() -> Self {
        Self::with_program("hyprctl")
    }
}

impl HyprctlHost {
    /// Uses `program` instead of `hyprctl`.
    #[must_use]
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            loaded: Mutex::new(Vec::new()),
        }
    }

    fn call(&self, args: &[&str]) -> Result<String, PluginError> {
        let command_line = args.join(" ");
        debug!(target: HOST_TARGET, command = %command_line, "calling hyprctl");
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| PluginError::Spawn {
                program: self.program.to_string_lossy().into_owned(),
                source: Arc::new(source),
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(PluginError::Host {
                command: command_line,
                message: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(stdout)
    }

    fn track(&self, args: &str) {
        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = args.strip_prefix("load ") {
            loaded.push(PathBuf::from(path.trim()));
        } else if let Some(path) = args.strip_prefix("unload ") {
            let path = Path::new(path.trim());
            loaded.retain(|active| active != path);
        }
    }
}

impl Host for HyprctlHost {
    fn invoke(&self, command: &str, args: &str) -> Result<String, PluginError> {
        let mut argv = vec![command];
        argv.extend(args.splitn(2, ' '));
        let reply = self.call(&argv)?;
        if let Some(message) = rejection(&reply) {
            return Err(PluginError::Host {
                command: format!("{command} {args}"),
                message: message.to_owned(),
            });
        }
        if command == "plugin" {
            self.track(args);
        }
        Ok(reply)
    }

    fn active_plugins(&self) -> Vec<PathBuf> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn commit_hash(&self) -> Option<String> {
        match self.call(&["version"]) {
            Ok(reply) => parse_commit(&reply),
            Err(error) => {
                warn!(target: HOST_TARGET, %error, "could not query compositor version");
                None
            }
        }
    }

    fn notify(&self, severity: Severity, message: &str) {
        let timeout = NOTIFY_TIMEOUT_MS.to_string();
        let color = rgba(severity.color());
        let icon = notify_icon(severity).to_string();
        if let Err(error) = self.call(&["notify", &icon, &timeout, &color, message]) {
            debug!(target: HOST_TARGET, %error, "notification not delivered");
        }
    }
}

/// Extracts the commit hash from `hyprctl version` output.
pub(crate) fn parse_commit(reply: &str) -> Option<String> {
    let mut words = reply.split_whitespace();
    words.find(|word| *word == "commit")?;
    words
        .next()
        .map(|hash| hash.trim_matches(|c: char| !c.is_ascii_hexdigit()))
        .filter(|hash| !hash.is_empty())
        .map(str::to_owned)
}

/// Returns the error text when `hyprctl` replied with something other than
/// `ok`.
pub(crate) fn rejection(reply: &str) -> Option<&str> {
    let reply = reply.trim();
    if reply.is_empty() || reply == "ok" {
        return None;
    }
    let lower = reply.to_ascii_lowercase();
    (lower.starts_with("error") || lower.contains("could not")).then_some(reply)
}

/// Icon codes understood by `hyprctl notify`.
pub(crate) const fn notify_icon(severity: Severity) -> i8 {
    match severity {
        Severity::Info | Severity::Debug => 1,
        Severity::Success => 5,
        Severity::Error => 3,
    }
}

pub(crate) fn rgba([r, g, b, a]: [u8; 4]) -> String {
    format!("rgba({r:02x}{g:02x}{b:02x}{a:02x})")
}
