//! Shared test doubles and fixtures.


use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::PluginError;
use crate::host::{Host, Severity};
use crate::manifest::MANIFEST_FILE;
use crate::paths::binary_file_name;

/// Host double that records everything it is asked to do.
///
/// `plugin load <path>` adds the path to the active list and
/// `plugin unload <path>` removes it, so load/clear cycles behave like the
/// real compositor.
#[derive(Debug, Default)]
pub struct RecordingHost {
    notifications: Mutex<Vec<(Severity, String)>>,
    invocations: Mutex<Vec<(String, String)>>,
    active: Mutex<Vec<PathBuf>>,
    commit: Option<String>,
}

impl RecordingHost {
    pub fn with_commit(commit: &str) -> Self {
        Self {
            commit: Some(commit.to_owned()),
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> Vec<(Severity, String)> {
        self.notifications.lock().expect("notifications lock").clone()
    }

    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|(seen, _)| *seen == severity)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn invocations(&self) -> Vec<(String, String)> {
        self.invocations.lock().expect("invocations lock").clone()
    }

    pub fn set_active(&self, paths: Vec<PathBuf>) {
        *self.active.lock().expect("active lock") = paths;
    }
}

impl Host for RecordingHost {
    fn invoke(&self, command: &str, args: &str) -> Result<String, PluginError> {
        self.invocations
            .lock()
            .expect("invocations lock")
            .push((command.to_owned(), args.to_owned()));
        let mut active = self.active.lock().expect("active lock");
        if let Some(path) = args.strip_prefix("load ") {
            active.push(PathBuf::from(path));
        } else if let Some(path) = args.strip_prefix("unload ") {
            active.retain(|loaded| loaded != Path::new(path));
        }
        Ok(String::from("ok"))
    }

    fn active_plugins(&self) -> Vec<PathBuf> {
        self.active.lock().expect("active lock").clone()
    }

    fn commit_hash(&self) -> Option<String> {
        self.commit.clone()
    }

    fn notify(&self, severity: Severity, message: &str) {
        self.notifications
            .lock()
            .expect("notifications lock")
            .push((severity, message.to_owned()));
    }
}

/// Writes a manifest into `dir` declaring `name` with a build step that
/// produces its default output.
pub fn write_local_plugin(dir: &Path, name: &str) {
    let output = binary_file_name(name);
    let manifest = format!("[{name}]\n\n[{name}.build]\nsteps = [\"printf built > {output}\"]\n");
    fs::create_dir_all(dir).expect("create plugin dir");
    fs::write(dir.join(MANIFEST_FILE), manifest).expect("write manifest");
}

/// Writes a fake installed binary for `name` into `bin`.
pub fn write_binary(bin: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(bin).expect("create bin dir");
    let path = bin.join(binary_file_name(name));
    fs::write(&path, b"binary").expect("write binary");
    path
}
