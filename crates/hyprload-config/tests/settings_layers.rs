//! Integration tests for layered settings resolution.

use std::ffi::{OsStr, OsString};
use std::sync::{Mutex, MutexGuard};

use hyprload_config::{LogFormat, Settings};
use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::rstest;
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX.lock().expect("env mutex poisoned");
        let previous = std::env::var_os(key);
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

fn args(extra: &[&OsStr]) -> Vec<OsString> {
    std::iter::once(OsString::from("hyprload"))
        .chain(extra.iter().map(|arg| arg.to_os_string()))
        .collect()
}

#[test]
fn command_line_sets_root_and_headers() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let root = temp_dir.path().join("hyprload");
    let headers = temp_dir.path().join("include");

    let settings = Settings::load_from_iter(args(&[
        OsStr::new("--root"),
        root.as_os_str(),
        OsStr::new("--hyprland-headers"),
        headers.as_os_str(),
    ]))
    .expect("settings should load");

    assert_eq!(settings.root_path(), root);
    assert_eq!(settings.headers_override(), Some(headers.as_path()));
}

#[test]
fn environment_supplies_log_format() {
    let _env = EnvOverride::set_var("HYPRLOAD_LOG_FORMAT", OsStr::new("json"));

    let settings = Settings::load_from_iter(args(&[])).expect("settings should load");

    assert_eq!(settings.log_format(), LogFormat::Json);
}

#[rstest]
#[case("trace")]
#[case("hyprload_plugins=debug")]
fn command_line_overrides_environment_filter(#[case] filter: &str) {
    let _env = EnvOverride::set_var("HYPRLOAD_LOG_FILTER", OsStr::new("warn"));

    let settings = Settings::load_from_iter(args(&[
        OsStr::new("--log-filter"),
        OsStr::new(filter),
    ]))
    .expect("settings should load");

    assert_eq!(settings.log_filter(), filter);
}
