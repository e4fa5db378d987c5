//! Runtime of the `hyprload` host driver.
//!
//! The driver loads [`Settings`] through `ortho_config`, installs telemetry,
//! and then runs one of the subcommands against a [`Hyprload`] manager
//! talking to the compositor. `serve` emulates the in-process plugin: it
//! forwards dispatcher commands read from stdin and ticks the reconciler on
//! a timer. The IO streams and the host are injectable so tests can drive the
//! runtime without a compositor.

use std::ffi::{OsStr, OsString};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use clap::Parser;
use hyprload_config::Settings;
use hyprload_plugins::{BatchKind, BatchStart, Host, Hyprload, ManagerOptions, TickOutcome};
use ortho_config::OrthoConfig;
use tracing::info;

mod cli;
mod errors;
pub mod host;
pub mod telemetry;

use self::cli::{Cli, CliCommand};
pub(crate) use self::errors::AppError;
pub use self::host::HyprctlHost;

/// Tracing target for the driver runtime.
const RUNTIME_TARGET: &str = "hyprload_cli::runtime";

/// Flags consumed by the configuration loader rather than clap.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--root",
    "--config",
    "--hyprland-headers",
    "--log-filter",
    "--log-format",
];

pub(crate) trait SettingsLoader {
    /// Loads settings from the configuration arguments, files, and
    /// environment.
    fn load(&self, args: &[OsString]) -> Result<Settings, AppError>;
}

struct OrthoSettingsLoader;

impl SettingsLoader for OrthoSettingsLoader {
    fn load(&self, args: &[OsString]) -> Result<Settings, AppError> {
        Settings::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// Runs the driver with `args`, writing reports to `stdout` and errors to
/// `stderr`.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let host: Arc<dyn Host> = Arc::new(HyprctlHost::default());
    let stdin = io::BufReader::new(io::stdin());
    run_with(args, &OrthoSettingsLoader, host, stdin, stdout, stderr)
}

pub(crate) fn run_with<I, L, R, W, E>(
    args: I,
    loader: &L,
    host: Arc<dyn Host>,
    input: R,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    L: SettingsLoader,
    R: BufRead + Send + 'static,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let (config_args, cli_args) = split_config_arguments(&args);

    let result = Cli::try_parse_from(cli_args)
        .map_err(AppError::CliUsage)
        .and_then(|cli| loader.load(&config_args).map(|settings| (cli, settings)))
        .and_then(|(cli, settings)| {
            telemetry::initialise(&settings)?;
            execute(&cli, &settings, host, input, stdout)
        });

    match result {
        Ok(code) => code,
        Err(AppError::CliUsage(error)) => {
            writeln!(stderr, "{error}").ok();
            if error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(error) => {
            writeln!(stderr, "{error}").ok();
            ExitCode::FAILURE
        }
    }
}

fn manager_options(cli: &Cli, settings: &Settings) -> ManagerOptions {
    ManagerOptions {
        root: settings.root_path(),
        config_path: settings.user_config_path(),
        headers: settings.headers_override().map(Into::into),
        quiet: cli.quiet || settings.is_quiet(),
        debug: cli.debug || settings.is_debug(),
    }
}

fn execute<R, W>(
    cli: &Cli,
    settings: &Settings,
    host: Arc<dyn Host>,
    input: R,
    stdout: &mut W,
) -> Result<ExitCode, AppError>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let mut manager = Hyprload::new(manager_options(cli, settings), host);
    let interval = cli.command.tick_interval();
    match &cli.command {
        CliCommand::Serve { .. } => serve(&mut manager, input, interval),
        CliCommand::Install => run_batch(&mut manager, BatchKind::Install, interval),
        CliCommand::Update => run_batch(&mut manager, BatchKind::Update, interval),
        CliCommand::Sweep => sweep(&manager, stdout),
    }
}

/// Loads plugins, then alternates between dispatching stdin commands and
/// ticking until stdin closes.
fn serve<R>(manager: &mut Hyprload, input: R, interval: Duration) -> Result<ExitCode, AppError>
where
    R: BufRead + Send + 'static,
{
    manager.startup()?;
    let (sender, lines) = mpsc::channel::<io::Result<String>>();
    thread::Builder::new()
        .name(String::from("hyprload-stdin"))
        .spawn(move || {
            for line in input.lines() {
                if sender.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(AppError::ReadInput)?;

    loop {
        match lines.recv_timeout(interval) {
            Ok(line) => {
                let line = line.map_err(AppError::ReadInput)?;
                if !line.trim().is_empty() {
                    manager.dispatch(&line);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                manager.tick();
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(target: RUNTIME_TARGET, "input closed, shutting down");
    drain(manager, interval);
    manager.clear_plugins();
    Ok(ExitCode::SUCCESS)
}

/// Runs one batch to completion without touching the session.
fn run_batch(manager: &mut Hyprload, kind: BatchKind, interval: Duration) -> Result<ExitCode, AppError> {
    manager.paths().ensure()?;
    manager.set_auto_activate(false);
    let start = match kind {
        BatchKind::Install => manager.install_plugins(),
        BatchKind::Update => manager.update_plugins(),
    };
    if start == BatchStart::AlreadyRunning {
        return Ok(ExitCode::FAILURE);
    }
    match drain(manager, interval) {
        TickOutcome::Completed { failures, .. } if failures > 0 => Err(AppError::BatchFailed {
            kind: kind.to_string(),
            failures,
        }),
        _ => Ok(ExitCode::SUCCESS),
    }
}

/// Ticks until no batch is in flight, returning the final tick outcome.
fn drain(manager: &mut Hyprload, interval: Duration) -> TickOutcome {
    loop {
        match manager.tick() {
            TickOutcome::Pending { .. } => thread::sleep(interval),
            done => return done,
        }
    }
}

fn sweep<W: Write>(manager: &Hyprload, stdout: &mut W) -> Result<ExitCode, AppError> {
    let report = manager.sweep()?;
    for dir in &report.removed {
        writeln!(stdout, "removed {}", dir.display()).map_err(AppError::WriteOutput)?;
    }
    for dir in &report.skipped {
        writeln!(stdout, "skipped {}", dir.display()).map_err(AppError::WriteOutput)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Separates configuration flags (and their values) from clap's arguments.
///
/// The program name is passed to both lists.
fn split_config_arguments(args: &[OsString]) -> (Vec<OsString>, Vec<OsString>) {
    let mut config = Vec::new();
    let mut cli = Vec::new();
    let mut iter = args.iter();
    if let Some(program) = iter.next() {
        config.push(program.clone());
        cli.push(program.clone());
    }
    while let Some(argument) = iter.next() {
        let Some(needs_value) = config_flag(argument) else {
            cli.push(argument.clone());
            continue;
        };
        config.push(argument.clone());
        if needs_value && let Some(value) = iter.next() {
            config.push(value.clone());
        }
    }
    (config, cli)
}

/// Returns `Some(needs_value)` when `argument` is a configuration flag.
fn config_flag(argument: &OsStr) -> Option<bool> {
    let text = argument.to_str()?;
    let (flag, inline) = text
        .split_once('=')
        .map_or((text, false), |(flag, _)| (flag, true));
    CONFIG_CLI_FLAGS.contains(&flag).then_some(!inline)
}
