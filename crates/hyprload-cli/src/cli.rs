//! Command-line argument definitions.

use std::time::Duration;

use clap::{Parser, Subcommand};

/// Default interval between reconciler ticks, in milliseconds.
pub(crate) const DEFAULT_TICK_MS: u64 = 250;

/// Drives hyprload outside the compositor process.
#[derive(Parser, Debug)]
#[command(name = "hyprload", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Suppresses informational notifications.
    #[arg(long, global = true)]
    pub(crate) quiet: bool,
    /// Shows debug notifications.
    #[arg(long, global = true)]
    pub(crate) debug: bool,
    /// What to do.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Subcommands of the driver.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Loads plugins, then reads dispatcher commands from stdin.
    Serve {
        /// Milliseconds between reconciler ticks.
        #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS)]
        tick_ms: u64,
    },
    /// Builds every configured plugin without loading them.
    Install,
    /// Refreshes and rebuilds stale plugins without loading them.
    Update,
    /// Removes session directories left by crashed runs.
    Sweep,
}

impl CliCommand {
    /// Tick interval for commands that poll the reconciler.
    pub(crate) const fn tick_interval(&self) -> Duration {
        match self {
            Self::Serve { tick_ms } => Duration::from_millis(*tick_ms),
            Self::Install | Self::Update | Self::Sweep => Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}
