//! Entry point for the `hyprload` host driver.
//!
//! Delegates to [`hyprload_cli::run`] with the process arguments and the
//! real standard streams.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    hyprload_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
