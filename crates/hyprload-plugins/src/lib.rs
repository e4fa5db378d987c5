//! Plugin source resolution, build orchestration, and session management
//! for hyprload.
//!
//! The crate turns a user's list of wanted plugins into loaded host plugins.
//! Each wanted plugin becomes a [`PluginRequirement`] backed by a
//! [`PluginSource`] (a git repository, a local directory, or hyprload's own
//! repository). Equivalent sources are shared through the
//! [`SourceRegistry`], so a repository providing several plugins is cloned
//! and fetched once.
//!
//! # Architecture
//!
//! Builds never run on the host's thread. An install or update spawns one
//! detached worker per requirement through the [`BuildOrchestrator`]. Workers
//! wait on a one-shot [`HeaderBarrier`] until host headers of the matching
//! commit are ready, run the build steps from the source's `hyprload.toml`
//! manifest, copy the artifact into the shared binaries directory, and send a
//! single result back over a channel. The host's timer calls
//! [`Hyprload::tick`], which drains results without blocking and reloads the
//! plugins once the batch is done.
//!
//! Loading stages binaries into a `session.<id>` directory guarded by an
//! advisory lock, so a crashed process leaves a recognisable orphan that the
//! next start sweeps away.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hyprload_plugins::{Host, Hyprload, ManagerOptions};
//!
//! fn run(host: Arc<dyn Host>) -> Result<(), hyprload_plugins::PluginError> {
//!     let options = ManagerOptions {
//!         root: "/home/me/.local/share/hyprload".into(),
//!         config_path: "/home/me/.config/hypr/hyprload.toml".into(),
//!         headers: None,
//!         quiet: false,
//!         debug: false,
//!     };
//!     let mut manager = Hyprload::new(options, host);
//!     manager.startup()?;
//!     manager.dispatch("install");
//!     // call manager.tick() from the host's timer
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod headers;
pub mod host;
pub mod manager;
pub mod manifest;
pub mod orchestrator;
pub mod paths;
pub mod process;
pub mod registry;
pub mod requirement;
pub mod session;
pub mod source;

#[cfg(test)]
mod tests;

pub use self::error::PluginError;
pub use self::headers::{HeaderBarrier, HeaderSetup};
pub use self::host::{Host, Notifier, Severity};
pub use self::manager::{Command, Hyprload, ManagerOptions};
pub use self::manifest::{HyprloadManifest, PluginManifest};
pub use self::orchestrator::{
    BatchKind, BatchStart, BuildOrchestrator, BuildOutcome, BuildProcessDescriptor, BuildStatus,
    TickOutcome,
};
pub use self::paths::PluginPaths;
pub use self::registry::SourceRegistry;
pub use self::requirement::{PluginRequirement, RequirementSet};
pub use self::session::{SessionLock, SessionManager, SweepReport};
pub use self::source::{PluginSource, SourceKind, is_equivalent};
