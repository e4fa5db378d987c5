//! The plugin manager driven by the host's event loop.
//!
//! [`Hyprload`] owns all process-scoped state: the source registry, the
//! current requirements, the in-flight batch, and the active session. The
//! host calls [`Hyprload::dispatch`] for user commands and
//! [`Hyprload::tick`] from its timer; neither ever waits on a build.

mod command;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

pub use self::command::Command;
use crate::error::PluginError;
use crate::headers::HeaderSetup;
use crate::host::{Host, Notifier};
use crate::orchestrator::{BatchKind, BatchStart, BuildOrchestrator, TickOutcome};
use crate::paths::PluginPaths;
use crate::registry::SourceRegistry;
use crate::requirement::{PluginRequirement, load_requirements};
use crate::session::{SessionManager, SweepReport};
use crate::source::PluginSource;

/// Tracing target for manager events.
const MANAGER_TARGET: &str = "hyprload_plugins::manager";

/// Settings the manager needs from the configuration layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Root of the plugin tree.
    pub root: PathBuf,
    /// User configuration document listing wanted plugins.
    pub config_path: PathBuf,
    /// Explicit host headers directory, if configured.
    pub headers: Option<PathBuf>,
    /// Suppress non-debug notifications.
    pub quiet: bool,
    /// Show debug notifications.
    pub debug: bool,
}

/// Plugin manager state for one host process.
pub struct Hyprload {
    options: ManagerOptions,
    paths: PluginPaths,
    host: Arc<dyn Host>,
    notifier: Notifier,
    registry: SourceRegistry,
    requirements: Vec<PluginRequirement>,
    config_loaded: bool,
    orchestrator: BuildOrchestrator,
    sessions: SessionManager,
    auto_activate: bool,
}

impl std::fmt::Debug for Hyprload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hyprload")
            .field("options", &self.options)
            .field("requirements", &self.requirements.len())
            .field("orchestrator", &self.orchestrator)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Hyprload {
    /// Creates a manager that reports through `host`.
    #[must_use]
    pub fn new(options: ManagerOptions, host: Arc<dyn Host>) -> Self {
        let paths = PluginPaths::new(&options.root);
        let sessions = SessionManager::new(paths.clone());
        Self::with_sessions(options, host, sessions)
    }

    /// Creates a manager around an existing session manager.
    #[must_use]
    pub fn with_sessions(options: ManagerOptions, host: Arc<dyn Host>, sessions: SessionManager) -> Self {
        let notifier = Notifier::new(Arc::clone(&host), options.quiet, options.debug);
        Self {
            paths: PluginPaths::new(&options.root),
            options,
            host,
            notifier,
            registry: SourceRegistry::new(),
            requirements: Vec::new(),
            config_loaded: false,
            orchestrator: BuildOrchestrator::new(),
            sessions,
            auto_activate: true,
        }
    }

    /// Chooses whether finished batches reload plugins automatically.
    pub const fn set_auto_activate(&mut self, enabled: bool) {
        self.auto_activate = enabled;
    }

    /// Plugin tree layout.
    #[must_use]
    pub const fn paths(&self) -> &PluginPaths {
        &self.paths
    }

    /// Notification sink.
    #[must_use]
    pub const fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Requirements from the last configuration load.
    #[must_use]
    pub fn requirements(&self) -> &[PluginRequirement] {
        &self.requirements
    }

    /// Active session state.
    #[must_use]
    pub const fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Returns `true` while an install or update batch is in flight.
    #[must_use]
    pub const fn is_updating(&self) -> bool {
        self.orchestrator.is_in_flight()
    }

    /// Prepares the plugin tree, sweeps crashed sessions, reads the
    /// configuration, and loads the built plugins.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the plugin tree cannot be created or
    /// scanned.
    pub fn startup(&mut self) -> Result<SweepReport, PluginError> {
        self.paths.ensure()?;
        let report = self.sweep()?;
        self.reload_config();
        self.load_plugins();
        Ok(report)
    }

    /// Removes session directories left behind by crashed runs.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the plugins directory cannot be read.
    pub fn sweep(&self) -> Result<SweepReport, PluginError> {
        let report = self.sessions.sweep_orphans()?;
        for dir in &report.removed {
            self.notifier.debug(&format!("Removed orphaned session {}", dir.display()));
        }
        Ok(report)
    }

    /// Handles one dispatcher command line.
    pub fn dispatch(&mut self, line: &str) {
        let command = Command::parse(line);
        debug!(target: MANAGER_TARGET, ?command, "dispatch");
        match command {
            Command::Load => self.load_plugins(),
            Command::Clear => self.clear_plugins(),
            Command::Reload => self.reload_plugins(),
            Command::Install => {
                self.install_plugins();
            }
            Command::Update => {
                self.update_plugins();
            }
            Command::Overlay => self.notifier.info("Overlay is not available in this host"),
            Command::Unknown(other) => self.notifier.info(&format!("Unknown command: {other}")),
        }
    }

    /// Rebuilds the registry and requirements from the user configuration.
    ///
    /// Returns the number of requirements. Unreadable documents and bad
    /// entries are reported; a missing document yields no requirements.
    /// After an unreadable document the wanted plugins count as unknown, so
    /// clearing keeps every built binary until a later load succeeds.
    pub fn reload_config(&mut self) -> usize {
        self.registry = SourceRegistry::new();
        let path = self.options.config_path.clone();
        let (requirements, loaded) = match load_requirements(&path, &mut self.registry, &self.paths) {
            Ok(set) => {
                let (requirements, rejected) = set.into_parts();
                for error in rejected {
                    self.notifier.error(&error.to_string());
                }
                (requirements, true)
            }
            Err(PluginError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                self.notifier
                    .debug(&format!("No plugin configuration at {}", path.display()));
                (Vec::new(), true)
            }
            Err(error) => {
                self.notifier.error(&error.to_string());
                (Vec::new(), false)
            }
        };
        self.requirements = requirements;
        self.config_loaded = loaded;
        info!(
            target: MANAGER_TARGET,
            requirements = self.requirements.len(),
            sources = self.registry.len(),
            "configuration loaded"
        );
        self.requirements.len()
    }

    /// Stages and loads built plugins into a new session.
    pub fn load_plugins(&mut self) {
        if let Err(error) = self.sessions.load(self.host.as_ref(), &self.notifier) {
            self.notifier.error(&error.to_string());
        }
    }

    /// Unloads the session and prunes binaries no longer required.
    ///
    /// Nothing is pruned unless the last configuration load succeeded.
    pub fn clear_plugins(&mut self) {
        let keep: Vec<String> = self
            .requirements
            .iter()
            .map(|requirement| requirement.name().to_owned())
            .collect();
        let keep = self.config_loaded.then_some(keep.as_slice());
        if let Err(error) = self.sessions.clear(self.host.as_ref(), &self.notifier, keep) {
            self.notifier.error(&error.to_string());
        }
    }

    /// Clears and loads again, picking up freshly built binaries.
    pub fn reload_plugins(&mut self) {
        self.notifier.info("Reloading plugins...");
        self.clear_plugins();
        self.load_plugins();
        self.notifier.info("Reloaded plugins!");
    }

    /// Starts an install batch.
    pub fn install_plugins(&mut self) -> BatchStart {
        self.start_batch(BatchKind::Install)
    }

    /// Starts an update batch, including the manager's own source.
    pub fn update_plugins(&mut self) -> BatchStart {
        self.start_batch(BatchKind::Update)
    }

    /// Collects finished build results; reloads plugins once a batch ends.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.orchestrator.tick(&self.notifier);
        if let TickOutcome::Completed { kind, failures } = outcome {
            match (kind, failures) {
                (BatchKind::Install, 0) => self.notifier.success("Installed all plugins"),
                (BatchKind::Update, 0) => self.notifier.success("Updated all plugins"),
                (_, count) => self
                    .notifier
                    .error(&format!("Failed to {kind} {count} plugin(s)")),
            }
            if self.auto_activate {
                self.reload_plugins();
            }
        }
        outcome
    }

    fn start_batch(&mut self, kind: BatchKind) -> BatchStart {
        if self.orchestrator.is_in_flight() {
            self.notifier.info("Already updating");
            return BatchStart::AlreadyRunning;
        }
        match kind {
            BatchKind::Install => self.notifier.info("Installing plugins..."),
            BatchKind::Update => self.notifier.info("Updating plugins..."),
        }
        self.reload_config();

        let own_source = match kind {
            BatchKind::Install => None,
            BatchKind::Update => Some(Arc::new(PluginSource::self_source(&self.paths))),
        };
        let setup = HeaderSetup::new(
            self.paths.clone(),
            self.options.headers.clone(),
            self.host.commit_hash(),
        );
        self.orchestrator
            .start(kind, &self.requirements, own_source, setup, &self.paths)
    }
}
