//! Install and update batches.
//!
//! A batch spawns one detached worker per requirement (plus the manager's
//! own source on update). Every worker first waits on the batch's
//! [`HeaderBarrier`], then takes its source's checkout lock so that plugins
//! sharing a clone are built one at a time, and finally sends exactly one
//! [`BuildOutcome`] over the batch channel. The coordinating thread never
//! blocks on workers: [`BuildOrchestrator::tick`] drains the channel without
//! waiting.

mod descriptor;
mod reconcile;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{debug, info, warn};

pub use self::descriptor::{BatchKind, BuildOutcome, BuildProcessDescriptor, BuildStatus};
pub use self::reconcile::TickOutcome;
use crate::error::PluginError;
use crate::headers::{HeaderBarrier, HeaderSetup};
use crate::paths::PluginPaths;
use crate::requirement::PluginRequirement;
use crate::source::{BuildContext, PluginSource};

/// Tracing target for batch orchestration.
const ORCHESTRATOR_TARGET: &str = "hyprload_plugins::orchestrator";

/// Name reported for the manager's own source.
pub const SELF_PLUGIN_NAME: &str = "hyprload";

/// Result of asking for a new batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStart {
    /// Workers were spawned.
    Started {
        /// Number of build workers.
        workers: usize,
        /// Whether a separate header-setup worker was spawned.
        header_setup: bool,
    },
    /// Another batch is still in flight; nothing was spawned.
    AlreadyRunning,
}

/// State of the batch currently in flight.
#[derive(Debug)]
pub struct ActiveBatch {
    kind: BatchKind,
    descriptors: Vec<BuildProcessDescriptor>,
    outcomes: Receiver<BuildOutcome>,
    barrier: Arc<HeaderBarrier>,
    failures: usize,
}

impl ActiveBatch {
    /// Tracks `descriptors` whose workers report on `outcomes`.
    #[must_use]
    pub fn new(
        kind: BatchKind,
        descriptors: Vec<BuildProcessDescriptor>,
        outcomes: Receiver<BuildOutcome>,
        barrier: Arc<HeaderBarrier>,
    ) -> Self {
        Self {
            kind,
            descriptors,
            outcomes,
            barrier,
            failures: 0,
        }
    }

    /// Entry point that started the batch.
    #[must_use]
    pub const fn kind(&self) -> BatchKind {
        self.kind
    }

    /// Descriptors whose result has not been observed yet.
    #[must_use]
    pub fn descriptors(&self) -> &[BuildProcessDescriptor] {
        &self.descriptors
    }

    /// Header readiness gate of this batch.
    #[must_use]
    pub fn barrier(&self) -> &HeaderBarrier {
        &self.barrier
    }
}

/// Owns the in-flight batch, if any.
#[derive(Debug, Default)]
pub struct BuildOrchestrator {
    active: Option<ActiveBatch>,
}

impl BuildOrchestrator {
    /// Creates an idle orchestrator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while a batch is running.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.active.is_some()
    }

    /// The batch in flight.
    #[must_use]
    pub const fn active(&self) -> Option<&ActiveBatch> {
        self.active.as_ref()
    }

    /// Adopts `batch` as the in-flight batch unless one is already running.
    ///
    /// Returns `false` and drops `batch` if the orchestrator is busy.
    pub fn begin(&mut self, batch: ActiveBatch) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(batch);
        true
    }

    /// Starts an install or update batch for `requirements`.
    ///
    /// `own_source` is built alongside the requirements; update batches pass
    /// the manager's own source here. Returns
    /// [`BatchStart::AlreadyRunning`] without spawning anything if a batch is
    /// in flight.
    pub fn start(
        &mut self,
        kind: BatchKind,
        requirements: &[PluginRequirement],
        own_source: Option<Arc<PluginSource>>,
        setup: HeaderSetup,
        paths: &PluginPaths,
    ) -> BatchStart {
        if self.is_in_flight() {
            debug!(target: ORCHESTRATOR_TARGET, %kind, "batch already in flight");
            return BatchStart::AlreadyRunning;
        }

        let headers_dir = setup.headers_dir();
        let context = Arc::new(BuildContext::new(
            paths.clone(),
            headers_dir.clone(),
            setup.host_commit().map(str::to_owned),
        ));
        let mut jobs: Vec<(String, Arc<PluginSource>)> = requirements
            .iter()
            .map(|requirement| (requirement.name().to_owned(), Arc::clone(requirement.source())))
            .collect();
        if let Some(source) = own_source {
            jobs.push((SELF_PLUGIN_NAME.to_owned(), source));
        }

        // Nothing waits on the barrier of an empty batch.
        let barrier = Arc::new(HeaderBarrier::new());
        let header_setup = !jobs.is_empty() && arm_barrier(&barrier, setup);
        for (_, source) in &jobs {
            source.lock_checkout().reset();
        }

        let (sender, outcomes) = mpsc::channel();
        let descriptors: Vec<BuildProcessDescriptor> = jobs
            .into_iter()
            .enumerate()
            .map(|(id, (name, source))| BuildProcessDescriptor::new(id, name, source, &headers_dir))
            .collect();
        for descriptor in &descriptors {
            spawn_worker(kind, descriptor, &barrier, &context, sender.clone());
        }
        drop(sender);

        let workers = descriptors.len();
        info!(target: ORCHESTRATOR_TARGET, %kind, workers, header_setup, "batch started");
        self.active = Some(ActiveBatch::new(kind, descriptors, outcomes, barrier));
        BatchStart::Started {
            workers,
            header_setup,
        }
    }
}

/// Resolves `barrier` now when headers are configured, otherwise spawns the
/// header-setup worker. Returns `true` if a worker was spawned.
fn arm_barrier(barrier: &Arc<HeaderBarrier>, setup: HeaderSetup) -> bool {
    if setup.is_immediate() {
        barrier.resolve(setup.prepare().map_err(|err| setup_failure(&err)));
        return false;
    }

    let shared = Arc::clone(barrier);
    let spawned = thread::Builder::new()
        .name(String::from("hyprload-headers"))
        .spawn(move || {
            let outcome = setup.prepare().map_err(|err| setup_failure(&err));
            if let Err(message) = &outcome {
                warn!(target: ORCHESTRATOR_TARGET, %message, "header setup failed");
            }
            shared.resolve(outcome);
        });
    if let Err(err) = spawned {
        barrier.resolve(Err(format!("could not start header setup: {err}")));
        return false;
    }
    true
}

fn setup_failure(error: &PluginError) -> String {
    match error {
        PluginError::HeadersUnready { message } => message.clone(),
        other => other.to_string(),
    }
}

fn spawn_worker(
    kind: BatchKind,
    descriptor: &BuildProcessDescriptor,
    barrier: &Arc<HeaderBarrier>,
    context: &Arc<BuildContext>,
    sender: Sender<BuildOutcome>,
) {
    let barrier = Arc::clone(barrier);
    let context = Arc::clone(context);
    let fallback = sender.clone();
    let name = descriptor.name().to_owned();
    let job = descriptor.clone();

    let spawned = thread::Builder::new()
        .name(format!("hyprload-build-{name}"))
        .spawn(move || {
            let result = run_worker(kind, &job, &barrier, &context);
            if sender.send(job.outcome(result)).is_err() {
                debug!(target: ORCHESTRATOR_TARGET, plugin = job.name(), "batch dropped before worker finished");
            }
        });

    if let Err(err) = spawned {
        let error = PluginError::Spawn {
            program: format!("build worker for {name}"),
            source: Arc::new(err),
        };
        if fallback.send(descriptor.outcome(Err(error))).is_err() {
            warn!(target: ORCHESTRATOR_TARGET, plugin = %name, "could not report worker spawn failure");
        }
    }
}

fn run_worker(
    kind: BatchKind,
    descriptor: &BuildProcessDescriptor,
    barrier: &HeaderBarrier,
    context: &BuildContext,
) -> Result<BuildStatus, PluginError> {
    let name = descriptor.name();
    barrier.wait().map_err(|err| err.context(kind.verb(), name))?;

    let source = descriptor.source();
    let mut checkout = source.lock_checkout();
    debug!(target: ORCHESTRATOR_TARGET, plugin = name, %kind, "worker acquired source");

    match kind {
        BatchKind::Install => {
            if !source.is_source_available() {
                source
                    .install_source()
                    .map_err(|err| err.context("install", format!("{name} source")))?;
            }
            source.install(name, context).map_err(|err| err.context("install", name))?;
            Ok(BuildStatus::Built)
        }
        BatchKind::Update => {
            if checkout.is_refreshed() {
                source.install(name, context).map_err(|err| err.context("rebuild", name))?;
                return Ok(BuildStatus::Built);
            }
            if source.is_source_available() && source.is_up_to_date() {
                return Ok(BuildStatus::UpToDate);
            }
            let updated = source.update(name, context);
            checkout.mark_refreshed();
            updated.map_err(|err| err.context("update", name))?;
            Ok(BuildStatus::Built)
        }
    }
}

#[cfg(test)]
mod tests;
