//! Non-blocking collection of worker results.

use std::sync::mpsc::TryRecvError;

use tracing::{info, warn};

use super::{ActiveBatch, BatchKind, BuildOrchestrator, BuildOutcome, BuildStatus, ORCHESTRATOR_TARGET};
use crate::host::Notifier;

/// What a tick observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No batch is in flight.
    Idle,
    /// Results are still outstanding.
    Pending {
        /// Descriptors left unresolved.
        remaining: usize,
    },
    /// The last result was collected and the batch has ended.
    Completed {
        /// Entry point that started the batch.
        kind: BatchKind,
        /// Number of workers that reported an error.
        failures: usize,
    },
}

impl BuildOrchestrator {
    /// Reports every result that has arrived since the last tick.
    ///
    /// Never blocks. Once every descriptor has been resolved the batch is
    /// dropped and [`TickOutcome::Completed`] is returned exactly once.
    pub fn tick(&mut self, notifier: &Notifier) -> TickOutcome {
        let Some(batch) = self.active.as_mut() else {
            return TickOutcome::Idle;
        };

        loop {
            match batch.outcomes.try_recv() {
                Ok(outcome) => batch.settle(&outcome, notifier),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    batch.abandon_unreported(notifier);
                    break;
                }
            }
        }

        if !batch.descriptors.is_empty() {
            return TickOutcome::Pending {
                remaining: batch.descriptors.len(),
            };
        }

        let kind = batch.kind;
        let failures = batch.failures;
        self.active = None;
        info!(target: ORCHESTRATOR_TARGET, %kind, failures, "batch completed");
        TickOutcome::Completed { kind, failures }
    }
}

impl ActiveBatch {
    fn settle(&mut self, outcome: &BuildOutcome, notifier: &Notifier) {
        let Some(position) = self
            .descriptors
            .iter()
            .position(|descriptor| descriptor.id() == outcome.id())
        else {
            warn!(target: ORCHESTRATOR_TARGET, plugin = outcome.name(), "result for unknown descriptor");
            return;
        };
        self.descriptors.remove(position);

        let name = outcome.name();
        match outcome.result() {
            Ok(BuildStatus::Built) => match self.kind {
                BatchKind::Install => notifier.success(&format!("Installed {name}")),
                BatchKind::Update => notifier.success(&format!("Updated {name}")),
            },
            Ok(BuildStatus::UpToDate) => notifier.info(&format!("{name} is up to date")),
            Err(error) => {
                self.failures += 1;
                notifier.error(&error.to_string());
            }
        }
    }

    /// Resolves descriptors whose worker vanished without sending a result.
    fn abandon_unreported(&mut self, notifier: &Notifier) {
        for descriptor in self.descriptors.drain(..) {
            self.failures += 1;
            notifier.error(&format!(
                "Failed to {} {}: worker exited without a result",
                self.kind,
                descriptor.name()
            ));
        }
    }
}

