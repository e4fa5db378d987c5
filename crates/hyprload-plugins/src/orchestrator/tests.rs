//! Unit tests for batch orchestration and tick reconciliation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::host::{Notifier, Severity};
use crate::tests::{RecordingHost, write_local_plugin};

struct Harness {
    root: TempDir,
    paths: PluginPaths,
    host: Arc<RecordingHost>,
    notifier: Notifier,
}

impl Harness {
    fn configured_headers(&self) -> HeaderSetup {
        HeaderSetup::new(self.paths.clone(), Some(self.root.path().join("headers")), None)
    }

    fn local_requirement(&self, name: &str) -> PluginRequirement {
        let dir = self.root.path().join("checkouts").join(name);
        write_local_plugin(&dir, name);
        PluginRequirement::new(name, Arc::new(PluginSource::local(dir)), &self.paths)
    }
}

#[fixture]
fn harness() -> Harness {
    let root = TempDir::new().expect("tempdir");
    let paths = PluginPaths::new(root.path());
    paths.ensure().expect("layout");
    let host = Arc::new(RecordingHost::default());
    let notifier = Notifier::new(host.clone(), false, false);
    Harness {
        root,
        paths,
        host,
        notifier,
    }
}

fn descriptor(id: usize, name: &str) -> BuildProcessDescriptor {
    BuildProcessDescriptor::new(id, name, Arc::new(PluginSource::local("/nowhere")), "/headers")
}

fn tick_until_done(orchestrator: &mut BuildOrchestrator, notifier: &Notifier) -> TickOutcome {
    for _ in 0..1_000 {
        match orchestrator.tick(notifier) {
            TickOutcome::Pending { .. } => thread::sleep(Duration::from_millis(10)),
            done => return done,
        }
    }
    panic!("batch did not finish");
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[rstest]
fn tick_without_batch_is_idle(harness: Harness) {
    let mut orchestrator = BuildOrchestrator::new();
    assert_eq!(orchestrator.tick(&harness.notifier), TickOutcome::Idle);
    assert!(harness.host.notifications().is_empty());
}

#[rstest]
fn tick_removes_only_resolved_descriptors(harness: Harness) {
    let (sender, receiver) = mpsc::channel();
    let descriptors = vec![descriptor(0, "alpha"), descriptor(1, "beta"), descriptor(2, "gamma")];
    let mut orchestrator = BuildOrchestrator::new();
    assert!(orchestrator.begin(ActiveBatch::new(
        BatchKind::Install,
        descriptors.clone(),
        receiver,
        Arc::new(HeaderBarrier::resolved()),
    )));

    let failure = PluginError::BuildFailed {
        name: String::from("beta"),
        status: 2,
        output: String::from("make: *** [all] Error 1"),
    }
    .context("install", "beta");
    sender.send(descriptors[0].outcome(Ok(BuildStatus::Built))).expect("send");
    sender.send(descriptors[1].outcome(Err(failure))).expect("send");

    assert_eq!(
        orchestrator.tick(&harness.notifier),
        TickOutcome::Pending { remaining: 1 }
    );
    assert!(orchestrator.is_in_flight());
    let remaining: Vec<&str> = orchestrator
        .active()
        .expect("batch")
        .descriptors()
        .iter()
        .map(BuildProcessDescriptor::name)
        .collect();
    assert_eq!(remaining, vec!["gamma"]);
    assert_eq!(harness.host.messages(Severity::Success), vec!["[hyprload] Installed alpha"]);
    let errors = harness.host.messages(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Failed to install beta"));

    sender.send(descriptors[2].outcome(Ok(BuildStatus::UpToDate))).expect("send");
    assert_eq!(
        orchestrator.tick(&harness.notifier),
        TickOutcome::Completed {
            kind: BatchKind::Install,
            failures: 1,
        }
    );
    assert!(!orchestrator.is_in_flight());
    assert_eq!(orchestrator.tick(&harness.notifier), TickOutcome::Idle);
}

#[rstest]
fn vanished_workers_are_reported(harness: Harness) {
    let (sender, receiver) = mpsc::channel::<BuildOutcome>();
    let mut orchestrator = BuildOrchestrator::new();
    orchestrator.begin(ActiveBatch::new(
        BatchKind::Update,
        vec![descriptor(0, "alpha")],
        receiver,
        Arc::new(HeaderBarrier::resolved()),
    ));
    drop(sender);

    assert_eq!(
        orchestrator.tick(&harness.notifier),
        TickOutcome::Completed {
            kind: BatchKind::Update,
            failures: 1,
        }
    );
    assert_eq!(harness.host.messages(Severity::Error).len(), 1);
}

// ---------------------------------------------------------------------------
// Batch start
// ---------------------------------------------------------------------------

#[rstest]
fn second_batch_is_rejected_while_in_flight(harness: Harness) {
    let (_sender, receiver) = mpsc::channel();
    let mut orchestrator = BuildOrchestrator::new();
    orchestrator.begin(ActiveBatch::new(
        BatchKind::Install,
        vec![descriptor(0, "alpha")],
        receiver,
        Arc::new(HeaderBarrier::new()),
    ));

    let requirements = vec![harness.local_requirement("hyprfoo")];
    let start = orchestrator.start(
        BatchKind::Install,
        &requirements,
        None,
        harness.configured_headers(),
        &harness.paths,
    );

    assert_eq!(start, BatchStart::AlreadyRunning);
    assert_eq!(orchestrator.active().expect("batch").descriptors().len(), 1);
    assert!(!harness.paths.binary_path("hyprfoo").exists());
}

#[rstest]
fn install_batch_builds_every_requirement(harness: Harness) {
    let requirements = vec![
        harness.local_requirement("hyprfoo"),
        harness.local_requirement("hyprbar"),
    ];
    let mut orchestrator = BuildOrchestrator::new();

    let start = orchestrator.start(
        BatchKind::Install,
        &requirements,
        None,
        harness.configured_headers(),
        &harness.paths,
    );
    assert_eq!(
        start,
        BatchStart::Started {
            workers: 2,
            header_setup: false,
        }
    );

    assert_eq!(
        tick_until_done(&mut orchestrator, &harness.notifier),
        TickOutcome::Completed {
            kind: BatchKind::Install,
            failures: 0,
        }
    );
    for requirement in &requirements {
        assert!(requirement.is_installed(), "{} not installed", requirement.name());
    }
    assert!(harness.root.path().join("pkgconfig/hyprland.pc").exists());
}

#[rstest]
fn update_batch_rebuilds_local_sources(harness: Harness) {
    let requirements = vec![harness.local_requirement("hyprfoo")];
    let mut orchestrator = BuildOrchestrator::new();
    orchestrator.start(
        BatchKind::Update,
        &requirements,
        None,
        harness.configured_headers(),
        &harness.paths,
    );

    assert_eq!(
        tick_until_done(&mut orchestrator, &harness.notifier),
        TickOutcome::Completed {
            kind: BatchKind::Update,
            failures: 0,
        }
    );
    assert_eq!(harness.host.messages(Severity::Success), vec!["[hyprload] Updated hyprfoo"]);
}

#[rstest]
fn empty_batch_skips_header_setup(harness: Harness) {
    let mut orchestrator = BuildOrchestrator::new();
    let managed = HeaderSetup::new(harness.paths.clone(), None, Some(String::from("abc123")));

    let start = orchestrator.start(BatchKind::Install, &[], None, managed, &harness.paths);

    assert_eq!(
        start,
        BatchStart::Started {
            workers: 0,
            header_setup: false,
        }
    );
    let barrier_state = orchestrator.active().and_then(|batch| batch.barrier().peek());
    assert_eq!(barrier_state, None);
    assert!(!harness.paths.host_checkout_dir().exists());
    assert_eq!(
        orchestrator.tick(&harness.notifier),
        TickOutcome::Completed {
            kind: BatchKind::Install,
            failures: 0,
        }
    );
}

#[rstest]
fn header_failure_fails_every_worker(harness: Harness) {
    let requirements = vec![
        harness.local_requirement("hyprfoo"),
        harness.local_requirement("hyprbar"),
    ];
    let mut orchestrator = BuildOrchestrator::new();
    let managed = HeaderSetup::new(harness.paths.clone(), None, None);

    let start = orchestrator.start(BatchKind::Install, &requirements, None, managed, &harness.paths);
    assert_eq!(
        start,
        BatchStart::Started {
            workers: 2,
            header_setup: true,
        }
    );

    assert_eq!(
        tick_until_done(&mut orchestrator, &harness.notifier),
        TickOutcome::Completed {
            kind: BatchKind::Install,
            failures: 2,
        }
    );
    for message in harness.host.messages(Severity::Error) {
        assert!(message.contains("Failed to setup host headers"), "unexpected: {message}");
    }
    for requirement in &requirements {
        assert!(!requirement.is_installed());
    }
}

#[rstest]
fn shared_source_is_built_once_per_plugin(harness: Harness) {
    let dir = harness.root.path().join("checkouts/mono");
    write_local_plugin(&dir, "alpha");
    let manifest = dir.join(crate::manifest::MANIFEST_FILE);
    let mut text = std::fs::read_to_string(&manifest).expect("manifest");
    text.push_str(&format!(
        "\n[beta]\n\n[beta.build]\nsteps = [\"printf built > {}\"]\n",
        crate::paths::binary_file_name("beta")
    ));
    std::fs::write(&manifest, text).expect("manifest");

    let source = Arc::new(PluginSource::local(PathBuf::from(&dir)));
    let requirements = vec![
        PluginRequirement::new("alpha", Arc::clone(&source), &harness.paths),
        PluginRequirement::new("beta", Arc::clone(&source), &harness.paths),
    ];
    let mut orchestrator = BuildOrchestrator::new();
    orchestrator.start(
        BatchKind::Install,
        &requirements,
        None,
        harness.configured_headers(),
        &harness.paths,
    );

    tick_until_done(&mut orchestrator, &harness.notifier);
    assert!(harness.paths.binary_path("alpha").exists());
    assert!(harness.paths.binary_path("beta").exists());
}
