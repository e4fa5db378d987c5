//! Unit tests for plugin sources.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::git::{canonical_url, repository_name};
use super::*;
use crate::error::PluginError;
use crate::manifest::MANIFEST_FILE;
use crate::paths::{PLUGIN_EXTENSION, PluginPaths};

struct Workspace {
    _root: TempDir,
    paths: PluginPaths,
    context: BuildContext,
    plugin_dir: PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let root = TempDir::new().expect("temp dir");
    let paths = PluginPaths::new(root.path().join("data"));
    paths.ensure().expect("layout");
    let plugin_dir = root.path().join("hyprfoo");
    fs::create_dir_all(&plugin_dir).expect("plugin dir");
    let context = BuildContext::new(paths.clone(), paths.default_headers_dir(), None);
    Workspace {
        _root: root,
        paths,
        context,
        plugin_dir,
    }
}

fn write_manifest(dir: &Path, output: &str, step: &str) {
    let manifest = format!(
        "[hyprfoo]\nversion = \"1.0.0\"\n[hyprfoo.build]\noutput = \"{output}\"\nsteps = [\"{step}\"]\n"
    );
    fs::write(dir.join(MANIFEST_FILE), manifest).expect("write manifest");
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Git identity
// ---------------------------------------------------------------------------

#[rstest]
#[case::shorthand("acme/hyprfoo", "https://github.com/acme/hyprfoo.git")]
#[case::https("https://gitlab.com/acme/hyprfoo", "https://gitlab.com/acme/hyprfoo")]
#[case::ssh("git@github.com:acme/hyprfoo.git", "git@github.com:acme/hyprfoo.git")]
fn git_urls_are_canonicalised(#[case] location: &str, #[case] expected: &str) {
    assert_eq!(canonical_url(location), expected);
}

#[rstest]
#[case::https("https://github.com/acme/hyprfoo.git", "hyprfoo")]
#[case::ssh("git@github.com:acme/hyprbar.git", "hyprbar")]
#[case::trailing_slash("/home/me/plugins/hyprbaz/", "hyprbaz")]
fn repository_name_drops_git_suffix(#[case] location: &str, #[case] expected: &str) {
    assert_eq!(repository_name(location), expected);
}

#[test]
fn pinned_clones_get_distinct_paths() {
    let paths = PluginPaths::new("/data");
    let plain = GitSource::new("acme/hyprfoo", None, None, paths.sources_dir());
    let pinned = GitSource::new(
        "acme/hyprfoo",
        Some("dev".into()),
        Some("abc123".into()),
        paths.sources_dir(),
    );
    assert_eq!(plain.path(), Path::new("/data/plugins/src/hyprfoo"));
    assert_eq!(pinned.path(), Path::new("/data/plugins/src/hyprfoo@dev@abc123"));
}

// ---------------------------------------------------------------------------
// Equivalence
// ---------------------------------------------------------------------------

#[test]
fn identical_git_sources_are_equivalent() {
    let paths = PluginPaths::new("/data");
    let a = PluginSource::git("acme/hyprfoo", Some("main".into()), None, &paths);
    let b = PluginSource::git("https://github.com/acme/hyprfoo.git", Some("main".into()), None, &paths);
    assert!(is_equivalent(&a, &b));
}

#[rstest]
#[case::branch(Some("dev"), None)]
#[case::rev(None, Some("abc123"))]
fn differently_pinned_git_sources_differ(#[case] branch: Option<&str>, #[case] rev: Option<&str>) {
    let paths = PluginPaths::new("/data");
    let plain = PluginSource::git("acme/hyprfoo", None, None, &paths);
    let pinned = PluginSource::git(
        "acme/hyprfoo",
        branch.map(str::to_owned),
        rev.map(str::to_owned),
        &paths,
    );
    assert!(!is_equivalent(&plain, &pinned));
}

#[test]
fn local_sources_compare_by_path() {
    assert!(is_equivalent(&PluginSource::local("/p/a"), &PluginSource::local("/p/a")));
    assert!(!is_equivalent(&PluginSource::local("/p/a"), &PluginSource::local("/p/b")));
}

#[test]
fn self_source_is_never_equivalent() {
    let paths = PluginPaths::new("/data");
    let own = PluginSource::self_source(&paths);
    assert!(!is_equivalent(&own, &own));
    assert!(!is_equivalent(&own, &PluginSource::local(paths.self_source_dir())));
}

#[test]
fn mixed_kinds_are_never_equivalent() {
    let paths = PluginPaths::new("/data");
    let git = PluginSource::git("acme/hyprfoo", None, None, &paths);
    let local = PluginSource::local("/data/plugins/src/hyprfoo");
    assert!(!is_equivalent(&git, &local));
}

// ---------------------------------------------------------------------------
// Local sources
// ---------------------------------------------------------------------------

#[rstest]
fn local_source_installs_built_artifact(workspace: Workspace) {
    write_manifest(&workspace.plugin_dir, "out/hyprfoo.bin", "mkdir -p out && printf v1 > out/hyprfoo.bin");
    let source = PluginSource::local(&workspace.plugin_dir);

    source.install("hyprfoo", &workspace.context).expect("install");

    let installed = workspace.paths.binary_path("hyprfoo");
    assert_eq!(fs::read_to_string(installed).expect("artifact"), "v1");
    assert_eq!(
        listing(workspace.paths.binaries_dir()),
        vec![format!("hyprfoo.{PLUGIN_EXTENSION}")]
    );
}

#[rstest]
fn reinstall_replaces_existing_artifact(workspace: Workspace) {
    let installed = workspace.paths.binary_path("hyprfoo");
    fs::write(&installed, "old").expect("seed artifact");
    write_manifest(&workspace.plugin_dir, "hyprfoo.bin", "printf new > hyprfoo.bin");

    PluginSource::local(&workspace.plugin_dir)
        .install("hyprfoo", &workspace.context)
        .expect("install");

    assert_eq!(fs::read_to_string(installed).expect("artifact"), "new");
}

#[rstest]
fn install_reads_the_manifest_once(workspace: Workspace) {
    write_manifest(
        &workspace.plugin_dir,
        "hyprfoo.bin",
        "printf v1 > hyprfoo.bin && printf broken > hyprload.toml",
    );

    PluginSource::local(&workspace.plugin_dir)
        .install("hyprfoo", &workspace.context)
        .expect("install uses the manifest read before building");

    let installed = workspace.paths.binary_path("hyprfoo");
    assert_eq!(fs::read_to_string(installed).expect("artifact"), "v1");
}

#[rstest]
fn missing_artifact_leaves_binaries_untouched(workspace: Workspace) {
    let existing = workspace.paths.binary_path("hyprfoo");
    fs::write(&existing, "previous").expect("seed artifact");
    write_manifest(&workspace.plugin_dir, "never-built.bin", "true");
    let before = listing(workspace.paths.binaries_dir());

    let err = PluginSource::local(&workspace.plugin_dir)
        .install("hyprfoo", &workspace.context)
        .expect_err("artifact is missing");

    assert!(matches!(err, PluginError::ArtifactMissing { .. }), "got {err}");
    assert_eq!(listing(workspace.paths.binaries_dir()), before);
    assert_eq!(fs::read_to_string(existing).expect("artifact"), "previous");
}

#[rstest]
fn failing_build_step_reports_output(workspace: Workspace) {
    write_manifest(&workspace.plugin_dir, "hyprfoo.bin", "echo compiler exploded >&2; exit 2");
    let err = PluginSource::local(&workspace.plugin_dir)
        .build("hyprfoo", &workspace.context)
        .expect_err("build fails");
    match err {
        PluginError::BuildFailed { status, output, .. } => {
            assert_eq!(status, 2);
            assert!(output.contains("compiler exploded"));
        }
        other => panic!("expected BuildFailed, got {other}"),
    }
}

#[rstest]
fn build_sees_pkg_config_override(workspace: Workspace) {
    write_manifest(&workspace.plugin_dir, "hyprfoo.bin", "printf \\\"$PKG_CONFIG_PATH\\\" > hyprfoo.bin");
    PluginSource::local(&workspace.plugin_dir)
        .install("hyprfoo", &workspace.context)
        .expect("install");
    let recorded = fs::read_to_string(workspace.paths.binary_path("hyprfoo")).expect("artifact");
    assert_eq!(PathBuf::from(recorded), workspace.paths.pkg_config_dir());
}

#[rstest]
fn missing_local_directory_is_unavailable(workspace: Workspace) {
    let source = PluginSource::local(workspace.plugin_dir.join("absent"));
    assert!(!source.is_source_available());
    let err = source
        .install("hyprfoo", &workspace.context)
        .expect_err("missing source");
    assert!(matches!(err, PluginError::SourceUnavailable { .. }));
}

#[rstest]
fn local_source_is_never_up_to_date(workspace: Workspace) {
    let source = PluginSource::local(&workspace.plugin_dir);
    assert!(source.install_source().is_ok());
    assert!(!source.is_up_to_date());
}

#[rstest]
fn provides_plugin_consults_manifest(workspace: Workspace) {
    write_manifest(&workspace.plugin_dir, "hyprfoo.bin", "true");
    let source = PluginSource::local(&workspace.plugin_dir);
    assert!(source.provides_plugin("hyprfoo"));
    assert!(!source.provides_plugin("hyprbar"));
    assert!(!PluginSource::self_source(&workspace.paths).provides_plugin("hyprload"));
}

#[test]
fn checkout_state_tracks_refresh() {
    let source = PluginSource::local("/p/a");
    assert!(!source.lock_checkout().is_refreshed());
    source.lock_checkout().mark_refreshed();
    assert!(source.lock_checkout().is_refreshed());
}

// ---------------------------------------------------------------------------
// Git sources
// ---------------------------------------------------------------------------

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=hyprload", "-c", "user.email=hyprload@example.invalid"])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}

/// Turns the workspace plugin directory into an upstream repository with one
/// commit whose build writes `v1`.
fn init_upstream(workspace: &Workspace) -> String {
    let dir = &workspace.plugin_dir;
    write_manifest(dir, "hyprfoo.bin", "printf v1 > hyprfoo.bin");
    git(dir, &["init", "-q"]);
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", "initial"]);
    git(dir, &["rev-parse", "HEAD"])
}

fn commit_upstream(workspace: &Workspace, content: &str) -> String {
    let dir = &workspace.plugin_dir;
    write_manifest(dir, "hyprfoo.bin", &format!("printf {content} > hyprfoo.bin"));
    git(dir, &["commit", "-q", "-am", content]);
    git(dir, &["rev-parse", "HEAD"])
}

/// A git source whose clone path holds a clone of the local upstream.
fn cloned_source(workspace: &Workspace, rev: Option<&str>) -> PluginSource {
    let source = PluginSource::git(
        "acme/hyprfoo",
        None,
        rev.map(str::to_owned),
        &workspace.paths,
    );
    let target = source.source_dir().to_path_buf();
    let upstream = workspace.plugin_dir.display().to_string();
    let target_arg = target.display().to_string();
    git(&workspace.plugin_dir, &["clone", "-q", upstream.as_str(), target_arg.as_str()]);
    if let Some(rev) = rev {
        git(&target, &["checkout", "-q", rev]);
    }
    source
}

#[rstest]
fn fresh_clone_is_up_to_date(workspace: Workspace) {
    init_upstream(&workspace);
    let source = cloned_source(&workspace, None);

    assert!(source.is_source_available());
    assert!(source.is_up_to_date());
}

#[rstest]
fn upstream_commit_makes_clone_stale(workspace: Workspace) {
    init_upstream(&workspace);
    let source = cloned_source(&workspace, None);

    commit_upstream(&workspace, "v2");

    assert!(!source.is_up_to_date());
}

#[rstest]
fn clone_at_pinned_rev_is_up_to_date(workspace: Workspace) {
    let first = init_upstream(&workspace);
    let pinned = cloned_source(&workspace, Some(first.as_str()));
    assert!(pinned.is_up_to_date());

    let second = commit_upstream(&workspace, "v2");
    let elsewhere = PluginSource::git("acme/hyprfoo", None, Some(second), &workspace.paths);
    let target = elsewhere.source_dir().to_path_buf();
    let upstream = workspace.plugin_dir.display().to_string();
    let target_arg = target.display().to_string();
    git(&workspace.plugin_dir, &["clone", "-q", upstream.as_str(), target_arg.as_str()]);
    git(&target, &["checkout", "-q", first.as_str()]);
    assert!(!elsewhere.is_up_to_date());
}

#[rstest]
fn unreachable_remote_is_not_up_to_date(workspace: Workspace) {
    init_upstream(&workspace);
    let source = cloned_source(&workspace, None);
    let missing = workspace.plugin_dir.join("gone").display().to_string();
    git(source.source_dir(), &["remote", "set-url", "origin", missing.as_str()]);

    assert!(!source.is_up_to_date());
}

#[rstest]
fn missing_clone_is_not_up_to_date(workspace: Workspace) {
    let source = PluginSource::git("acme/hyprfoo", None, None, &workspace.paths);
    assert!(!source.is_source_available());
    assert!(!source.is_up_to_date());
}

#[rstest]
fn update_pulls_and_reinstalls(workspace: Workspace) {
    init_upstream(&workspace);
    let source = cloned_source(&workspace, None);
    commit_upstream(&workspace, "v2");

    source.update("hyprfoo", &workspace.context).expect("update");

    assert!(source.is_up_to_date());
    let installed = workspace.paths.binary_path("hyprfoo");
    assert_eq!(fs::read_to_string(installed).expect("artifact"), "v2");
}

#[rstest]
fn pinned_update_checks_out_the_revision(workspace: Workspace) {
    let first = init_upstream(&workspace);
    commit_upstream(&workspace, "v2");
    let pinned = PluginSource::git("acme/hyprfoo", None, Some(first.clone()), &workspace.paths);
    let upstream = workspace.plugin_dir.display().to_string();
    let target_arg = pinned.source_dir().display().to_string();
    git(&workspace.plugin_dir, &["clone", "-q", upstream.as_str(), target_arg.as_str()]);
    assert!(!pinned.is_up_to_date());

    pinned.update("hyprfoo", &workspace.context).expect("update");

    assert_eq!(git(pinned.source_dir(), &["rev-parse", "HEAD"]), first);
    assert!(pinned.is_up_to_date());
    let installed = workspace.paths.binary_path("hyprfoo");
    assert_eq!(fs::read_to_string(installed).expect("artifact"), "v1");
}

#[rstest]
fn failed_pull_is_a_stale_source(workspace: Workspace) {
    init_upstream(&workspace);
    let source = cloned_source(&workspace, None);
    let missing = workspace.plugin_dir.join("gone").display().to_string();
    git(source.source_dir(), &["remote", "set-url", "origin", missing.as_str()]);

    let err = source
        .update("hyprfoo", &workspace.context)
        .expect_err("pull cannot reach the remote");

    assert!(matches!(err, PluginError::StaleSource { .. }), "got {err}");
}
