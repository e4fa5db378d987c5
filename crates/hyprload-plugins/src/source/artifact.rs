//! Build and artifact installation shared by git and local sources.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tempfile::Builder;
use tracing::{debug, info};

use super::{BuildContext, PKG_CONFIG_ENV};
use crate::error::PluginError;
use crate::manifest::{PluginManifest, find_plugin_manifest};
use crate::process::run_shell;

/// Tracing target for build operations.
const BUILD_TARGET: &str = "hyprload_plugins::build";

pub(super) fn provides(source_dir: &Path, name: &str) -> bool {
    find_plugin_manifest(source_dir, name).is_ok()
}

/// Reads the manifest for `name` once, builds, and installs the artifact.
pub(super) fn build_and_install(
    source_dir: &Path,
    name: &str,
    context: &BuildContext,
) -> Result<(), PluginError> {
    let manifest = find_plugin_manifest(source_dir, name)?;
    build(source_dir, &manifest, context)?;
    install_artifact(source_dir, &manifest, context)
}

/// Runs the manifest steps as one `&&`-chained script.
pub(super) fn build(
    source_dir: &Path,
    manifest: &PluginManifest,
    context: &BuildContext,
) -> Result<(), PluginError> {
    let name = manifest.name();
    let script = manifest.steps().join(" && ");
    let pkg_config = context.pkg_config_dir();

    debug!(
        target: BUILD_TARGET,
        plugin = name,
        source = %source_dir.display(),
        steps = manifest.steps().len(),
        "building plugin"
    );

    let output = run_shell(&script, source_dir, &[(PKG_CONFIG_ENV, pkg_config.as_os_str())])?;
    if !output.success() {
        return Err(PluginError::BuildFailed {
            name: name.to_owned(),
            status: output.status(),
            output: output.combined(),
        });
    }
    Ok(())
}

/// Copies the built artifact into the shared binaries directory.
///
/// The copy lands in a temporary file beside the target and is renamed into
/// place, so readers never observe a partially written binary and an existing
/// artifact is replaced atomically.
fn install_artifact(
    source_dir: &Path,
    manifest: &PluginManifest,
    context: &BuildContext,
) -> Result<(), PluginError> {
    let name = manifest.name();
    let built = source_dir.join(manifest.output());
    if !built.is_file() {
        return Err(PluginError::ArtifactMissing {
            name: name.to_owned(),
            path: built,
        });
    }

    let paths = context.paths();
    let binaries = paths.binaries_dir();
    fs::create_dir_all(binaries).map_err(|source| PluginError::io(binaries, source))?;
    let target = paths.binary_path(name);

    let mut staged = Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".partial")
        .tempfile_in(binaries)
        .map_err(|source| PluginError::io(binaries, source))?;
    let mut input = File::open(&built).map_err(|source| PluginError::io(&built, source))?;
    io::copy(&mut input, staged.as_file_mut()).map_err(|source| PluginError::io(&built, source))?;
    let permissions = input
        .metadata()
        .map_err(|source| PluginError::io(&built, source))?
        .permissions();
    staged
        .as_file()
        .set_permissions(permissions)
        .map_err(|source| PluginError::io(staged.path(), source))?;
    staged
        .as_file()
        .sync_all()
        .map_err(|source| PluginError::io(staged.path(), source))?;
    staged
        .persist(&target)
        .map_err(|error| PluginError::io(&target, error.error))?;

    info!(
        target: BUILD_TARGET,
        plugin = name,
        artifact = %target.display(),
        "installed plugin artifact"
    );
    Ok(())
}
