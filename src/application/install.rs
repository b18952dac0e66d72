//! Install action - extract an archive into its own registry entry.
//!
//! The flow is: read control metadata, stage the file tree and manifest
//! under the registry, then commit with a rename. The per-entry lock and the
//! staged-then-rename commit mean a concurrent registry snapshot never sees
//! a half-populated package directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::deb::{DebExtractor, control};
use crate::fetch::{self, DependencyFetcher};
use crate::registry::{MANIFEST_FILE, Manifest, ROOT_DIR, Registry};
use crate::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Fetch and install missing dependencies after the package itself.
    pub fetch_dependencies: bool,
    /// Where fetched archives are downloaded; defaults to the user cache
    /// directory.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            fetch_dependencies: true,
            scratch_dir: None,
        }
    }
}

/// Install a `.deb` archive into the registry, optionally fetching its
/// dependencies afterwards.
#[tracing::instrument(skip(runtime, registry, extractor, fetcher, options))]
pub fn install<R, E, F>(
    runtime: &R,
    registry: &Registry,
    extractor: &E,
    fetcher: &F,
    archive: &Path,
    options: &InstallOptions,
) -> Result<()>
where
    R: Runtime,
    E: DebExtractor,
    F: DependencyFetcher,
{
    if !archive
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("deb"))
    {
        bail!("{} does not look like a .deb archive", archive.display());
    }
    if registry.system_root() == Path::new("/") && !runtime.is_privileged() {
        warn!("installing into / usually requires elevated privileges");
    }

    let manifest = read_manifest(extractor, archive)?;
    install_archive(runtime, registry, extractor, archive, &manifest)?;

    if options.fetch_dependencies && !manifest.dependencies.is_empty() {
        fetch_and_install_dependencies(runtime, registry, extractor, fetcher, &manifest, options)?;
    }

    Ok(())
}

/// Read and validate the archive's metadata without touching the registry.
fn read_manifest<E: DebExtractor>(extractor: &E, archive: &Path) -> Result<Manifest> {
    let control_text = extractor
        .control(archive)
        .with_context(|| format!("Failed to read control data from {}", archive.display()))?;
    let fields = control::parse(&control_text)?;
    let manifest = Manifest::from_control(&fields)?;
    Ok(manifest)
}

fn install_archive<R, E>(
    runtime: &R,
    registry: &Registry,
    extractor: &E,
    archive: &Path,
    manifest: &Manifest,
) -> Result<()>
where
    R: Runtime,
    E: DebExtractor,
{
    let _lock = registry.lock_entry(runtime, &manifest.name, &manifest.version)?;

    let staging = registry.begin_staging(runtime, &manifest.name, &manifest.version)?;
    let staged_root = staging.join(ROOT_DIR);
    extractor.unpack(archive, &staged_root)?;
    create_merge_links(runtime, &staged_root)?;
    manifest.store(runtime, &staging.join(MANIFEST_FILE))?;

    let entry_dir = registry.commit(runtime, &staging, &manifest.name, &manifest.version)?;
    info!(
        "installed {} {} into {}",
        manifest.name,
        manifest.version,
        entry_dir.display()
    );
    Ok(())
}

/// usr-merge compatibility links, so binaries see the same paths inside
/// every cell regardless of how the package was built.
fn create_merge_links<R: Runtime>(runtime: &R, root: &Path) -> Result<()> {
    for (target, link) in [
        ("usr/bin", "bin"),
        ("usr/sbin", "sbin"),
        ("usr/lib", "lib"),
        ("usr/lib64", "lib64"),
    ] {
        let link_path = root.join(link);
        if runtime.exists(&link_path) || runtime.is_symlink(&link_path) {
            continue;
        }
        runtime.create_dir_all(&root.join(target))?;
        runtime.symlink(Path::new(target), &link_path)?;
    }
    Ok(())
}

/// Fetch the raw dependency expression through apt and install every archive
/// it produced. A single failing archive is skipped with a warning, matching
/// apt's own tolerance; resolution against the updated registry decides
/// later whether anything is still missing.
fn fetch_and_install_dependencies<R, E, F>(
    runtime: &R,
    registry: &Registry,
    extractor: &E,
    fetcher: &F,
    manifest: &Manifest,
    options: &InstallOptions,
) -> Result<()>
where
    R: Runtime,
    E: DebExtractor,
    F: DependencyFetcher,
{
    let scratch = match &options.scratch_dir {
        Some(dir) => dir.clone(),
        None => fetch::default_scratch_dir(runtime)
            .context("No cache directory available for fetched archives")?,
    };

    let archives = fetcher.fetch(&manifest.dependencies, &scratch)?;
    info!(
        "installing {} fetched dependency archive(s)",
        archives.len()
    );
    for archive in archives {
        let result = read_manifest(extractor, &archive).and_then(|dep_manifest| {
            install_archive(runtime, registry, extractor, &archive, &dep_manifest)
        });
        if let Err(e) = result {
            warn!("skipping {}: {e:#}", archive.display());
        }
    }
    Ok(())
}
