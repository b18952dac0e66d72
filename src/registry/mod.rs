//! On-disk registry of installed packages.
//!
//! Each installed package occupies `<system-root>/packages/<name>***<version>/`
//! with the package's file tree under `root/` and its metadata in
//! `pkg-info.json`. The `***` delimiter is reserved: names and versions are
//! validated against it at dependency-parse and install time.
//!
//! Reads are snapshot-based: [`Registry::snapshot`] scans the directory once
//! and every lookup during a resolution operates on that snapshot, so no
//! entry can appear or disappear mid-resolution.

mod manifest;

pub use manifest::{Manifest, PackageSource};

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::runtime::{Runtime, is_path_under};
use crate::version::DebVersion;

/// Separator between name and version in entry directory names. Reserved:
/// never valid inside a package name or version.
pub const DELIMITER: &str = "***";

/// Name of the manifest file inside an entry directory.
pub const MANIFEST_FILE: &str = "pkg-info.json";

/// Name of the file-tree directory inside an entry directory.
pub const ROOT_DIR: &str = "root";

const PACKAGES_DIR: &str = "packages";
const STAGING_PREFIX: &str = ".staging-";
const LOCK_PREFIX: &str = ".lock-";

/// One installed package: its manifest plus the location of its private
/// file tree. Immutable once created; identity is `(name, version,
/// entry directory)`.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub manifest: Manifest,
    pub version: DebVersion,
    entry_dir: PathBuf,
}

impl InstalledPackage {
    pub fn new(manifest: Manifest, version: DebVersion, entry_dir: PathBuf) -> Self {
        InstalledPackage {
            manifest,
            version,
            entry_dir,
        }
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn entry_dir(&self) -> &Path {
        &self.entry_dir
    }

    /// The package's private file tree.
    pub fn root_path(&self) -> PathBuf {
        self.entry_dir.join(ROOT_DIR)
    }
}

impl PartialEq for InstalledPackage {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
            && self.version == other.version
            && self.entry_dir == other.entry_dir
    }
}

/// One consistent listing of the registry, used for all lookups during a
/// resolution.
#[derive(Debug, Default)]
pub struct Snapshot {
    packages: Vec<InstalledPackage>,
}

impl Snapshot {
    pub fn new(packages: Vec<InstalledPackage>) -> Self {
        Snapshot { packages }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InstalledPackage> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All entries matching `name`: exact match, or substring match when
    /// `exact` is false.
    pub fn find_by_name(&self, name: &str, exact: bool) -> Vec<&InstalledPackage> {
        self.packages
            .iter()
            .filter(|p| {
                if exact {
                    p.name() == name
                } else {
                    p.name().contains(name)
                }
            })
            .collect()
    }

    /// The exact-name entry with the greatest version, if any.
    pub fn newest(&self, name: &str) -> Option<&InstalledPackage> {
        self.find_by_name(name, true)
            .into_iter()
            .max_by(|a, b| a.version.compare(&b.version))
    }
}

/// Guard for the exclusive per-entry install lock. The lock file is removed
/// when the guard drops.
pub struct InstallLock<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<R: Runtime> std::fmt::Debug for InstallLock<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallLock")
            .field("path", &self.path)
            .finish()
    }
}

impl<R: Runtime> Drop for InstallLock<'_, R> {
    fn drop(&mut self) {
        if let Err(e) = self.runtime.remove_file(&self.path) {
            warn!("failed to remove install lock {:?}: {e}", self.path);
        }
    }
}

/// An explicit registry location. Passing this value around (rather than
/// consulting process-wide state) is what lets independent resolutions run
/// against different roots concurrently.
#[derive(Debug, Clone)]
pub struct Registry {
    system_root: PathBuf,
    packages_dir: PathBuf,
}

impl Registry {
    pub fn new(system_root: impl Into<PathBuf>) -> Self {
        let system_root = system_root.into();
        let packages_dir = system_root.join(PACKAGES_DIR);
        Registry {
            system_root,
            packages_dir,
        }
    }

    /// The system root every sandbox-visible path is expressed relative to.
    pub fn system_root(&self) -> &Path {
        &self.system_root
    }

    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    pub fn entry_dir(&self, name: &str, version: &str) -> PathBuf {
        self.packages_dir.join(format!("{name}{DELIMITER}{version}"))
    }

    /// Scan the registry once into a [`Snapshot`].
    ///
    /// Entries that cannot be interpreted — a directory name that does not
    /// split into name and version, an unparseable version, a missing or
    /// unreadable manifest, a manifest disagreeing with the directory name —
    /// are skipped with a `CorruptPackageEntry` warning; the scan continues.
    /// Hidden entries (staging directories, lock files) are ignored.
    #[tracing::instrument(skip(self, runtime))]
    pub fn snapshot<R: Runtime>(&self, runtime: &R) -> Result<Snapshot> {
        let mut packages = Vec::new();
        if !runtime.exists(&self.packages_dir) {
            return Ok(Snapshot::new(packages));
        }

        for entry in runtime.read_dir(&self.packages_dir)? {
            let Some(entry_name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if entry_name.starts_with('.') {
                continue;
            }
            match self.read_entry(runtime, &entry, entry_name) {
                Ok(package) => packages.push(package),
                Err(e) => warn!("skipping registry entry: {e}"),
            }
        }

        debug!("registry snapshot: {} package(s)", packages.len());
        Ok(Snapshot::new(packages))
    }

    fn read_entry<R: Runtime>(
        &self,
        runtime: &R,
        entry_dir: &Path,
        entry_name: &str,
    ) -> Result<InstalledPackage> {
        let corrupt = |reason: String| Error::CorruptPackageEntry {
            entry: entry_name.to_string(),
            reason,
        };

        if !runtime.is_dir(entry_dir) {
            return Err(corrupt("not a directory".into()));
        }

        let parts: Vec<&str> = entry_name.split(DELIMITER).collect();
        let [name, version] = parts.as_slice() else {
            return Err(corrupt(format!(
                "directory name does not split into name{DELIMITER}version"
            )));
        };
        let version =
            DebVersion::parse(version).map_err(|e| corrupt(format!("bad version: {e}")))?;

        let manifest = Manifest::load(runtime, &entry_dir.join(MANIFEST_FILE))
            .map_err(|e| corrupt(format!("bad manifest: {e}")))?;
        if manifest.name != *name {
            return Err(corrupt(format!(
                "manifest names {:?} but the directory names {name:?}",
                manifest.name
            )));
        }

        if !runtime.is_dir(&entry_dir.join(ROOT_DIR)) {
            return Err(corrupt(format!("no {ROOT_DIR}/ tree")));
        }

        Ok(InstalledPackage::new(
            manifest,
            version,
            entry_dir.to_path_buf(),
        ))
    }

    /// Take the exclusive install lock for `(name, version)`.
    ///
    /// The lock is an `O_EXCL` marker file next to the entries; it is
    /// released (removed) when the returned guard drops.
    pub fn lock_entry<'a, R: Runtime>(
        &self,
        runtime: &'a R,
        name: &str,
        version: &str,
    ) -> Result<InstallLock<'a, R>> {
        runtime.create_dir_all(&self.packages_dir)?;
        let path = self
            .packages_dir
            .join(format!("{LOCK_PREFIX}{name}{DELIMITER}{version}"));
        runtime.create_new(&path).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                Error::Io(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("an install of {name} {version} is already in progress"),
                ))
            } else {
                Error::Io(e)
            }
        })?;
        Ok(InstallLock { runtime, path })
    }

    /// Create a fresh staging directory for `(name, version)`, clearing any
    /// leftover from a crashed install.
    pub fn begin_staging<R: Runtime>(
        &self,
        runtime: &R,
        name: &str,
        version: &str,
    ) -> Result<PathBuf> {
        let staging = self
            .packages_dir
            .join(format!("{STAGING_PREFIX}{name}{DELIMITER}{version}"));
        if runtime.exists(&staging) {
            debug!("clearing stale staging directory {staging:?}");
            runtime.remove_dir_all(&staging)?;
        }
        runtime.create_dir_all(&staging)?;
        Ok(staging)
    }

    /// Atomically move a fully-populated staging directory into place.
    ///
    /// An existing entry for the same `(name, version)` is removed first, so
    /// a reinstall replaces it; the rename itself is the commit point — a
    /// concurrent snapshot sees either no entry or a complete one, never a
    /// half-populated tree.
    pub fn commit<R: Runtime>(
        &self,
        runtime: &R,
        staging: &Path,
        name: &str,
        version: &str,
    ) -> Result<PathBuf> {
        let entry_dir = self.entry_dir(name, version);
        if runtime.exists(&entry_dir) {
            debug!("replacing existing entry {entry_dir:?}");
            runtime.remove_dir_all(&entry_dir)?;
        }
        runtime.rename(staging, &entry_dir)?;
        Ok(entry_dir)
    }

    /// Remove an installed package's entry directory.
    pub fn remove<R: Runtime>(&self, runtime: &R, package: &InstalledPackage) -> Result<()> {
        let entry_dir = package.entry_dir();
        // Never delete outside the packages directory.
        if !is_path_under(entry_dir, &self.packages_dir) {
            return Err(Error::PathComputation {
                path: entry_dir.to_path_buf(),
                prefix: self.packages_dir.clone(),
            });
        }
        runtime.remove_dir_all(entry_dir)?;
        Ok(())
    }
}
