//! Namespace composition: merging resolved package trees into a sandbox
//! launch plan.
//!
//! Two strategies produce the plan. Overlay mode stacks every package root
//! as a read-only overlay layer and needs no per-file inspection; it is the
//! preferred path. Symlink-merge mode walks every package tree and decides,
//! per path, whether the sandbox gets a real directory (shared between
//! packages) or a symlink into exactly one package's tree.
//!
//! Directives are plain structured values, never shell strings; the sandbox
//! launcher decides how to realize them.

mod walk;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::registry::{InstalledPackage, Registry};
use crate::resolver::ResolvedSet;
use crate::runtime::Runtime;

use walk::{PathEntry, walk_tree};

/// How the merged filesystem view is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    /// Stack package roots as overlay layers. Preferred.
    Overlay,
    /// Merge trees with per-path symlinks and shared directories. Legacy;
    /// kept because it encodes the per-path conflict policy.
    SymlinkMerge,
}

/// One sandbox setup instruction.
///
/// `Bind` and `OverlaySource` carry host paths; `Symlink` and `Mkdir` paths
/// are as seen inside the sandbox. `OverlaySource` directives are ordered
/// lowest layer first.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Bind { source: PathBuf, target: PathBuf },
    OverlaySource { source: PathBuf },
    TmpOverlay { target: PathBuf },
    /// Create `link` pointing at `target`.
    Symlink { target: PathBuf, link: PathBuf },
    Mkdir { path: PathBuf },
    Command { argv: Vec<String> },
}

/// Builds the directive sequence for one resolved set.
pub struct Composer<'a, R: Runtime> {
    runtime: &'a R,
    registry: &'a Registry,
}

impl<'a, R: Runtime> Composer<'a, R> {
    pub fn new(runtime: &'a R, registry: &'a Registry) -> Self {
        Composer { runtime, registry }
    }

    /// Produce the ordered directive sequence for `resolved`, finishing with
    /// the caller-supplied command.
    #[tracing::instrument(skip(self, resolved, command))]
    pub fn compose(
        &self,
        resolved: &ResolvedSet,
        mode: ComposeMode,
        command: &[String],
    ) -> Result<Vec<Directive>> {
        let mut directives = match mode {
            ComposeMode::Overlay => self.compose_overlay(resolved),
            ComposeMode::SymlinkMerge => self.compose_symlink_merge(resolved)?,
        };
        directives.push(Directive::Command {
            argv: command.to_vec(),
        });
        Ok(directives)
    }

    /// One overlay layer per package in resolution order (base first, so its
    /// files are visible but overridable), then a writable top layer over
    /// the merged mount point.
    fn compose_overlay(&self, resolved: &ResolvedSet) -> Vec<Directive> {
        let mut directives: Vec<Directive> = resolved
            .iter()
            .map(|package| Directive::OverlaySource {
                source: package.root_path(),
            })
            .collect();
        directives.push(Directive::TmpOverlay {
            target: PathBuf::from("/"),
        });
        directives
    }

    /// The per-path merge. The base package is bound directly at `/` and the
    /// packages directory is bound at its sandbox-visible path so that the
    /// emitted symlinks resolve; every other package's tree is walked.
    fn compose_symlink_merge(&self, resolved: &ResolvedSet) -> Result<Vec<Directive>> {
        let base = resolved.base().ok_or_else(|| Error::UnresolvedDependency {
            term: "base package".to_string(),
        })?;
        let others: Vec<&InstalledPackage> = resolved.iter().skip(1).collect();

        let mut directives = vec![
            Directive::Bind {
                source: base.root_path(),
                target: PathBuf::from("/"),
            },
            Directive::Bind {
                source: self.registry.packages_dir().to_path_buf(),
                target: self.sandbox_path(self.registry.packages_dir())?,
            },
        ];

        let mut walks: Vec<Vec<PathEntry>> = Vec::with_capacity(others.len());
        for package in &others {
            walks.push(walk_tree(self.runtime, &package.root_path())?);
        }

        // Occurrence counts: how many distinct packages contain an entry at
        // each relative path, directories and files counted separately.
        // Each walk lists a path at most once, so counting entries counts
        // packages.
        let mut dir_occurrences: HashMap<&Path, usize> = HashMap::new();
        let mut file_occurrences: HashMap<&Path, usize> = HashMap::new();
        for entries in &walks {
            for entry in entries {
                let counts = if entry.is_dir {
                    &mut dir_occurrences
                } else {
                    &mut file_occurrences
                };
                *counts.entry(entry.rel.as_path()).or_insert(0) += 1;
            }
        }

        // Directory pass. A symlinked directory exposes everything below it,
        // so descendants of a covered path are skipped. Shared directories
        // stay real so several packages' deeper entries can coexist.
        let mut covered: Vec<PathBuf> = Vec::new();
        let mut shared_dirs: HashSet<&Path> = HashSet::new();
        for (package, entries) in others.iter().zip(&walks) {
            for entry in entries.iter().filter(|e| e.is_dir) {
                let location = sandbox_location(&entry.rel);
                if covered.iter().any(|c| location.starts_with(c)) {
                    continue;
                }
                match dir_occurrences[entry.rel.as_path()] {
                    1 => {
                        directives.push(Directive::Symlink {
                            target: self.sandbox_path(&package.root_path().join(&entry.rel))?,
                            link: location.clone(),
                        });
                        covered.push(location);
                    }
                    _ => {
                        if shared_dirs.insert(entry.rel.as_path()) {
                            directives.push(Directive::Mkdir { path: location });
                        }
                    }
                }
            }
        }

        // File pass. Under a shared directory each file links to its owning
        // package; when several packages claim the same file path the first
        // in resolution order wins.
        let mut claimed_files: HashSet<PathBuf> = HashSet::new();
        for (package, entries) in others.iter().zip(&walks) {
            for entry in entries.iter().filter(|e| !e.is_dir) {
                let location = sandbox_location(&entry.rel);
                if covered.iter().any(|c| location.starts_with(c)) {
                    continue;
                }
                if !claimed_files.insert(location.clone()) {
                    debug!(
                        "{} also provides {}, keeping the earlier package's file",
                        package.name(),
                        location.display()
                    );
                    continue;
                }
                directives.push(Directive::Symlink {
                    target: self.sandbox_path(&package.root_path().join(&entry.rel))?,
                    link: location,
                });
            }
        }

        Ok(directives)
    }

    /// Translate a host path into the path it occupies inside the sandbox,
    /// where the system root is mounted at `/`. A host path the system root
    /// does not prefix is a composer invariant violation.
    fn sandbox_path(&self, host: &Path) -> Result<PathBuf> {
        let relative = host
            .strip_prefix(self.registry.system_root())
            .map_err(|_| Error::PathComputation {
                path: host.to_path_buf(),
                prefix: self.registry.system_root().to_path_buf(),
            })?;
        Ok(Path::new("/").join(relative))
    }
}

fn sandbox_location(rel: &Path) -> PathBuf {
    Path::new("/").join(rel)
}
