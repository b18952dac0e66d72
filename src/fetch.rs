//! Dependency archive fetching.
//!
//! The resolver never downloads anything; when an install wants missing
//! dependencies fetched, this wrapper asks `apt-get` to satisfy the raw
//! dependency expression into a scratch directory and reports the archives
//! it produced. Callers install those and then re-enter resolution against
//! the updated registry.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use log::debug;

use crate::runtime::Runtime;

/// Downloads archives satisfying a dependency expression.
#[cfg_attr(test, mockall::automock)]
pub trait DependencyFetcher: Send + Sync {
    /// Download satisfying archives into `scratch` and return their paths.
    fn fetch(&self, dependencies: &str, scratch: &Path) -> Result<Vec<PathBuf>>;
}

/// The real fetcher, backed by `apt-get satisfy --download-only`.
pub struct AptFetcher;

impl DependencyFetcher for AptFetcher {
    #[tracing::instrument(skip(self, dependencies, scratch))]
    fn fetch(&self, dependencies: &str, scratch: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(scratch)
            .with_context(|| format!("Failed to create scratch directory {scratch:?}"))?;

        let status = Command::new("apt-get")
            .args(["satisfy", "--download-only", "-y", "-o"])
            .arg(format!("Dir::Cache::Archives={}", scratch.display()))
            .arg(dependencies)
            .status()
            .context("Failed to run apt-get (is it installed?)")?;
        if !status.success() {
            bail!("apt-get satisfy failed for {dependencies:?}");
        }

        let mut archives: Vec<PathBuf> = std::fs::read_dir(scratch)
            .with_context(|| format!("Failed to list scratch directory {scratch:?}"))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "deb"))
            .collect();
        archives.sort();
        debug!("fetched {} archive(s) for {dependencies:?}", archives.len());
        Ok(archives)
    }
}

/// Default scratch directory for fetched archives.
pub fn default_scratch_dir<R: Runtime>(runtime: &R) -> Option<PathBuf> {
    runtime.cache_dir().map(|dir| dir.join("debcell/archives"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_default_scratch_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_cache_dir()
            .returning(|| Some(PathBuf::from("/home/user/.cache")));

        assert_eq!(
            default_scratch_dir(&runtime),
            Some(PathBuf::from("/home/user/.cache/debcell/archives"))
        );
    }

    #[test]
    fn test_default_scratch_dir_without_cache_dir() {
        let mut runtime = MockRuntime::new();
        runtime.expect_cache_dir().returning(|| None);

        assert_eq!(default_scratch_dir(&runtime), None);
    }
}
