//! List action - retrieves installed package information.

use anyhow::Result;

use crate::registry::Registry;
use crate::runtime::Runtime;

/// Name and version of one installed package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
}

/// List all installed packages. Corrupt entries have already been skipped
/// (and warned about) by the registry scan.
#[tracing::instrument(skip(runtime, registry))]
pub fn list_packages<R: Runtime>(runtime: &R, registry: &Registry) -> Result<Vec<PackageInfo>> {
    let snapshot = registry.snapshot(runtime)?;
    Ok(snapshot
        .iter()
        .map(|package| PackageInfo {
            name: package.name().to_string(),
            version: package.version.to_string(),
        })
        .collect())
}
