//! Show action - metadata of the newest installed version of a package.

use anyhow::{Context, Result};

use crate::registry::{InstalledPackage, Registry};
use crate::runtime::Runtime;

/// Look up the newest installed version of `name`.
#[tracing::instrument(skip(runtime, registry))]
pub fn show<R: Runtime>(
    runtime: &R,
    registry: &Registry,
    name: &str,
) -> Result<InstalledPackage> {
    let snapshot = registry.snapshot(runtime)?;
    snapshot
        .newest(name)
        .cloned()
        .with_context(|| format!("Package {name} is not installed"))
}
