//! Remove action - delete an installed package's entry.

use anyhow::{Result, bail};
use log::info;

use crate::registry::Registry;
use crate::runtime::Runtime;
use crate::version::DebVersion;

/// Uninstall `name`. With a version, exactly that entry is removed;
/// otherwise the newest installed version.
#[tracing::instrument(skip(runtime, registry))]
pub fn remove<R: Runtime>(
    runtime: &R,
    registry: &Registry,
    name: &str,
    version: Option<&str>,
) -> Result<()> {
    let snapshot = registry.snapshot(runtime)?;

    let package = match version {
        Some(version) => {
            let wanted = DebVersion::parse(version)?;
            snapshot
                .find_by_name(name, true)
                .into_iter()
                .find(|p| p.version == wanted)
        }
        None => snapshot.newest(name),
    };
    let Some(package) = package else {
        match version {
            Some(version) => bail!("Package {name} {version} is not installed"),
            None => bail!("Package {name} is not installed"),
        }
    };

    registry.remove(runtime, package)?;
    info!("removed {} {}", package.name(), package.version);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::manifest_json;
    use mockall::predicate::eq;

    fn registry_with_versions(runtime: &mut MockRuntime) -> Registry {
        let registry = Registry::new("/srv/cell");
        let packages_dir = registry.packages_dir().to_path_buf();

        runtime
            .expect_exists()
            .with(eq(packages_dir.clone()))
            .returning(|_| true);
        runtime
            .expect_read_dir()
            .with(eq(packages_dir.clone()))
            .returning(|p| Ok(vec![p.join("hello***1.0"), p.join("hello***2.0")]));

        for (entry_name, version) in [("hello***1.0", "1.0"), ("hello***2.0", "2.0")] {
            let entry = packages_dir.join(entry_name);
            runtime
                .expect_is_dir()
                .with(eq(entry.clone()))
                .returning(|_| true);
            runtime
                .expect_exists()
                .with(eq(entry.join("pkg-info.json")))
                .returning(|_| true);
            let json = manifest_json("hello", version, "");
            runtime
                .expect_read_to_string()
                .with(eq(entry.join("pkg-info.json")))
                .returning(move |_| Ok(json.clone()));
            runtime
                .expect_is_dir()
                .with(eq(entry.join("root")))
                .returning(|_| true);
        }

        registry
    }

    #[test]
    fn test_remove_defaults_to_newest() {
        let mut runtime = MockRuntime::new();
        let registry = registry_with_versions(&mut runtime);

        runtime
            .expect_remove_dir_all()
            .with(eq(registry.entry_dir("hello", "2.0")))
            .times(1)
            .returning(|_| Ok(()));

        remove(&runtime, &registry, "hello", None).unwrap();
    }

    #[test]
    fn test_remove_specific_version() {
        let mut runtime = MockRuntime::new();
        let registry = registry_with_versions(&mut runtime);

        runtime
            .expect_remove_dir_all()
            .with(eq(registry.entry_dir("hello", "1.0")))
            .times(1)
            .returning(|_| Ok(()));

        remove(&runtime, &registry, "hello", Some("1.0")).unwrap();
    }

    #[test]
    fn test_remove_missing_version_fails() {
        let mut runtime = MockRuntime::new();
        let registry = registry_with_versions(&mut runtime);

        let err = remove(&runtime, &registry, "hello", Some("9.9")).unwrap_err();
        assert!(err.to_string().contains("not installed"));
    }

    #[test]
    fn test_remove_missing_package_fails() {
        let mut runtime = MockRuntime::new();
        let registry = registry_with_versions(&mut runtime);

        let err = remove(&runtime, &registry, "absent", None).unwrap_err();
        assert!(err.to_string().contains("not installed"));
    }
}
