//! Package manifest: the metadata persisted next to each installed tree.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::deb::control::ControlFields;
use crate::dependency::DependencyExpression;
use crate::error::{Error, Result};
use crate::registry::DELIMITER;
use crate::runtime::Runtime;
use crate::version::DebVersion;

/// Where a package's archive came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageSource {
    #[default]
    Deb,
    Other,
}

/// Metadata for one installed package, stored as `pkg-info.json` in the
/// package's entry directory. Created once at install time and immutable
/// thereafter.
///
/// `version` and `dependencies` are kept as the verbatim strings they were
/// parsed from, so a load/store round-trip is byte-identical.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub maintainer: String,
    pub description: String,
    #[serde(default)]
    pub dependencies: String,
    #[serde(default)]
    pub source: PackageSource,
}

impl Manifest {
    /// Build a manifest from parsed Debian control fields.
    ///
    /// Package, Version, Architecture, Maintainer and Description are
    /// required; a missing Depends field becomes the empty dependency
    /// string. The name and version must not contain the reserved registry
    /// delimiter, and the version must parse.
    pub fn from_control(fields: &ControlFields) -> Result<Self> {
        let manifest = Manifest {
            name: fields.require("Package")?.to_string(),
            version: fields.require("Version")?.to_string(),
            architecture: fields.require("Architecture")?.to_string(),
            maintainer: fields.require("Maintainer")?.to_string(),
            description: fields.require("Description")?.to_string(),
            dependencies: fields.get("Depends").unwrap_or_default().to_string(),
            source: PackageSource::Deb,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check the delimiter reservation and version syntax. Run at install
    /// time so nothing unparseable ever lands in the registry.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_archive("empty package name"));
        }
        if self.name.contains(DELIMITER) {
            return Err(Error::invalid_archive(format!(
                "package name {:?} contains the reserved delimiter {DELIMITER:?}",
                self.name
            )));
        }
        if self.version.contains(DELIMITER) {
            return Err(Error::invalid_archive(format!(
                "version {:?} contains the reserved delimiter {DELIMITER:?}",
                self.version
            )));
        }
        DebVersion::parse(&self.version)?;
        Ok(())
    }

    /// Parse the raw dependency string.
    pub fn dependency_expression(&self) -> Result<DependencyExpression> {
        DependencyExpression::parse(&self.dependencies)
    }

    /// Load a manifest from `path`. An absent file is `MissingManifest`;
    /// unparseable content is `CorruptPackageEntry`.
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            return Err(Error::MissingManifest {
                path: path.to_path_buf(),
            });
        }
        let content = runtime.read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::CorruptPackageEntry {
            entry: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the manifest to `path`.
    #[tracing::instrument(skip(self, runtime, path))]
    pub fn store<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| Error::CorruptPackageEntry {
            entry: path.display().to_string(),
            reason: e.to_string(),
        })?;
        runtime.write(path, content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deb::control;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn manifest() -> Manifest {
        Manifest {
            name: "hello".into(),
            version: "2.10-3".into(),
            architecture: "amd64".into(),
            maintainer: "Example Maintainer <maint@example.org>".into(),
            description: "example package".into(),
            dependencies: "libc6 (>= 2.34), libgmp10 | libgmp9".into(),
            source: PackageSource::Deb,
        }
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let mut runtime = MockRuntime::new();
        let original = manifest();

        let written: Arc<Mutex<Vec<u8>>> = Arc::default();
        let sink = Arc::clone(&written);
        runtime.expect_write().returning(move |_, contents| {
            *sink.lock().unwrap() = contents.to_vec();
            Ok(())
        });

        let path = PathBuf::from("/reg/packages/hello***2.10-3/pkg-info.json");
        original.store(&runtime, &path).unwrap();

        let stored = String::from_utf8(written.lock().unwrap().clone()).unwrap();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(path.clone()))
            .returning(move |_| Ok(stored.clone()));

        let loaded = Manifest::load(&runtime, &path).unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.name, "hello");
        assert_eq!(loaded.version, "2.10-3");
        assert_eq!(loaded.dependencies, "libc6 (>= 2.34), libgmp10 | libgmp9");
    }

    #[test]
    fn test_load_missing_manifest() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let err = Manifest::load(&runtime, &PathBuf::from("/reg/x/pkg-info.json")).unwrap_err();
        assert!(matches!(err, Error::MissingManifest { .. }));
    }

    #[test]
    fn test_load_unparseable_manifest() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("not json".into()));

        let err = Manifest::load(&runtime, &PathBuf::from("/reg/x/pkg-info.json")).unwrap_err();
        assert!(matches!(err, Error::CorruptPackageEntry { .. }));
    }

    #[test]
    fn test_from_control() {
        let fields = control::parse(
            "Package: hello\n\
             Version: 2.10-3\n\
             Architecture: amd64\n\
             Maintainer: Example Maintainer <maint@example.org>\n\
             Description: example package\n\
             Depends: libc6 (>= 2.34)\n",
        )
        .unwrap();

        let manifest = Manifest::from_control(&fields).unwrap();
        assert_eq!(manifest.name, "hello");
        assert_eq!(manifest.version, "2.10-3");
        assert_eq!(manifest.dependencies, "libc6 (>= 2.34)");
        assert_eq!(manifest.source, PackageSource::Deb);
    }

    #[test]
    fn test_from_control_missing_depends_is_empty() {
        let fields = control::parse(
            "Package: tiny\n\
             Version: 1.0\n\
             Architecture: all\n\
             Maintainer: m\n\
             Description: d\n",
        )
        .unwrap();

        let manifest = Manifest::from_control(&fields).unwrap();
        assert_eq!(manifest.dependencies, "");
        assert!(manifest.dependency_expression().unwrap().is_empty());
    }

    #[test]
    fn test_from_control_missing_required_field() {
        let fields = control::parse("Package: tiny\nVersion: 1.0\n").unwrap();
        let err = Manifest::from_control(&fields).unwrap_err();
        assert!(matches!(err, Error::InvalidArchive { .. }));
    }

    #[test]
    fn test_validate_rejects_delimiter() {
        let mut bad = manifest();
        bad.name = "evil***name".into();
        assert!(bad.validate().is_err());

        let mut bad = manifest();
        bad.version = "1***0".into();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_version() {
        let mut bad = manifest();
        bad.version = "1.0 beta".into();
        assert!(matches!(
            bad.validate().unwrap_err(),
            Error::InvalidVersion { .. }
        ));
    }
}
