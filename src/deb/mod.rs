//! `.deb` archive access.
//!
//! The archive container format itself is not decoded here: extraction is
//! delegated to `dpkg-deb`, exactly as thin a wrapper as the rest of the
//! system expects. What this module owns is the [`DebExtractor`] seam (so
//! everything above it is testable without dpkg) and the mapping of
//! subprocess failures onto `InvalidArchive`.

pub mod control;

use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Access to a `.deb` archive's metadata and contents.
#[cfg_attr(test, mockall::automock)]
pub trait DebExtractor: Send + Sync {
    /// The raw control-file text of the archive.
    fn control(&self, archive: &Path) -> Result<String>;

    /// Unpack the archive's file tree into `dest`.
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// The real extractor, backed by `dpkg-deb`.
pub struct DpkgDeb;

impl DebExtractor for DpkgDeb {
    #[tracing::instrument(skip(self, archive))]
    fn control(&self, archive: &Path) -> Result<String> {
        // `dpkg-deb --field` with no field names prints the whole control file.
        let output = Command::new("dpkg-deb")
            .arg("--field")
            .arg(archive)
            .output()
            .map_err(Error::Io)?;
        if !output.status.success() {
            return Err(Error::invalid_archive(format!(
                "{}: dpkg-deb --field failed: {}",
                archive.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8(output.stdout).map_err(|_| {
            Error::invalid_archive(format!(
                "{}: control file is not valid UTF-8",
                archive.display()
            ))
        })
    }

    #[tracing::instrument(skip(self, archive, dest))]
    fn unpack(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!("extracting {} to {}", archive.display(), dest.display());
        let output = Command::new("dpkg-deb")
            .arg("-x")
            .arg(archive)
            .arg(dest)
            .output()
            .map_err(Error::Io)?;
        if !output.status.success() {
            return Err(Error::invalid_archive(format!(
                "{}: dpkg-deb -x failed: {}",
                archive.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
