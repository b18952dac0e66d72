//! Error taxonomy for the resolution and composition core.
//!
//! `CorruptPackageEntry` is recovered locally during registry scans (the entry
//! is skipped and reported); every other kind aborts the enclosing operation
//! and propagates to the caller. Resolution and composition never partially
//! succeed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A version string outside Debian version syntax. Raised at parse time,
    /// never silently coerced.
    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    /// A dependency expression that cannot be parsed.
    #[error("malformed dependency {input:?}: {reason}")]
    MalformedDependency { input: String, reason: String },

    /// A dependency term with no satisfying candidate in the registry.
    #[error("no installed package satisfies \"{term}\"")]
    UnresolvedDependency { term: String },

    /// A registry entry that cannot be interpreted as an installed package.
    #[error("corrupt package entry {entry:?}: {reason}")]
    CorruptPackageEntry { entry: String, reason: String },

    /// Composer invariant violation: a discovered path escaped the prefix it
    /// was expected to live under.
    #[error("path {path:?} is not under {prefix:?}")]
    PathComputation { path: PathBuf, prefix: PathBuf },

    /// A package archive whose control metadata is missing or malformed.
    #[error("invalid archive: {reason}")]
    InvalidArchive { reason: String },

    /// A package directory without a readable manifest.
    #[error("missing manifest at {path:?}")]
    MissingManifest { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidVersion {
            version: version.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedDependency {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_archive(reason: impl Into<String>) -> Self {
        Error::InvalidArchive {
            reason: reason.into(),
        }
    }
}
