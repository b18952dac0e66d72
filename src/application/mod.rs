//! Application layer - use cases that coordinate the core components
//! against a runtime.
//!
//! Each operation takes the registry as an explicit value, so callers (and
//! tests) can point the same code at any system root.

mod install;
mod list;
mod remove;
mod run;
mod show;

pub use install::{InstallOptions, install};
pub use list::{PackageInfo, list_packages};
pub use remove::remove;
pub use run::{RunOptions, run};
pub use show::show;
