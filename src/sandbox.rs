//! Sandbox launching via bubblewrap.
//!
//! The composer emits directives as plain structured values; this module
//! renders them into `bwrap` argv and runs the result. Keeping the rendering
//! separate means the launch plan can be printed, inspected in tests, or
//! handed to a different mechanism without touching composition.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use log::info;

use crate::compose::Directive;

/// Runs a composed directive sequence.
#[cfg_attr(test, mockall::automock)]
pub trait SandboxLauncher {
    /// Launch the sandbox and return the sandboxed command's exit code.
    fn launch(&self, directives: &[Directive]) -> Result<i32>;
}

/// The real launcher, spawning `bwrap`.
pub struct BwrapLauncher {
    program: OsString,
}

impl Default for BwrapLauncher {
    fn default() -> Self {
        BwrapLauncher {
            program: OsString::from("bwrap"),
        }
    }
}

impl SandboxLauncher for BwrapLauncher {
    #[tracing::instrument(skip(self, directives))]
    fn launch(&self, directives: &[Directive]) -> Result<i32> {
        let args = render_args(directives);
        info!("launching sandbox: {}", render_command_line(directives));

        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .context("Failed to run bwrap (is bubblewrap installed?)")?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Render directives into `bwrap` argv.
///
/// Overlay sources arrive lowest layer first; overlayfs `lowerdir` lists the
/// uppermost lower layer first, and bwrap appends `--overlay-src` arguments
/// to `lowerdir` in the order given, so they are rendered in reverse. The
/// sandboxed command follows an explicit `--` terminator.
pub fn render_args(directives: &[Directive]) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    let overlay_sources: Vec<&Path> = directives
        .iter()
        .filter_map(|d| match d {
            Directive::OverlaySource { source } => Some(source.as_path()),
            _ => None,
        })
        .collect();
    for source in overlay_sources.iter().rev() {
        args.push("--overlay-src".into());
        args.push(source.as_os_str().to_os_string());
    }

    for directive in directives {
        match directive {
            Directive::OverlaySource { .. } => {} // rendered above
            Directive::Bind { source, target } => {
                args.push("--bind".into());
                args.push(source.as_os_str().to_os_string());
                args.push(target.as_os_str().to_os_string());
            }
            Directive::TmpOverlay { target } => {
                args.push("--tmp-overlay".into());
                args.push(target.as_os_str().to_os_string());
            }
            Directive::Symlink { target, link } => {
                args.push("--symlink".into());
                args.push(target.as_os_str().to_os_string());
                args.push(link.as_os_str().to_os_string());
            }
            Directive::Mkdir { path } => {
                args.push("--dir".into());
                args.push(path.as_os_str().to_os_string());
            }
            Directive::Command { argv } => {
                args.push("--".into());
                args.extend(argv.iter().map(OsString::from));
            }
        }
    }

    args
}

/// A printable form of the full launch invocation.
pub fn render_command_line(directives: &[Directive]) -> String {
    let mut line = String::from("bwrap");
    for arg in render_args(directives) {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}
