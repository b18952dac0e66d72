//! Run action - resolve, compose and launch a package inside its sandbox.

use anyhow::{Context, Result};
use log::info;

use crate::compose::{ComposeMode, Composer};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::runtime::Runtime;
use crate::sandbox::{self, SandboxLauncher};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: ComposeMode,
    /// Print the launch invocation instead of executing it.
    pub print_only: bool,
    /// Override the base package name.
    pub base: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            mode: ComposeMode::Overlay,
            print_only: false,
            base: None,
        }
    }
}

/// Resolve `package`'s closure against one registry snapshot, compose the
/// sandbox plan and run `command` inside it. Returns the sandboxed
/// command's exit code.
#[tracing::instrument(skip(runtime, registry, launcher, command, options))]
pub fn run<R, L>(
    runtime: &R,
    registry: &Registry,
    launcher: &L,
    package: &str,
    command: &[String],
    options: &RunOptions,
) -> Result<i32>
where
    R: Runtime,
    L: SandboxLauncher,
{
    let snapshot = registry.snapshot(runtime)?;
    let requested = snapshot
        .newest(package)
        .cloned()
        .with_context(|| format!("Package {package} is not installed"))?;

    let mut resolver = Resolver::new(&snapshot);
    if let Some(base) = &options.base {
        resolver = resolver.with_base(base.clone());
    }
    let resolved = resolver.resolve(std::slice::from_ref(&requested))?;
    info!("resolved {} package(s) for {package}", resolved.len());

    let composer = Composer::new(runtime, registry);
    let directives = composer.compose(&resolved, options.mode, command)?;

    if options.print_only {
        println!("{}", sandbox::render_command_line(&directives));
        return Ok(0);
    }
    launcher.launch(&directives)
}
