use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use debcell::application::{self, InstallOptions, RunOptions};
use debcell::compose::ComposeMode;
use debcell::deb::DpkgDeb;
use debcell::fetch::AptFetcher;
use debcell::registry::Registry;
use debcell::runtime::RealRuntime;
use debcell::sandbox::BwrapLauncher;

/// debcell - sandboxed Debian package cells
///
/// Installs .deb packages into isolated per-version cells under a system
/// root and launches applications inside a bubblewrap sandbox assembled
/// from exactly the packages they (transitively) depend on.
///
/// Examples:
///   debcell install ./hello.deb
///   debcell run hello -- /usr/bin/hello
#[derive(Parser, Debug)]
#[command(author, version = env!("DEBCELL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// System root holding the package registry (also via DEBCELL_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "DEBCELL_ROOT",
        value_name = "PATH",
        default_value = "/",
        global = true
    )]
    root: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install a .deb package into its own cell
    Install(InstallArgs),

    /// List installed packages
    List,

    /// Show metadata of an installed package
    Show(ShowArgs),

    /// Remove an installed package
    Remove(RemoveArgs),

    /// Run a command inside a package's sandbox
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct InstallArgs {
    /// Path to the .deb archive
    #[arg(value_name = "ARCHIVE")]
    archive: PathBuf,

    /// Do not fetch missing dependencies
    #[arg(long = "no-deps")]
    no_deps: bool,

    /// Scratch directory for fetched dependency archives
    #[arg(long, value_name = "PATH")]
    scratch: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct ShowArgs {
    /// Package name
    name: String,
}

#[derive(clap::Args, Debug)]
struct RemoveArgs {
    /// Package name
    name: String,

    /// Version to remove (defaults to the newest installed)
    version: Option<String>,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Package whose dependency closure populates the sandbox
    package: String,

    /// Composition strategy
    #[arg(long, value_enum, default_value = "overlay")]
    mode: Mode,

    /// Print the launch invocation instead of running it
    #[arg(long)]
    print: bool,

    /// Base package providing the root filesystem skeleton
    #[arg(long, value_name = "NAME")]
    base: Option<String>,

    /// Command to run inside the sandbox (after `--`)
    #[arg(value_name = "COMMAND", required = true, last = true)]
    command: Vec<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Mode {
    /// Stack package roots as overlay layers
    Overlay,
    /// Merge trees with per-path symlinks
    Symlink,
}

impl From<Mode> for ComposeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Overlay => ComposeMode::Overlay,
            Mode::Symlink => ComposeMode::SymlinkMerge,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;
    let registry = Registry::new(cli.root.clone());

    match cli.command {
        Commands::Install(args) => {
            let options = InstallOptions {
                fetch_dependencies: !args.no_deps,
                scratch_dir: args.scratch,
            };
            application::install(
                &runtime,
                &registry,
                &DpkgDeb,
                &AptFetcher,
                &args.archive,
                &options,
            )?;
        }
        Commands::List => {
            let packages = application::list_packages(&runtime, &registry)?;
            if packages.is_empty() {
                println!("No packages installed.");
            } else {
                for package in packages {
                    println!("{} {}", package.name, package.version);
                }
            }
        }
        Commands::Show(args) => {
            let package = application::show(&runtime, &registry, &args.name)?;
            let manifest = &package.manifest;
            println!("Name: {}", manifest.name);
            println!("Version: {}", manifest.version);
            println!("Architecture: {}", manifest.architecture);
            println!("Maintainer: {}", manifest.maintainer);
            println!("Dependencies: {}", manifest.dependencies);
            println!("Description: {}", manifest.description);
        }
        Commands::Remove(args) => {
            application::remove(&runtime, &registry, &args.name, args.version.as_deref())?;
        }
        Commands::Run(args) => {
            let options = RunOptions {
                mode: args.mode.into(),
                print_only: args.print,
                base: args.base,
            };
            let code = application::run(
                &runtime,
                &registry,
                &BwrapLauncher::default(),
                &args.package,
                &args.command,
                &options,
            )?;
            std::process::exit(code);
        }
    }
    Ok(())
}
