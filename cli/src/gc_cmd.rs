use clap::Parser;
use repofleet_core::Result;
use repofleet_core::gc;
use repofleet_core::gc::GcOptions;
use repofleet_core::registry::Fleet;

use crate::console::StdConsole;

/// Command-line interface for `repofleet gc`.
#[derive(Debug, Parser)]
pub struct GcCli {
    /// Do everything except actually delete.
    #[arg(long = "dry-run", short = 'n', default_value_t = false)]
    pub dry_run: bool,

    /// Answer yes to the destruction prompt.
    #[arg(long = "yes", short = 'y', default_value_t = false)]
    pub yes: bool,

    /// After cleanup, repack projects cloned with --filter=blob:none.
    #[arg(long = "repack", default_value_t = false)]
    pub repack: bool,

    /// Suppress progress output.
    #[arg(long = "quiet", short = 'q', default_value_t = false)]
    pub quiet: bool,

    /// Number of projects to repack in parallel.
    #[arg(long = "jobs", short = 'j', default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,
}

pub async fn run(cli: GcCli) -> Result<()> {
    let fleet = Fleet::discover(&std::env::current_dir()?)?;
    let projects = fleet.load_projects()?;
    let options = GcOptions {
        dry_run: cli.dry_run,
        assume_yes: cli.yes,
        repack: cli.repack,
        quiet: cli.quiet,
        jobs: usize::from(cli.jobs),
    };
    let mut console = StdConsole;
    gc::run(&fleet, &projects, &options, &mut console).await
}
