//! Entry point for the `repofleet` binary.

mod console;
mod gc_cmd;

use std::io::IsTerminal;

use clap::Parser;
use repofleet_core::FleetErr;
use tracing_subscriber::EnvFilter;

use crate::gc_cmd::GcCli;

/// Maintenance multitool for fleets of git checkouts sharing a common
/// object-storage area.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct MultitoolCli {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    /// Remove orphaned object stores; optionally repack partial clones.
    Gc(GcCli),
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = MultitoolCli::parse();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        match cli.subcommand {
            Subcommand::Gc(gc_cli) => gc_cmd::run(gc_cli).await,
        }
    });

    match result {
        Ok(()) => Ok(()),
        // A decline is a deliberate abort, not a failure to explain with a
        // backtrace-styled error chain.
        Err(FleetErr::Declined) => {
            eprintln!("{}", FleetErr::Declined);
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

fn init_tracing() {
    let default_level = "error";
    let _ = tracing_subscriber::fmt()
        // Fall back to `default_level` if the environment variable is not
        // set or contains an invalid value.
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}
