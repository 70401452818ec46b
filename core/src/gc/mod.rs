//! Orphan cleanup and partial-clone repack for the tracked fleet.
//!
//! Cleanup always runs to completion first: repack operates on object
//! directories that deletion might otherwise still be evaluating, so the
//! two stages never overlap. Repack runs only when cleanup succeeded and
//! was asked for.

pub mod delete;
pub mod repack;
pub mod scan;

use std::io;

use crate::error::Result;
use crate::project::Project;
use crate::registry::Fleet;

/// Options for one `gc` invocation, straight from the command line.
#[derive(Debug, Clone)]
pub struct GcOptions {
    /// Report everything, mutate nothing.
    pub dry_run: bool,
    /// Skip the destruction prompt.
    pub assume_yes: bool,
    /// Run the repack stage after cleanup.
    pub repack: bool,
    /// Suppress progress output.
    pub quiet: bool,
    /// Bound on concurrently repacked projects.
    pub jobs: usize,
}

impl Default for GcOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            assume_yes: false,
            repack: false,
            quiet: false,
            jobs: 1,
        }
    }
}

/// Seam between the core and whatever front end drives it. `confirm` must
/// block until the operator answers; tests inject scripted answers instead
/// of reading a terminal.
pub trait GcConsole {
    fn status(&mut self, line: &str);
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

pub async fn run(
    fleet: &Fleet,
    projects: &[Project],
    options: &GcOptions,
    console: &mut dyn GcConsole,
) -> Result<()> {
    delete::delete_orphans(fleet, projects, options, console).await?;
    if !options.repack {
        return Ok(());
    }
    repack::repack_projects(projects, options, console).await
}
