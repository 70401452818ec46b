//! Root of the `repofleet-core` library.

// Library code must not write to stdout/stderr directly. User-visible
// output goes through the `GcConsole` seam or the progress reporter.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod error;
pub mod gc;
pub mod git;
pub mod project;
pub mod registry;

pub use error::FleetErr;
pub use error::Result;
