use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FleetErr>;

#[derive(Debug, Error)]
pub enum FleetErr {
    /// The operator answered the destruction prompt with anything other
    /// than an explicit yes. Raised before any mutation.
    #[error("operator declined; no object stores were removed")]
    Declined,

    #[error("no {} store found in `{}` or any parent directory", crate::registry::STORE_DIR, .0.display())]
    NotInFleet(PathBuf),

    /// An engine command that was run with exit verification came back
    /// non-zero. `status` is -1 when the process died on a signal.
    #[error("git {args} in {} exited with status {status}: {stderr}", .gitdir.display())]
    GitCommand {
        args: String,
        gitdir: PathBuf,
        status: i32,
        stderr: String,
    },

    #[error("failed to spawn git {args}: {source}")]
    GitSpawn {
        args: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid project registry {}: {source}", .path.display())]
    Registry {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}
