//! Locating the fleet store and loading the tracked-project registry.
//!
//! Manifest semantics live elsewhere; this module only realizes the
//! boundary the maintenance commands consume: a list of projects with
//! their clone parameters and resolved store locations.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::FleetErr;
use crate::error::Result;
use crate::project::Project;
use crate::project::ProjectSpec;

pub const STORE_DIR: &str = ".repofleet";
const REGISTRY_FILE: &str = "projects.toml";

/// A discovered fleet checkout: `root` is the directory the operator works
/// in, `store` the state directory inside it.
#[derive(Debug, Clone)]
pub struct Fleet {
    root: PathBuf,
    store: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Registry {
    #[serde(default, rename = "project")]
    projects: Vec<ProjectSpec>,
}

impl Fleet {
    /// Walk up from `cwd` to the first ancestor containing a store
    /// directory.
    pub fn discover(cwd: &Path) -> Result<Self> {
        let mut dir = cwd.to_path_buf();
        loop {
            let store = dir.join(STORE_DIR);
            if store.is_dir() {
                return Ok(Self { root: dir, store });
            }
            if !dir.pop() {
                return Err(FleetErr::NotInFleet(cwd.to_path_buf()));
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    /// Scan root holding per-checkout metadata trees.
    pub fn projects_root(&self) -> PathBuf {
        self.store.join("projects")
    }

    /// Scan root holding shared object stores.
    pub fn objects_root(&self) -> PathBuf {
        self.store.join("project-objects")
    }

    pub fn load_projects(&self) -> Result<Vec<Project>> {
        let path = self.store.join(REGISTRY_FILE);
        let raw = std::fs::read_to_string(&path)?;
        let registry: Registry =
            toml::from_str(&raw).map_err(|source| FleetErr::Registry { path, source })?;
        Ok(registry
            .projects
            .into_iter()
            .map(|spec| Project::resolve(spec, &self.store))
            .collect())
    }
}
