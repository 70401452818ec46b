//! Finding and destroying object stores that no longer back any tracked
//! project.

use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use repofleet_common::elapsed::format_elapsed;
use repofleet_common::progress::Progress;
use tracing::debug;

use crate::error::FleetErr;
use crate::error::Result;
use crate::gc::GcConsole;
use crate::gc::GcOptions;
use crate::gc::scan::OBJECT_STORE_SUFFIX;
use crate::gc::scan::scan_object_stores;
use crate::project::Project;
use crate::registry::Fleet;

const TOMBSTONE_PREFIX: &str = "to_be_deleted_";

/// Paths that must survive: every tracked project's metadata tree and
/// object store. Stores shared between projects collapse to one entry.
pub fn liveness_set(projects: &[Project]) -> BTreeSet<PathBuf> {
    projects
        .iter()
        .flat_map(|project| [project.gitdir().to_path_buf(), project.objdir().to_path_buf()])
        .collect()
}

/// Everything on disk that looks like an object store but is not alive.
/// Recomputed from scratch on every invocation; nothing carries over
/// between runs.
pub fn plan_deletion(fleet: &Fleet, projects: &[Project]) -> Vec<PathBuf> {
    let live = liveness_set(projects);
    let mut found = scan_object_stores(&fleet.projects_root(), OBJECT_STORE_SUFFIX);
    found.extend(scan_object_stores(&fleet.objects_root(), OBJECT_STORE_SUFFIX));
    found.difference(&live).cloned().collect()
}

pub async fn delete_orphans(
    fleet: &Fleet,
    projects: &[Project],
    options: &GcOptions,
    console: &mut dyn GcConsole,
) -> Result<()> {
    console.status(&format!(
        "Scanning filesystem under {}...",
        fleet.store().display()
    ));
    let doomed = plan_deletion(fleet, projects);
    if doomed.is_empty() {
        console.status("Nothing to clean up.");
        return Ok(());
    }

    console.status("Identified the following object stores as no longer used:");
    for path in &doomed {
        console.status(&format!("  {}", path.display()));
    }
    if !options.assume_yes {
        let proceed = console.confirm(
            "If you proceed, any local commits in those projects will be destroyed!\nProceed? [y/N] ",
        )?;
        if !proceed {
            return Err(FleetErr::Declined);
        }
    }

    let started = Instant::now();
    let progress = Progress::new("Deleting", doomed.len() as u64, options.quiet);
    for path in &doomed {
        if options.dry_run {
            console.status(&format!("Would have deleted {}", path.display()));
        } else {
            remove_store(path).await?;
        }
        progress.update(&path.display().to_string(), 1);
    }
    progress.finish();
    if !options.dry_run {
        console.status(&format!(
            "Deleted {} object store(s){}.",
            doomed.len(),
            format_elapsed(started)
        ));
    }
    Ok(())
}

/// Tombstone-then-reclaim: the store is renamed within its parent before
/// the recursive delete, so a path visible under its original name is
/// always fully alive, never mid-removal.
async fn remove_store(path: &Path) -> Result<()> {
    let Some(name) = path.file_name() else {
        // Scan results always carry a final component.
        return Ok(());
    };
    let tombstone =
        path.with_file_name(format!("{TOMBSTONE_PREFIX}{}", name.to_string_lossy()));
    match tokio::fs::rename(path, &tombstone).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // Vanished since the scan: someone else already resolved it.
            debug!("skipping {}: already gone", path.display());
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }
    tokio::fs::remove_dir_all(&tombstone).await?;
    Ok(())
}
