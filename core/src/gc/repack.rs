//! Re-packing partial clones into two packs: a remote-reachable,
//! blob-omitting pack carrying a `.promisor` marker, and a self-contained
//! local pack for everything the remote cannot serve back.

use std::io;
use std::path::Path;

use futures::StreamExt;
use futures::TryStreamExt;
use futures::stream;
use repofleet_common::progress::Progress;
use tracing::debug;

use crate::error::FleetErr;
use crate::error::Result;
use crate::gc::GcConsole;
use crate::gc::GcOptions;
use crate::git::GitInvocation;
use crate::project::GitConfig;
use crate::project::Project;

/// Filter a project must have been cloned with to qualify for the split.
const PARTIAL_CLONE_FILTER: &str = "blob:none";
/// Staging directory for freshly written packs, inside the gitdir.
const STAGING_DIR: &str = "tmp_repack";
const PACK_EXT: &str = "pack";
const PROMISOR_EXT: &str = "promisor";

/// Whether `project` should be repacked. Pure: the decision depends only
/// on the loaded configuration and the project's clone parameters.
///
/// `extensions.preciousObjects` forbids destructive compaction outright; a
/// zero depth means a full clone that gains nothing from a promisor split;
/// a filter other than blob:none would produce packs the fetch machinery
/// cannot lazily refill.
pub fn is_repack_candidate(config: &GitConfig, project: &Project) -> bool {
    !config.get_boolean("extensions.preciousObjects")
        && project.clone_depth > 0
        && project.clone_filter.as_deref() == Some(PARTIAL_CLONE_FILTER)
}

pub async fn repack_projects(
    projects: &[Project],
    options: &GcOptions,
    console: &mut dyn GcConsole,
) -> Result<()> {
    let mut candidates = Vec::new();
    for project in projects {
        let config = GitConfig::load(project.gitdir()).await?;
        if is_repack_candidate(&config, project) {
            candidates.push(project);
        }
    }

    if options.dry_run {
        console.status(&format!(
            "Would have repacked {} project(s).",
            candidates.len()
        ));
        return Ok(());
    }

    let progress = Progress::new(
        "Repacking (this will take a while)",
        candidates.len() as u64,
        options.quiet,
    );
    // One worker per project up to the configured bound; the first failure
    // stops admission of further projects and aborts the invocation.
    stream::iter(candidates)
        .map(Ok::<&Project, FleetErr>)
        .try_for_each_concurrent(options.jobs.max(1), |project| {
            let progress = &progress;
            async move { repack_project(project, progress).await }
        })
        .await?;
    progress.finish();
    Ok(())
}

async fn repack_project(project: &Project, progress: &Progress) -> Result<()> {
    progress.update(&project.name, 0);
    debug!("repacking {}", project.name);

    let staging = project.gitdir().join(STAGING_DIR);
    match tokio::fs::remove_dir_all(&staging).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    tokio::fs::create_dir_all(&staging).await?;

    // Drop dangling ref history first so the maintenance pass can reclaim
    // the objects it kept reachable.
    GitInvocation::new(
        project.gitdir(),
        ["reflog", "expire", "--expire-unreachable=all"],
    )
    .verify()
    .run()
    .await?;
    progress.update(&format!("{} | gc", project.name), 0);
    GitInvocation::new(project.gitdir(), ["gc"])
        .verify()
        .run()
        .await?;

    progress.update(&format!("{} | generating list of objects", project.name), 0);
    let remotes_arg = format!("--remotes={}", project.remote);
    // The three enumerations are independent engine queries. Start them
    // all before joining any so their I/O overlaps; join in the order the
    // results are consumed, remote first.
    let remote_objects = GitInvocation::new(
        project.gitdir(),
        [
            "rev-list",
            "--objects",
            remotes_arg.as_str(),
            "--filter=blob:none",
            "--tags",
        ],
    )
    .capture_stdout()
    .verify()
    .start()?;
    let local_head_objects =
        GitInvocation::new(project.gitdir(), ["rev-list", "--objects", "HEAD^{tree}"])
            .capture_stdout()
            .verify()
            .start()?;
    let local_objects = GitInvocation::new(
        project.gitdir(),
        [
            "rev-list",
            "--objects",
            "--all",
            "--reflog",
            "--indexed-objects",
            "--not",
            remotes_arg.as_str(),
            "--tags",
        ],
    )
    .capture_stdout()
    .verify()
    .start()?;

    let remote_list = remote_objects.join().await?;

    progress.update(&format!("{} | remote repack", project.name), 0);
    let pack_stem = staging.join("pack");
    pack_objects(project.gitdir(), &pack_stem, remote_list.stdout).await?;
    // Markers must be on disk before the swap can make these packs
    // visible; the local pack written next deliberately never gets one.
    write_promisor_markers(&staging)?;

    let local_head_list = local_head_objects.join().await?;
    let local_list = local_objects.join().await?;

    progress.update(&format!("{} | local repack", project.name), 0);
    let mut combined = local_head_list.stdout;
    combined.extend_from_slice(&local_list.stdout);
    pack_objects(project.gitdir(), &pack_stem, combined).await?;

    swap_pack_dir(&project.pack_dir(), &staging).await?;
    progress.update(&project.name, 1);
    Ok(())
}

async fn pack_objects(gitdir: &Path, pack_stem: &Path, objects: Vec<u8>) -> Result<()> {
    let pack_arg = pack_stem.display().to_string();
    GitInvocation::new(gitdir, ["pack-objects", pack_arg.as_str()])
        .stdin(objects)
        .capture_stdout()
        .capture_stderr()
        .verify()
        .run()
        .await?;
    Ok(())
}

/// Mark every pack in `dir` as possibly omitting reachable blobs: an empty
/// sibling file with the same basename and the `.promisor` extension.
pub fn write_promisor_markers(dir: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(PACK_EXT) {
            std::fs::File::create(path.with_extension(PROMISOR_EXT))?;
        }
    }
    Ok(())
}

/// Make the staged packs live. The ordering bounds crash damage: dying
/// before the first rename leaves the store untouched; dying between the
/// renames leaves the store briefly without a `pack` entry but with both
/// trees intact under their alternate names; dying after them leaks only
/// disk space.
pub async fn swap_pack_dir(live: &Path, staging: &Path) -> Result<()> {
    let old = live.with_file_name("pack_old");
    tokio::fs::rename(live, &old).await?;
    tokio::fs::rename(staging, live).await?;
    tokio::fs::remove_dir_all(&old).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::project::ProjectSpec;

    fn partial_clone_project(store: &Path) -> Project {
        Project::resolve(
            ProjectSpec {
                name: "platform/art".to_string(),
                path: "art".to_string(),
                remote: "origin".to_string(),
                clone_depth: 3,
                clone_filter: Some("blob:none".to_string()),
            },
            store,
        )
    }

    #[test]
    fn partial_clones_without_precious_objects_qualify() {
        let project = partial_clone_project(Path::new("/fleet/.repofleet"));
        assert!(is_repack_candidate(&GitConfig::default(), &project));
    }

    #[test]
    fn precious_objects_excludes_regardless_of_clone_shape() {
        let project = partial_clone_project(Path::new("/fleet/.repofleet"));
        let config = GitConfig::from_pairs([("extensions.preciousobjects", "true")]);
        assert!(!is_repack_candidate(&config, &project));
    }

    #[test]
    fn full_clones_and_other_filters_are_excluded() {
        let store = Path::new("/fleet/.repofleet");
        let mut full = partial_clone_project(store);
        full.clone_depth = 0;
        assert!(!is_repack_candidate(&GitConfig::default(), &full));

        let mut tree_filter = partial_clone_project(store);
        tree_filter.clone_filter = Some("tree:0".to_string());
        assert!(!is_repack_candidate(&GitConfig::default(), &tree_filter));

        let mut unfiltered = partial_clone_project(store);
        unfiltered.clone_filter = None;
        assert!(!is_repack_candidate(&GitConfig::default(), &unfiltered));
    }

    #[test]
    fn promisor_markers_cover_exactly_the_pack_files() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(tmp.path().join("pack-abc.pack"), b"P").expect("write");
        std::fs::write(tmp.path().join("pack-abc.idx"), b"I").expect("write");
        std::fs::write(tmp.path().join("pack-def.pack"), b"P").expect("write");

        write_promisor_markers(tmp.path()).expect("markers");

        assert!(tmp.path().join("pack-abc.promisor").exists());
        assert!(tmp.path().join("pack-def.promisor").exists());
        let markers = std::fs::read_dir(tmp.path())
            .expect("read_dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some(PROMISOR_EXT)
            })
            .count();
        assert_eq!(markers, 2);
        assert_eq!(
            std::fs::read(tmp.path().join("pack-abc.promisor")).expect("read"),
            Vec::<u8>::new()
        );
    }

    #[tokio::test]
    async fn swap_replaces_the_live_pack_directory() {
        let tmp = TempDir::new().expect("tempdir");
        let live = tmp.path().join("objects/pack");
        let staging = tmp.path().join("tmp_repack");
        std::fs::create_dir_all(&live).expect("mkdir live");
        std::fs::create_dir_all(&staging).expect("mkdir staging");
        std::fs::write(live.join("pack-old.pack"), b"old").expect("write");
        std::fs::write(staging.join("pack-new.pack"), b"new").expect("write");

        swap_pack_dir(&live, &staging).await.expect("swap");

        assert!(live.join("pack-new.pack").exists());
        assert!(!live.join("pack-old.pack").exists());
        assert!(!staging.exists());
        assert!(!tmp.path().join("objects/pack_old").exists());
    }

    #[tokio::test]
    async fn crash_between_renames_leaves_both_trees_addressable() {
        // Simulate dying after the first rename: the live directory has
        // moved aside and the staging tree still exists. Exactly one of
        // the two is reachable under an alternate, recognizable name and
        // no pack data was lost.
        let tmp = TempDir::new().expect("tempdir");
        let live = tmp.path().join("objects/pack");
        let staging = tmp.path().join("tmp_repack");
        std::fs::create_dir_all(&live).expect("mkdir live");
        std::fs::create_dir_all(&staging).expect("mkdir staging");
        std::fs::write(live.join("pack-old.pack"), b"old").expect("write");
        std::fs::write(staging.join("pack-new.pack"), b"new").expect("write");

        let old = live.with_file_name("pack_old");
        tokio::fs::rename(&live, &old).await.expect("rename aside");

        assert!(!live.exists());
        assert!(old.join("pack-old.pack").exists());
        assert!(staging.join("pack-new.pack").exists());
    }
}
