use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use walkdir::WalkDir;

/// Directories whose name carries this suffix are object stores: opaque
/// units that are reported whole and never descended into.
pub const OBJECT_STORE_SUFFIX: &str = ".git";

/// Recursively collect every directory under `root` whose name ends with
/// `suffix`.
///
/// The walk tolerates concurrent external mutation: entries that vanish
/// between listing and visiting are skipped rather than failing the scan.
/// Symlinks are followed; walkdir's ancestor check breaks cycles. A
/// missing `root` yields the empty set.
pub fn scan_object_stores(root: &Path, suffix: &str) -> BTreeSet<PathBuf> {
    let mut stores = BTreeSet::new();
    let mut walker = WalkDir::new(root).follow_links(true).into_iter();
    loop {
        let entry = match walker.next() {
            None => break,
            Some(Ok(entry)) => entry,
            Some(Err(_)) => continue,
        };
        // The root itself is never a candidate, only things found under it.
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(suffix) {
            stores.insert(entry.path().to_path_buf());
            walker.skip_current_dir();
        }
    }
    stores
}
