use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;
use crate::git::GitInvocation;

fn default_remote() -> String {
    "origin".to_string()
}

/// One registry entry, as written in `projects.toml`. `name` keys the
/// shared object store, `path` the per-checkout metadata tree; several
/// entries may carry the same `name` and therefore share one object store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectSpec {
    pub name: String,
    pub path: String,
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Zero or absent means a full clone.
    #[serde(default)]
    pub clone_depth: u32,
    pub clone_filter: Option<String>,
}

/// A tracked checkout with its on-disk locations resolved against the
/// fleet store.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub remote: String,
    pub clone_depth: u32,
    pub clone_filter: Option<String>,
    gitdir: PathBuf,
    objdir: PathBuf,
}

impl Project {
    pub fn resolve(spec: ProjectSpec, store: &Path) -> Self {
        let gitdir = store.join("projects").join(format!("{}.git", spec.path));
        let objdir = store
            .join("project-objects")
            .join(format!("{}.git", spec.name));
        Self {
            name: spec.name,
            remote: spec.remote,
            clone_depth: spec.clone_depth,
            clone_filter: spec.clone_filter,
            gitdir,
            objdir,
        }
    }

    /// Per-checkout metadata directory.
    pub fn gitdir(&self) -> &Path {
        &self.gitdir
    }

    /// Object-store directory, possibly shared with other projects.
    pub fn objdir(&self) -> &Path {
        &self.objdir
    }

    /// The live pack directory inside the object store.
    pub fn pack_dir(&self) -> PathBuf {
        self.objdir.join("objects").join("pack")
    }
}

/// Engine configuration for one project, read once per invocation.
#[derive(Debug, Clone, Default)]
pub struct GitConfig {
    values: HashMap<String, String>,
}

impl GitConfig {
    /// Read the project's effective configuration via the engine.
    pub async fn load(gitdir: &Path) -> Result<Self> {
        let output = GitInvocation::new(gitdir, ["config", "--list", "--null"])
            .capture_stdout()
            .capture_stderr()
            .verify()
            .run()
            .await?;
        Ok(Self::parse(&String::from_utf8_lossy(&output.stdout)))
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let values = pairs
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value.to_string()))
            .collect();
        Self { values }
    }

    /// `--null` terminates each entry with NUL and separates the key from
    /// its value with a newline; a valueless `[section] key` entry has no
    /// newline at all and reads as set.
    fn parse(raw: &str) -> Self {
        let mut values = HashMap::new();
        for entry in raw.split('\0') {
            if entry.is_empty() {
                continue;
            }
            let (key, value) = match entry.split_once('\n') {
                Some((key, value)) => (key, value),
                None => (entry, "true"),
            };
            // Section and key names are case-insensitive in git.
            values.insert(key.to_ascii_lowercase(), value.to_string());
        }
        Self { values }
    }

    /// Git boolean semantics: `true`/`yes`/`on`/`1` (case-insensitive) are
    /// true; anything else, or an absent key, is false.
    pub fn get_boolean(&self, key: &str) -> bool {
        match self.values.get(&key.to_ascii_lowercase()) {
            Some(value) => matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1"
            ),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn resolve_places_dirs_under_the_store() {
        let spec = ProjectSpec {
            name: "platform/build".to_string(),
            path: "build".to_string(),
            remote: "aosp".to_string(),
            clone_depth: 1,
            clone_filter: Some("blob:none".to_string()),
        };
        let project = Project::resolve(spec, Path::new("/fleet/.repofleet"));
        assert_eq!(
            project.gitdir(),
            Path::new("/fleet/.repofleet/projects/build.git")
        );
        assert_eq!(
            project.objdir(),
            Path::new("/fleet/.repofleet/project-objects/platform/build.git")
        );
        assert_eq!(
            project.pack_dir(),
            Path::new("/fleet/.repofleet/project-objects/platform/build.git/objects/pack")
        );
    }

    #[test]
    fn config_parses_null_terminated_listing() {
        let raw = "core.bare\ntrue\0extensions.preciousobjects\nyes\0remote.origin.url\nssh://x\0";
        let config = GitConfig::parse(raw);
        assert!(config.get_boolean("core.bare"));
        assert!(config.get_boolean("extensions.preciousObjects"));
        assert!(!config.get_boolean("remote.origin.url"));
        assert!(!config.get_boolean("core.missing"));
    }

    #[test]
    fn valueless_keys_read_as_set() {
        let config = GitConfig::parse("extensions.preciousobjects\0");
        assert!(config.get_boolean("extensions.preciousObjects"));
    }

    #[test]
    fn boolean_truthiness_matches_git() {
        let config = GitConfig::from_pairs([
            ("a.on", "on"),
            ("a.one", "1"),
            ("a.yes", "YES"),
            ("a.off", "off"),
            ("a.zero", "0"),
            ("a.garbage", "maybe"),
        ]);
        assert!(config.get_boolean("a.on"));
        assert!(config.get_boolean("a.one"));
        assert!(config.get_boolean("a.yes"));
        assert!(!config.get_boolean("a.off"));
        assert!(!config.get_boolean("a.zero"));
        assert!(!config.get_boolean("a.garbage"));
    }
}
