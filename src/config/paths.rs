//! Path Resolution
//!
//! Expands `~` and turns every configured path into an absolute one. An
//! empty string is kept as the empty path, meaning the path is unused.
//! Existence is not checked here; see [`missing_paths`].

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

/// Path key for the run's output directory.
pub const OUTPUT_KEY: &str = "OUTPUT";

/// Path key for the run's scratch directory.
pub const SCRATCH_KEY: &str = "SCRATCH";

/// Paths that are created by the run rather than required up front.
pub const EXEMPT_KEYS: &[&str] = &[OUTPUT_KEY, SCRATCH_KEY];

/// Resolved `PATHS` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Paths {
    entries: BTreeMap<String, PathBuf>,
}

impl Paths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(key.into(), path.into());
    }

    /// Returns the path for `key`, or `None` when absent or unused.
    pub fn get(&self, key: &str) -> Option<&Path> {
        self.entries
            .get(key)
            .map(PathBuf::as_path)
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Points unset `OUTPUT` and `SCRATCH` at the run directory defaults.
    pub fn fill_run_defaults(&mut self, workdir: &Path) {
        for (key, dir) in [(OUTPUT_KEY, "output"), (SCRATCH_KEY, "scratch")] {
            if !self.is_set(key) {
                self.insert(key, workdir.join(dir));
            }
        }
    }
}

/// Expands a leading `~` to the user's home directory.
///
/// `~user` forms are left untouched.
pub fn expand_tilde(raw: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (raw, home) {
        ("~", Some(home)) => home,
        (raw, Some(home)) if raw.starts_with("~/") => home.join(&raw[2..]),
        (raw, _) => PathBuf::from(raw),
    }
}

/// Joins `path` onto `base` when relative and normalizes `.` and `..`.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    normalize(&joined)
}

/// Lexical normalization; does not touch the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolves raw path strings against `base`.
///
/// Only the empty string means "unused"; other values, whitespace
/// included, are taken verbatim.
pub fn resolve_paths(raw: &BTreeMap<String, String>, base: &Path) -> Paths {
    let mut paths = Paths::new();

    for (key, value) in raw {
        if value.is_empty() {
            paths.insert(key.clone(), PathBuf::new());
            continue;
        }

        let resolved = absolutize(&expand_tilde(value), base);
        debug!("Path {} -> {}", key, resolved.display());
        paths.insert(key.clone(), resolved);
    }

    paths
}

/// Lists configured paths that must exist but do not.
///
/// Unused paths and the exempt output/scratch directories are skipped.
pub fn missing_paths(paths: &Paths) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|(key, _)| !EXEMPT_KEYS.contains(&key.as_str()))
        .filter(|(_, path)| !path.as_os_str().is_empty())
        .filter(|(_, path)| !path.exists())
        .map(|(_, path)| path.clone())
        .collect()
}
