//! Operator-supplied set of packages excluded from a run.
//!
//! Matching rule: an identifier that contains a path separator names a
//! package by its full path; any other identifier names a package by its
//! directory name. Both forms may be mixed in one set. Paths are normalized
//! on insert so they compare equal to discovered package paths.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::orchestrator::{PackageDirectory, normalize_path};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet {
    names: BTreeSet<String>,
    paths: BTreeSet<PathBuf>,
}

impl SkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from identifiers, dropping blanks and duplicates.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        set.extend(entries);
        set
    }

    pub fn extend<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            self.insert(entry.as_ref());
        }
    }

    pub fn insert(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }
        if is_path_like(entry) {
            let path = Path::new(entry.trim_end_matches(['/', '\\']));
            self.paths.insert(normalize_path(path));
        } else {
            self.names.insert(entry.to_string());
        }
    }

    /// Read one identifier per line; blank lines and `#` comments are ignored.
    ///
    /// An unreadable file yields an empty set: a bad skip list must not stop a
    /// run.
    pub fn load_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skip file unreadable, ignoring");
                Self::new()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        Self::from_entries(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.starts_with('#')),
        )
    }

    pub fn contains(&self, package: &PackageDirectory) -> bool {
        self.names.contains(package.name()) || self.paths.contains(package.path())
    }

    pub fn len(&self) -> usize {
        self.names.len() + self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All identifiers, names first, for display.
    pub fn entries(&self) -> Vec<String> {
        self.names
            .iter()
            .cloned()
            .chain(self.paths.iter().map(|p| p.display().to_string()))
            .collect()
    }
}

fn is_path_like(entry: &str) -> bool {
    entry.contains('/') || entry.contains('\\') || entry.contains(std::path::MAIN_SEPARATOR)
}
