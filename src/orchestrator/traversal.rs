//! Discovery of package directories under `<root>/sdk/<service>/<package>`.

use std::path::{Path, PathBuf};

use crate::errors::RegenError;

/// Directory under the repository root that holds service directories.
pub const SDK_DIR: &str = "sdk";

/// One buildable unit, identified by its absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDirectory {
    path: PathBuf,
    name: String,
}

impl PackageDirectory {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning service directory.
    pub fn service(&self) -> &str {
        self.path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
    }
}

/// Resolve an operator-supplied path the same way the root is resolved:
/// canonical when it exists, otherwise made absolute against the working
/// directory.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Enumerate every package directory in traversal order.
///
/// Both levels are sorted lexically by file name so the order does not depend
/// on what the filesystem happens to return.
pub fn discover_packages(root: &Path) -> Result<Vec<PackageDirectory>, RegenError> {
    let sdk_dir = root.join(SDK_DIR);
    if !sdk_dir.is_dir() {
        return Err(RegenError::SdkDirMissing { path: sdk_dir });
    }

    let mut packages = Vec::new();
    for service_dir in sorted_subdirectories(&sdk_dir)? {
        for package_dir in sorted_subdirectories(&service_dir)? {
            packages.push(PackageDirectory::new(package_dir));
        }
    }
    tracing::debug!(root = %root.display(), count = packages.len(), "discovered package directories");
    Ok(packages)
}

fn sorted_subdirectories(dir: &Path) -> Result<Vec<PathBuf>, RegenError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RegenError::ListDirFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(dirs)
}
