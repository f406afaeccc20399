//! Theme directory on disk
//!
//! The theme root mirrors remote asset keys 1:1. Only the standard theme
//! directories take part in a sync; anything else under the root is
//! left alone.
//!
//! Writes are atomic (write to a temp file next to the target, then
//! rename) so a reader never sees a partially written asset.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::error::{LocalError, LocalResult};

/// Top-level directories that make up a theme
pub const THEME_DIRECTORIES: &[&str] = &[
    "assets", "blocks", "config", "layout", "locales", "sections", "snippets", "templates",
];

/// Suffix for in-progress writes
const TEMP_SUFFIX: &str = ".themesync.tmp";

/// Result of writing an asset locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// File was created or its content replaced
    Written,
    /// File already had identical content
    Unchanged,
}

/// Result of deleting a local asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete
    Missing,
}

/// Local theme tree rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalTheme {
    root: PathBuf,
}

impl LocalTheme {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List asset keys present locally, sorted
    ///
    /// Missing theme directories are skipped. In-progress temp files are
    /// never reported.
    pub fn list(&self) -> LocalResult<Vec<String>> {
        let mut keys = Vec::new();

        for dir in THEME_DIRECTORIES {
            let dir_path = self.root.join(dir);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&dir_path).follow_links(true) {
                let entry = entry.map_err(|e| LocalError::WalkError {
                    path: dir_path.clone(),
                    details: e.to_string(),
                })?;

                if !entry.file_type().is_file() {
                    continue;
                }
                if let Some(key) = self.key_for(entry.path()) {
                    if !key.ends_with(TEMP_SUFFIX) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Check whether an asset exists locally
    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Read an asset's bytes
    pub fn read(&self, key: &str) -> LocalResult<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| LocalError::from_read_io(e, path))
    }

    /// Write an asset, skipping the write when content is identical
    pub fn write(&self, key: &str, data: &[u8]) -> LocalResult<WriteOutcome> {
        let path = self.path_for(key)?;

        if let Ok(existing) = fs::read(&path) {
            if existing == data {
                debug!("{} unchanged", key);
                return Ok(WriteOutcome::Unchanged);
            }
        }

        atomic_write(&path, data)?;
        Ok(WriteOutcome::Written)
    }

    /// Delete an asset
    ///
    /// Deleting a file that does not exist is not an error.
    pub fn delete(&self, key: &str) -> LocalResult<DeleteOutcome> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DeleteOutcome::Missing),
            Err(e) => Err(LocalError::from_io(e, path)),
        }
    }

    /// Resolve an asset key to a path under the root
    pub fn path_for(&self, key: &str) -> LocalResult<PathBuf> {
        let invalid = |reason| LocalError::InvalidPath {
            key: key.to_string(),
            reason,
        };

        if key.is_empty() {
            return Err(invalid("empty key"));
        }
        let relative = Path::new(key);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                Component::CurDir => {}
                Component::ParentDir => return Err(invalid("path escapes the theme root")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("absolute paths are not allowed"))
                }
            }
        }

        Ok(self.root.join(relative))
    }

    /// Key for a path under the root, with `/` separators
    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The temp name is derived from the full file name, so concurrent writes
/// to different assets in one directory never share a temp file.
fn atomic_write(path: &Path, data: &[u8]) -> LocalResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => LocalError::from_io(e, parent.to_path_buf()),
            _ => LocalError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            },
        })?;
    }

    let mut temp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    temp_name.push(TEMP_SUFFIX);
    let temp_path = path.with_file_name(temp_name);

    let result = (|| {
        let mut file =
            File::create(&temp_path).map_err(|e| LocalError::from_io(e, temp_path.clone()))?;
        file.write_all(data)
            .map_err(|e| LocalError::from_io(e, temp_path.clone()))?;
        file.sync_all()
            .map_err(|e| LocalError::from_io(e, temp_path.clone()))?;

        fs::rename(&temp_path, path).map_err(|e| LocalError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source: e,
        })
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
