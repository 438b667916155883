//! On-disk metadata store backing [`crate::LocalRunner`]. One JSON file per
//! entity under a root directory, mirroring the "Persisted state layout" of
//! `spec.md` §6: `{root}/{realm}/{space}/{stack}/{cell}/cell.json`, with each
//! level's own entity stored next to the directory that holds its children.
//! Containers have no file of their own — they live embedded in their cell's
//! `cell.json`, matching `kukeon-core`'s Cell-only container routing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A directory tree of JSON files. All methods are synchronous — this store
/// exists to give the reconciliation engine's tests and local CLI use a real
/// filesystem-backed Runner, not to model the latency of a production
/// metadata service.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn realm_dir(&self, realm: &str) -> PathBuf {
        self.root.join(realm)
    }

    pub fn realm_file(&self, realm: &str) -> PathBuf {
        self.realm_dir(realm).join("realm.json")
    }

    pub fn space_dir(&self, realm: &str, space: &str) -> PathBuf {
        self.realm_dir(realm).join(space)
    }

    pub fn space_file(&self, realm: &str, space: &str) -> PathBuf {
        self.space_dir(realm, space).join("space.json")
    }

    pub fn stack_dir(&self, realm: &str, space: &str, stack: &str) -> PathBuf {
        self.space_dir(realm, space).join(stack)
    }

    pub fn stack_file(&self, realm: &str, space: &str, stack: &str) -> PathBuf {
        self.stack_dir(realm, space, stack).join("stack.json")
    }

    pub fn cell_dir(&self, realm: &str, space: &str, stack: &str, cell: &str) -> PathBuf {
        self.stack_dir(realm, space, stack).join(cell)
    }

    pub fn cell_file(&self, realm: &str, space: &str, stack: &str, cell: &str) -> PathBuf {
        self.cell_dir(realm, space, stack, cell).join("cell.json")
    }

    pub fn read<T: DeserializeOwned>(&self, path: &Path) -> StoreResult<Option<T>> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Parse { path: path.to_path_buf(), source }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path: path.to_path_buf(), source }),
        }
    }

    pub fn write<T: Serialize>(&self, path: &Path, value: &T) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|source| StoreError::Parse { path: path.to_path_buf(), source })?;
        // Write-then-rename gives the cell writer an atomic, all-or-nothing
        // replace of the container set in one call (`SPEC_FULL.md` §5).
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, path).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
    }

    /// Removes the entity file and, if its directory is now empty of
    /// anything but stray children directories, leaves those intact (a
    /// realm's directory is not removed just because `realm.json` was,
    /// since spaces may still live under it).
    pub fn remove(&self, path: &Path) -> StoreResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path: path.to_path_buf(), source }),
        }
    }

    /// Child directory names directly under `dir`, skipping dotfiles and
    /// anything that isn't a directory (so a sibling `*.json` entity file
    /// doesn't get mistaken for a child).
    pub fn list_child_dirs(&self, dir: &Path) -> StoreResult<Vec<String>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path: dir.to_path_buf(), source }),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;
            let file_type = entry
                .file_type()
                .map_err(|source| StoreError::Io { path: entry.path(), source })?;
            if file_type.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
