//! File-based artifact store.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{JobCheckError, Result};
use crate::storage::traits::{ArtifactStore, not_found, validate_batch, validate_key};

/// Stores one file per key in a directory.
///
/// Writes go to a hidden temporary file that is synced and then renamed over
/// the destination, so readers see either the old blob or the new one.
///
/// Batches stage every blob before the first rename. Replaced files are kept
/// as hidden backups until the whole batch is in place and restored if any
/// rename fails.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    directory: PathBuf,
}

impl FileArtifactStore {
    /// Create a store in `directory`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            fs::create_dir_all(&directory).map_err(|e| {
                JobCheckError::artifact(format!(
                    "failed to create directory {}: {e}",
                    directory.display()
                ))
            })?;
        }

        Self::open(directory)
    }

    /// Open a store in an existing directory.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !directory.is_dir() {
            return Err(JobCheckError::artifact(format!(
                "artifact directory {} does not exist",
                directory.display()
            )));
        }
        Ok(FileArtifactStore { directory })
    }

    /// The backing directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!(".{key}.{}.tmp", std::process::id()))
    }

    fn backup_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!(".{key}.{}.bak", std::process::id()))
    }

    /// Move the staged file for `key` into place, backing up the old blob.
    fn swap_in(&self, key: &str, temp: &Path) -> std::io::Result<Option<PathBuf>> {
        let destination = self.path(key);
        let backup = if destination.is_file() {
            let backup = self.backup_path(key);
            fs::rename(&destination, &backup)?;
            Some(backup)
        } else {
            None
        };

        if let Err(e) = fs::rename(temp, &destination) {
            if let Some(backup) = &backup {
                let _ = fs::rename(backup, &destination);
            }
            return Err(e);
        }
        Ok(backup)
    }

    /// Undo swapped-in keys, newest first.
    fn roll_back(&self, committed: &[(&str, Option<PathBuf>)]) {
        for (key, backup) in committed.iter().rev() {
            let destination = self.path(key);
            let _ = fs::remove_file(&destination);
            if let Some(backup) = backup {
                if let Err(e) = fs::rename(backup, &destination) {
                    warn!("Failed to restore artifact '{}': {}", key, e);
                }
            }
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl ArtifactStore for FileArtifactStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        validate_key(key)?;
        fs::read(self.path(key)).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                not_found(key)
            } else {
                JobCheckError::Io(e)
            }
        })
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        validate_key(key)?;
        let temp = self.temp_path(key);

        let written = write_synced(&temp, bytes).and_then(|()| fs::rename(&temp, self.path(key)));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(JobCheckError::artifact(format!("failed to write '{key}': {e}")));
        }

        debug!("Wrote artifact '{}' ({} bytes)", key, bytes.len());
        Ok(())
    }

    fn put_all(&self, entries: &[(&str, &[u8])]) -> Result<()> {
        validate_batch(entries)?;

        let mut staged: Vec<(&str, PathBuf)> = Vec::with_capacity(entries.len());
        for (key, bytes) in entries {
            let temp = self.temp_path(key);
            if let Err(e) = write_synced(&temp, bytes) {
                let _ = fs::remove_file(&temp);
                for (_, temp) in &staged {
                    let _ = fs::remove_file(temp);
                }
                return Err(JobCheckError::artifact(format!("failed to stage '{key}': {e}")));
            }
            staged.push((*key, temp));
        }

        let mut committed: Vec<(&str, Option<PathBuf>)> = Vec::with_capacity(staged.len());
        for (i, (key, temp)) in staged.iter().enumerate() {
            match self.swap_in(key, temp) {
                Ok(backup) => committed.push((*key, backup)),
                Err(e) => {
                    self.roll_back(&committed);
                    for (_, temp) in &staged[i..] {
                        let _ = fs::remove_file(temp);
                    }
                    return Err(JobCheckError::artifact(format!(
                        "failed to commit '{key}', batch rolled back: {e}"
                    )));
                }
            }
        }

        for (_, backup) in &committed {
            if let Some(backup) = backup {
                let _ = fs::remove_file(backup);
            }
        }
        debug!("Committed {} artifacts", committed.len());
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        validate_key(key).is_ok() && self.path(key).is_file()
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !name.starts_with('.') {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
