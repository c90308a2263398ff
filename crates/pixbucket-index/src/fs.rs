use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use pixbucket_types::validate_bucket_name;

use crate::error::{IndexError, IndexResult};
use crate::traits::IndexStore;

const INDEX_EXTENSION: &str = "idx";

/// Settings for [`FsIndexStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsIndexConfig {
    /// Directory holding one `<bucket>.idx` file per bucket.
    pub root: PathBuf,
}

impl Default for FsIndexConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".pixbucket/index"),
        }
    }
}

/// Index store keeping one file per bucket in a directory.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a crash mid-save leaves the previous index intact.
#[derive(Clone, Debug)]
pub struct FsIndexStore {
    root: PathBuf,
}

impl FsIndexStore {
    /// Open a store rooted at `config.root`, creating the directory if needed.
    pub fn open(config: FsIndexConfig) -> IndexResult<Self> {
        fs::create_dir_all(&config.root)?;
        Ok(Self { root: config.root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the index file for `bucket`.
    pub fn path_for(&self, bucket: &str) -> PathBuf {
        self.root.join(format!("{bucket}.{INDEX_EXTENSION}"))
    }
}

impl IndexStore for FsIndexStore {
    fn save(&self, bucket: &str, blob: &[u8]) -> IndexResult<()> {
        validate_bucket_name(bucket)?;
        let target = self.path_for(bucket);

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(blob)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| IndexError::Io(e.error))?;

        debug!(bucket, bytes = blob.len(), "saved index");
        Ok(())
    }

    fn load(&self, bucket: &str) -> IndexResult<Option<Vec<u8>>> {
        validate_bucket_name(bucket)?;
        match fs::read(self.path_for(bucket)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, bucket: &str) -> IndexResult<bool> {
        validate_bucket_name(bucket)?;
        match fs::remove_file(self.path_for(bucket)) {
            Ok(()) => {
                debug!(bucket, "removed index");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> IndexResult<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(INDEX_EXTENSION) {
                continue;
            }
            // Leftover temp files and foreign files are skipped.
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_bucket_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
