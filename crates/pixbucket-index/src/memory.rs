use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use pixbucket_types::validate_bucket_name;

use crate::error::{IndexError, IndexResult};
use crate::traits::IndexStore;

/// In-memory, HashMap-based index store.
///
/// Useful for testing and ephemeral buckets. Saves can be made to fail on
/// demand to exercise persistence error paths.
pub struct InMemoryIndexStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryIndexStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            fail_saves: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    /// Make every following `save` fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of `save` calls received, including failed ones.
    pub fn save_calls(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryIndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore for InMemoryIndexStore {
    fn save(&self, bucket: &str, blob: &[u8]) -> IndexResult<()> {
        validate_bucket_name(bucket)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(IndexError::Io(io::Error::new(
                io::ErrorKind::Other,
                "index store unavailable",
            )));
        }
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(bucket.to_string(), blob.to_vec());
        Ok(())
    }

    fn load(&self, bucket: &str) -> IndexResult<Option<Vec<u8>>> {
        validate_bucket_name(bucket)?;
        Ok(self.blobs.read().expect("lock poisoned").get(bucket).cloned())
    }

    fn remove(&self, bucket: &str) -> IndexResult<bool> {
        validate_bucket_name(bucket)?;
        Ok(self
            .blobs
            .write()
            .expect("lock poisoned")
            .remove(bucket)
            .is_some())
    }

    fn list(&self) -> IndexResult<Vec<String>> {
        let mut names: Vec<String> = self
            .blobs
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for InMemoryIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIndexStore")
            .field("bucket_count", &self.len())
            .finish()
    }
}
