//! The [`IndexStore`] trait defining durable index storage.

use crate::error::IndexResult;
use crate::record::IndexRecord;

/// Durable storage for one index blob per bucket.
///
/// Implementations must be thread-safe (`Send + Sync`). A `save` replaces the
/// previous blob for the bucket atomically: readers see either the old blob or
/// the new one, never a mix.
pub trait IndexStore: Send + Sync {
    /// Store `blob` as the index of `bucket`, replacing any previous one.
    fn save(&self, bucket: &str, blob: &[u8]) -> IndexResult<()>;

    /// Read the index of `bucket`.
    ///
    /// Returns `Ok(None)` if nothing was ever saved for it.
    fn load(&self, bucket: &str) -> IndexResult<Option<Vec<u8>>>;

    /// Remove the index of `bucket`.
    ///
    /// Returns `Ok(true)` if it existed, `Ok(false)` otherwise.
    fn remove(&self, bucket: &str) -> IndexResult<bool>;

    /// Names of all buckets with a saved index, sorted.
    fn list(&self) -> IndexResult<Vec<String>>;

    fn contains(&self, bucket: &str) -> IndexResult<bool> {
        Ok(self.load(bucket)?.is_some())
    }

    /// Encode and save a record under its own bucket name.
    fn save_record(&self, record: &IndexRecord) -> IndexResult<()> {
        self.save(&record.bucket, &record.encode()?)
    }

    /// Load and decode the record of `bucket`.
    fn load_record(&self, bucket: &str) -> IndexResult<Option<IndexRecord>> {
        match self.load(bucket)? {
            Some(blob) => Ok(Some(IndexRecord::decode_for(bucket, &blob)?)),
            None => Ok(None),
        }
    }
}
