//! The persisted index record and its binary encoding.
//!
//! On-disk format:
//! ```text
//! zstd(bincode(IndexRecord { version, bucket, entries }))
//! ```
//! `version` is the first field so it can be read before the rest of the
//! record is trusted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use pixbucket_codec::{compress, decompress};
use pixbucket_types::RemoteHandle;

use crate::error::{IndexError, IndexResult};

/// Current index format revision.
pub const INDEX_VERSION: u32 = 1;

const COMPRESSION_LEVEL: i32 = 3;

/// One uploaded object as recorded in the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub remote_id: String,
    pub delete_token: String,
}

impl IndexEntry {
    pub fn new(name: impl Into<String>, handle: &RemoteHandle) -> Self {
        Self {
            name: name.into(),
            remote_id: handle.remote_id.clone(),
            delete_token: handle.delete_token.clone(),
        }
    }

    pub fn handle(&self) -> RemoteHandle {
        RemoteHandle::new(self.remote_id.clone(), self.delete_token.clone())
    }
}

/// Everything needed to reopen a bucket: its name and where each uploaded
/// object lives. Cached values and staged objects are never part of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub version: u32,
    pub bucket: String,
    /// Sorted by name, names unique.
    pub entries: Vec<IndexEntry>,
}

impl IndexRecord {
    /// Build a record at the current version, sorting entries by name.
    pub fn new(bucket: impl Into<String>, entries: impl IntoIterator<Item = IndexEntry>) -> Self {
        let mut entries: Vec<IndexEntry> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            version: INDEX_VERSION,
            bucket: bucket.into(),
            entries,
        }
    }

    /// An index with no uploaded objects.
    pub fn empty(bucket: impl Into<String>) -> Self {
        Self::new(bucket, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `name`, if recorded.
    pub fn get(&self, name: &str) -> Option<&IndexEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.entries[i])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Serialize and compress the record.
    pub fn encode(&self) -> IndexResult<Vec<u8>> {
        let raw = bincode::serialize(self).map_err(|e| IndexError::Serialization(e.to_string()))?;
        compress(&raw, COMPRESSION_LEVEL).map_err(|e| IndexError::Serialization(e.to_string()))
    }

    /// Decode a blob produced by [`Self::encode`].
    pub fn decode(blob: &[u8]) -> IndexResult<Self> {
        let raw = decompress(blob).map_err(|e| IndexError::Corrupt(e.to_string()))?;

        let version: u32 = bincode::deserialize(&raw)
            .map_err(|e| IndexError::Corrupt(format!("missing version: {e}")))?;
        if version != INDEX_VERSION {
            return Err(IndexError::UnsupportedVersion(version));
        }

        let record: IndexRecord =
            bincode::deserialize(&raw).map_err(|e| IndexError::Corrupt(e.to_string()))?;

        let mut seen = HashSet::with_capacity(record.entries.len());
        if let Some(dup) = record.entries.iter().find(|e| !seen.insert(e.name.as_str())) {
            return Err(IndexError::Corrupt(format!("duplicate entry {:?}", dup.name)));
        }
        if !record.entries.windows(2).all(|w| w[0].name < w[1].name) {
            return Err(IndexError::Corrupt("entries out of order".into()));
        }
        Ok(record)
    }

    /// Decode a blob and check that it belongs to `bucket`.
    pub fn decode_for(bucket: &str, blob: &[u8]) -> IndexResult<Self> {
        let record = Self::decode(blob)?;
        if record.bucket != bucket {
            return Err(IndexError::BucketMismatch {
                expected: bucket.to_string(),
                found: record.bucket,
            });
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> IndexEntry {
        IndexEntry::new(name, &RemoteHandle::new(format!("id-{name}"), format!("tok-{name}")))
    }

    #[test]
    fn new_sorts_entries() {
        let record = IndexRecord::new("b", vec![entry("c"), entry("a"), entry("b")]);
        let names: Vec<&str> = record.names().collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(record.version, INDEX_VERSION);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let record = IndexRecord::new("photos", vec![entry("x"), entry("y")]);
        let blob = record.encode().unwrap();
        assert_eq!(IndexRecord::decode(&blob).unwrap(), record);
    }

    #[test]
    fn get_by_name() {
        let record = IndexRecord::new("b", vec![entry("one"), entry("two")]);
        assert_eq!(record.get("two").unwrap().handle().remote_id, "id-two");
        assert!(record.get("three").is_none());
    }

    #[test]
    fn empty_record_roundtrip() {
        let record = IndexRecord::empty("b");
        assert!(record.is_empty());
        let blob = record.encode().unwrap();
        assert_eq!(IndexRecord::decode(&blob).unwrap().len(), 0);
    }

    #[test]
    fn unknown_version_rejected() {
        let mut record = IndexRecord::empty("b");
        record.version = 7;
        let blob = record.encode().unwrap();
        let err = IndexRecord::decode(&blob).unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedVersion(7)));
    }

    #[test]
    fn bucket_mismatch_rejected() {
        let blob = IndexRecord::empty("alpha").encode().unwrap();
        match IndexRecord::decode_for("beta", &blob).unwrap_err() {
            IndexError::BucketMismatch { expected, found } => {
                assert_eq!(expected, "beta");
                assert_eq!(found, "alpha");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = IndexRecord::decode(b"not an index").unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn duplicate_names_are_corrupt() {
        let record = IndexRecord {
            version: INDEX_VERSION,
            bucket: "b".into(),
            entries: vec![entry("a"), entry("a")],
        };
        let blob = record.encode().unwrap();
        assert!(matches!(
            IndexRecord::decode(&blob).unwrap_err(),
            IndexError::Corrupt(_)
        ));
    }
}
