//! Durable local index for pixbucket buckets.
//!
//! A bucket's index records, for every uploaded object, the remote id and
//! delete token needed to fetch or remove it. It is the only durable state a
//! bucket has on the local side.
//!
//! # Key Types
//!
//! - [`IndexRecord`]: Versioned, name-sorted list of [`IndexEntry`] values
//! - [`IndexStore`]: Blob storage keyed by bucket name
//! - [`InMemoryIndexStore`] / [`FsIndexStore`]: Backends

pub mod error;
pub mod fs;
pub mod memory;
pub mod record;
pub mod traits;

pub use error::{IndexError, IndexResult};
pub use fs::{FsIndexConfig, FsIndexStore};
pub use memory::InMemoryIndexStore;
pub use record::{IndexEntry, IndexRecord, INDEX_VERSION};
pub use traits::IndexStore;
