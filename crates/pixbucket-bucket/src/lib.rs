//! Named-object buckets stored as images on a remote host.
//!
//! A [`Bucket`] stages values locally, uploads them concurrently as PNG
//! images through a [`Gateway`](pixbucket_gateway::Gateway), and records
//! where each one lives in a durable index
//! ([`IndexStore`](pixbucket_index::IndexStore)).
//!
//! ```no_run
//! use std::sync::Arc;
//! use pixbucket_bucket::{Backend, Bucket};
//! use pixbucket_gateway::InMemoryGateway;
//! use pixbucket_index::InMemoryIndexStore;
//! use pixbucket_types::Value;
//!
//! # async fn demo() -> pixbucket_bucket::BucketResult<()> {
//! let backend = Backend::new(
//!     Arc::new(InMemoryGateway::new()),
//!     Arc::new(InMemoryIndexStore::new()),
//! );
//! let mut bucket: Bucket = Bucket::create(backend)?;
//! bucket.stage("greeting", "hello")?;
//! bucket.commit().await?;
//! assert_eq!(bucket.get("greeting").await?, Value::from("hello"));
//! # Ok(())
//! # }
//! ```

mod batch;
pub mod bucket;
pub mod error;
mod object;

pub use bucket::{random_bucket_name, Backend, Bucket};
pub use error::{BatchFailure, BatchOperation, BucketError, BucketResult};
