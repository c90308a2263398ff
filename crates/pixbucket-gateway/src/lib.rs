//! Remote image host abstraction for pixbucket.
//!
//! A [`Gateway`] stores opaque image blobs and hands back a
//! [`RemoteHandle`](pixbucket_types::RemoteHandle) for each one. Two
//! implementations ship here: [`InMemoryGateway`] for tests and embedding,
//! and [`DirectoryGateway`], which keeps PNG files in a local directory.

pub mod config;
pub mod directory;
pub mod error;
pub mod memory;
pub mod traits;

pub use config::DirectoryGatewayConfig;
pub use directory::DirectoryGateway;
pub use error::{GatewayError, GatewayResult};
pub use memory::InMemoryGateway;
pub use traits::Gateway;
