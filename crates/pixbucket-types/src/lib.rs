//! Foundation types for pixbucket.
//!
//! Every other pixbucket crate depends on `pixbucket-types`.
//!
//! # Key Types
//!
//! - [`Value`]: Closed, arbitrarily nested structured datum stored in buckets
//! - [`RemoteHandle`]: Remote identifier plus deletion token for an uploaded image
//! - [`names`]: Validation rules for object and bucket names

pub mod error;
pub mod names;
pub mod remote;
pub mod value;

pub use error::TypeError;
pub use names::{validate_bucket_name, validate_object_name};
pub use remote::RemoteHandle;
pub use value::Value;
