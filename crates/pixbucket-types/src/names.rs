//! Name validation for objects and buckets.
//!
//! Object names are free-form labels chosen by the caller. They only need to
//! be non-empty, bounded, and printable.
//!
//! Bucket names double as file names for the local index, so they are held
//! to a stricter alphabet:
//! - Must be non-empty and at most [`MAX_BUCKET_NAME_LEN`] bytes
//! - Only ASCII letters, digits, `-`, `_`, and `.`
//! - Must not start with `.` or `-`

use crate::error::TypeError;

/// Longest accepted object name, in bytes.
pub const MAX_OBJECT_NAME_LEN: usize = 1024;

/// Longest accepted bucket name, in bytes.
pub const MAX_BUCKET_NAME_LEN: usize = 128;

/// Validate an object name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use pixbucket_types::names::validate_object_name;
///
/// assert!(validate_object_name("my-object").is_ok());
/// assert!(validate_object_name("reports/2024 q1.json").is_ok());
/// assert!(validate_object_name("").is_err());
/// ```
pub fn validate_object_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidObjectName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("object name must not be empty"));
    }
    if name.len() > MAX_OBJECT_NAME_LEN {
        return Err(invalid(&format!(
            "longer than {MAX_OBJECT_NAME_LEN} bytes"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("contains a control character"));
    }
    Ok(())
}

/// Validate a bucket name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use pixbucket_types::names::validate_bucket_name;
///
/// assert!(validate_bucket_name("my-is3-bucket").is_ok());
/// assert!(validate_bucket_name("../etc").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: String| TypeError::InvalidBucketName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("bucket name must not be empty".into()));
    }
    if name.len() > MAX_BUCKET_NAME_LEN {
        return Err(invalid(format!("longer than {MAX_BUCKET_NAME_LEN} bytes")));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return Err(invalid("must not start with '.' or '-'".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_accept_free_text() {
        assert!(validate_object_name("a").is_ok());
        assert!(validate_object_name("with spaces and / slashes").is_ok());
        assert!(validate_object_name("ünïcødé").is_ok());
    }

    #[test]
    fn object_name_empty_rejected() {
        let err = validate_object_name("").unwrap_err();
        assert!(matches!(err, TypeError::InvalidObjectName { .. }));
    }

    #[test]
    fn object_name_control_char_rejected() {
        assert!(validate_object_name("line\nbreak").is_err());
        assert!(validate_object_name("nul\0").is_err());
    }

    #[test]
    fn object_name_too_long_rejected() {
        let long = "x".repeat(MAX_OBJECT_NAME_LEN + 1);
        assert!(validate_object_name(&long).is_err());
        let max = "x".repeat(MAX_OBJECT_NAME_LEN);
        assert!(validate_object_name(&max).is_ok());
    }

    #[test]
    fn bucket_names_valid() {
        assert!(validate_bucket_name("my-is3-bucket").is_ok());
        assert!(validate_bucket_name("AbCdEf").is_ok());
        assert!(validate_bucket_name("v1.2_data").is_ok());
    }

    #[test]
    fn bucket_name_path_traversal_rejected() {
        assert!(validate_bucket_name("../etc").is_err());
        assert!(validate_bucket_name("a/b").is_err());
        assert!(validate_bucket_name(".hidden").is_err());
        assert!(validate_bucket_name("-flag").is_err());
    }

    #[test]
    fn bucket_name_empty_or_long_rejected() {
        assert!(validate_bucket_name("").is_err());
        let long = "b".repeat(MAX_BUCKET_NAME_LEN + 1);
        assert!(validate_bucket_name(&long).is_err());
    }

    #[test]
    fn bucket_name_whitespace_rejected() {
        let err = validate_bucket_name("has space").unwrap_err();
        match err {
            TypeError::InvalidBucketName { reason, .. } => {
                assert!(reason.contains("forbidden character"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
