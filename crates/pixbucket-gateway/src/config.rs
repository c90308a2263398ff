use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for [`crate::DirectoryGateway`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryGatewayConfig {
    /// Directory that holds `images/` and `tokens/`.
    pub root: PathBuf,
    /// Uploads larger than this are rejected.
    pub max_image_bytes: u64,
    /// Per-call deadline in milliseconds; `None` waits indefinitely.
    pub request_timeout_ms: Option<u64>,
}

impl DirectoryGatewayConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for DirectoryGatewayConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".pixbucket/remote"),
            max_image_bytes: 20 * 1024 * 1024,
            request_timeout_ms: Some(30_000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = DirectoryGatewayConfig::default();
        assert_eq!(c.root, PathBuf::from(".pixbucket/remote"));
        assert_eq!(c.max_image_bytes, 20 * 1024 * 1024);
        assert_eq!(c.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn new_keeps_other_defaults() {
        let c = DirectoryGatewayConfig::new("/tmp/images");
        assert_eq!(c.root, PathBuf::from("/tmp/images"));
        assert_eq!(c.max_image_bytes, DirectoryGatewayConfig::default().max_image_bytes);
    }

    #[test]
    fn no_timeout() {
        let c = DirectoryGatewayConfig {
            request_timeout_ms: None,
            ..DirectoryGatewayConfig::default()
        };
        assert!(c.request_timeout().is_none());
    }
}
