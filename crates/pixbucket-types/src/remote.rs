use serde::{Deserialize, Serialize};

/// Where an uploaded image lives and how to get rid of it.
///
/// Both halves are opaque strings minted by the gateway. The `delete_token`
/// is a capability: anyone holding it can remove the image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteHandle {
    /// Identifier used to download the image.
    pub remote_id: String,
    /// Token used to delete the image.
    pub delete_token: String,
}

impl RemoteHandle {
    pub fn new(remote_id: impl Into<String>, delete_token: impl Into<String>) -> Self {
        Self {
            remote_id: remote_id.into(),
            delete_token: delete_token.into(),
        }
    }
}

impl std::fmt::Display for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.remote_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_remote_id_only() {
        let handle = RemoteHandle::new("abc123", "secret-token");
        assert_eq!(handle.to_string(), "abc123");
    }
}
