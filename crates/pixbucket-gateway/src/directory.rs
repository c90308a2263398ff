use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use pixbucket_types::RemoteHandle;

use crate::config::DirectoryGatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::traits::{mint_handle, Gateway};

/// Gateway that keeps images as PNG files in a local directory.
///
/// Layout under the configured root:
/// ```text
/// images/<remote_id>.png
/// tokens/<delete_token>     (file contents: remote_id)
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryGateway {
    config: DirectoryGatewayConfig,
}

impl DirectoryGateway {
    /// Open a gateway rooted at `config.root`, creating the layout if needed.
    pub async fn open(config: DirectoryGatewayConfig) -> GatewayResult<Self> {
        tokio::fs::create_dir_all(config.root.join("images")).await?;
        tokio::fs::create_dir_all(config.root.join("tokens")).await?;
        tracing::debug!(root = %config.root.display(), "opened directory gateway");
        Ok(Self { config })
    }

    pub fn config(&self) -> &DirectoryGatewayConfig {
        &self.config
    }

    /// Path of the image stored under `remote_id`.
    pub fn image_path(&self, remote_id: &str) -> PathBuf {
        self.config.root.join("images").join(format!("{remote_id}.png"))
    }

    fn token_path(&self, delete_token: &str) -> PathBuf {
        self.config.root.join("tokens").join(delete_token)
    }

    async fn with_deadline<T, F>(&self, fut: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        match self.config.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| GatewayError::Timeout(limit))?,
            None => fut.await,
        }
    }

    async fn store(&self, image: Bytes) -> GatewayResult<RemoteHandle> {
        let handle = mint_handle();
        // Token first: a token without an image still deletes cleanly.
        let token_path = self.token_path(&handle.delete_token);
        tokio::fs::write(&token_path, handle.remote_id.as_bytes()).await?;
        if let Err(e) = tokio::fs::write(self.image_path(&handle.remote_id), &image).await {
            if let Err(cleanup) = tokio::fs::remove_file(&token_path).await {
                tracing::warn!(error = %cleanup, "failed to remove token of unstored image");
            }
            return Err(e.into());
        }
        Ok(handle)
    }

    async fn fetch(&self, remote_id: &str) -> GatewayResult<Bytes> {
        match tokio::fs::read(self.image_path(remote_id)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(GatewayError::NotFound(remote_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn discard(&self, delete_token: &str) -> GatewayResult<()> {
        let token_path = self.token_path(delete_token);
        let remote_id = match tokio::fs::read_to_string(&token_path).await {
            Ok(id) => id,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GatewayError::NotFound("unknown delete token".into()));
            }
            Err(e) => return Err(e.into()),
        };
        if !is_safe_key(&remote_id) {
            return Err(GatewayError::Transport(format!(
                "token file {} is damaged",
                token_path.display()
            )));
        }

        match tokio::fs::remove_file(self.image_path(&remote_id)).await {
            Ok(()) => {}
            // Image already gone; still retire the token.
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::remove_file(&token_path).await?;
        Ok(())
    }
}

#[async_trait]
impl Gateway for DirectoryGateway {
    async fn upload(&self, image: Bytes) -> GatewayResult<RemoteHandle> {
        let size = image.len() as u64;
        if size > self.config.max_image_bytes {
            return Err(GatewayError::Rejected(format!(
                "image of {size} bytes exceeds limit of {}",
                self.config.max_image_bytes
            )));
        }
        let handle = self.with_deadline(self.store(image)).await?;
        tracing::debug!(remote_id = %handle.remote_id, size, "stored image");
        Ok(handle)
    }

    async fn download(&self, remote_id: &str) -> GatewayResult<Bytes> {
        if !is_safe_key(remote_id) {
            return Err(GatewayError::NotFound(remote_id.to_string()));
        }
        self.with_deadline(self.fetch(remote_id)).await
    }

    async fn delete(&self, delete_token: &str) -> GatewayResult<()> {
        if !is_safe_key(delete_token) {
            return Err(GatewayError::NotFound("unknown delete token".into()));
        }
        self.with_deadline(self.discard(delete_token)).await?;
        tracing::debug!("deleted image");
        Ok(())
    }
}

/// Ids and tokens are minted as ASCII alphanumerics; anything else could
/// escape the root directory.
fn is_safe_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= 128 && key.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn gateway(dir: &tempfile::TempDir) -> DirectoryGateway {
        DirectoryGateway::open(DirectoryGatewayConfig::new(dir.path()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested/remote");
        DirectoryGateway::open(DirectoryGatewayConfig::new(&root))
            .await
            .unwrap();
        assert!(root.join("images").is_dir());
        assert!(root.join("tokens").is_dir());
    }

    #[tokio::test]
    async fn upload_writes_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir).await;

        let handle = gw.upload(Bytes::from_static(b"\x89PNG fake")).await.unwrap();
        let on_disk = std::fs::read(gw.image_path(&handle.remote_id)).unwrap();
        assert_eq!(on_disk, b"\x89PNG fake");

        let data = gw.download(&handle.remote_id).await.unwrap();
        assert_eq!(&data[..], b"\x89PNG fake");
    }

    #[tokio::test]
    async fn delete_removes_image_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir).await;

        let handle = gw.upload(Bytes::from_static(b"img")).await.unwrap();
        gw.delete(&handle.delete_token).await.unwrap();
        assert!(!gw.image_path(&handle.remote_id).exists());

        let again = gw.delete(&handle.delete_token).await.unwrap_err();
        assert!(matches!(again, GatewayError::NotFound(_)));
        let gone = gw.download(&handle.remote_id).await.unwrap_err();
        assert!(matches!(gone, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_image_write_leaves_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir).await;
        std::fs::remove_dir(dir.path().join("images")).unwrap();
        std::fs::write(dir.path().join("images"), b"not a directory").unwrap();

        assert!(gw.upload(Bytes::from_static(b"img")).await.is_err());
        let tokens = std::fs::read_dir(dir.path().join("tokens")).unwrap().count();
        assert_eq!(tokens, 0);
    }

    #[tokio::test]
    async fn token_without_image_still_deletes() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir).await;
        let handle = gw.upload(Bytes::from_static(b"img")).await.unwrap();
        std::fs::remove_file(gw.image_path(&handle.remote_id)).unwrap();

        gw.delete(&handle.delete_token).await.unwrap();
        assert!(!dir.path().join("tokens").join(&handle.delete_token).exists());
    }

    #[tokio::test]
    async fn oversized_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = DirectoryGatewayConfig {
            max_image_bytes: 8,
            ..DirectoryGatewayConfig::new(dir.path())
        };
        let gw = DirectoryGateway::open(config).await.unwrap();

        let err = gw.upload(Bytes::from(vec![0u8; 9])).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
        assert!(gw.upload(Bytes::from(vec![0u8; 8])).await.is_ok());
    }

    #[tokio::test]
    async fn path_like_keys_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(&dir).await;

        for key in ["../secret", "", "a/b", "x.png"] {
            assert!(matches!(
                gw.download(key).await.unwrap_err(),
                GatewayError::NotFound(_)
            ));
            assert!(matches!(
                gw.delete(key).await.unwrap_err(),
                GatewayError::NotFound(_)
            ));
        }
    }

    #[tokio::test]
    async fn handles_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let handle = {
            let gw = gateway(&dir).await;
            gw.upload(Bytes::from_static(b"persisted")).await.unwrap()
        };
        let gw = gateway(&dir).await;
        assert_eq!(&gw.download(&handle.remote_id).await.unwrap()[..], b"persisted");
        gw.delete(&handle.delete_token).await.unwrap();
    }

    #[test]
    fn safe_keys() {
        assert!(is_safe_key("abc123"));
        assert!(!is_safe_key("abc-123"));
        assert!(!is_safe_key(".."));
        assert!(!is_safe_key(&"a".repeat(129)));
    }
}
