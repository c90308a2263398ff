use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pixbucket_types::RemoteHandle;

use crate::error::{GatewayError, GatewayResult};
use crate::traits::{mint_handle, Gateway};

type UploadFilter = Box<dyn Fn(&[u8]) -> bool + Send + Sync>;

#[derive(Default)]
struct Faults {
    upload: Option<UploadFilter>,
    downloads: HashSet<String>,
    deletes: HashSet<String>,
}

/// In-memory, HashMap-based gateway.
///
/// Intended for tests and embedding. Counts every call it receives and can be
/// told to fail specific uploads, downloads, or deletes.
pub struct InMemoryGateway {
    images: RwLock<HashMap<String, Bytes>>,
    tokens: RwLock<HashMap<String, String>>,
    faults: RwLock<Faults>,
    latency: Option<Duration>,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
    deletes: AtomicUsize,
}

impl InMemoryGateway {
    /// Create a new empty gateway.
    pub fn new() -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            faults: RwLock::new(Faults::default()),
            latency: None,
            uploads: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Delay every call by `latency` before it does any work.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reject every upload whose payload satisfies `filter`.
    pub fn fail_uploads_where<F>(&self, filter: F)
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.faults.write().expect("lock poisoned").upload = Some(Box::new(filter));
    }

    /// Reject downloads of `remote_id`.
    pub fn fail_download(&self, remote_id: impl Into<String>) {
        self.faults
            .write()
            .expect("lock poisoned")
            .downloads
            .insert(remote_id.into());
    }

    /// Reject deletes that present `delete_token`.
    pub fn fail_delete(&self, delete_token: impl Into<String>) {
        self.faults
            .write()
            .expect("lock poisoned")
            .deletes
            .insert(delete_token.into());
    }

    /// Drop every injected fault.
    pub fn clear_faults(&self) {
        *self.faults.write().expect("lock poisoned") = Faults::default();
    }

    /// Number of upload calls received, including failed ones.
    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Number of download calls received, including failed ones.
    pub fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    /// Number of delete calls received, including failed ones.
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.upload_calls() + self.download_calls() + self.delete_calls()
    }

    /// Number of images currently stored.
    pub fn len(&self) -> usize {
        self.images.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no images are stored.
    pub fn is_empty(&self) -> bool {
        self.images.read().expect("lock poisoned").is_empty()
    }

    /// Whether an image exists under `remote_id`.
    pub fn contains(&self, remote_id: &str) -> bool {
        self.images
            .read()
            .expect("lock poisoned")
            .contains_key(remote_id)
    }

    /// Replace the stored bytes of an image, e.g. to simulate corruption.
    pub fn overwrite(&self, remote_id: &str, image: Bytes) -> bool {
        let mut images = self.images.write().expect("lock poisoned");
        match images.get_mut(remote_id) {
            Some(slot) => {
                *slot = image;
                true
            }
            None => false,
        }
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn upload(&self, image: Bytes) -> GatewayResult<RemoteHandle> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let refused = {
            let faults = self.faults.read().expect("lock poisoned");
            faults.upload.as_ref().is_some_and(|f| f(&image[..]))
        };
        if refused {
            return Err(GatewayError::Rejected("upload refused".into()));
        }

        let handle = mint_handle();
        self.images
            .write()
            .expect("lock poisoned")
            .insert(handle.remote_id.clone(), image);
        self.tokens
            .write()
            .expect("lock poisoned")
            .insert(handle.delete_token.clone(), handle.remote_id.clone());
        Ok(handle)
    }

    async fn download(&self, remote_id: &str) -> GatewayResult<Bytes> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self
            .faults
            .read()
            .expect("lock poisoned")
            .downloads
            .contains(remote_id)
        {
            return Err(GatewayError::Transport(format!("download of {remote_id} failed")));
        }

        self.images
            .read()
            .expect("lock poisoned")
            .get(remote_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(remote_id.to_string()))
    }

    async fn delete(&self, delete_token: &str) -> GatewayResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self
            .faults
            .read()
            .expect("lock poisoned")
            .deletes
            .contains(delete_token)
        {
            return Err(GatewayError::Transport("delete failed".into()));
        }

        let remote_id = self
            .tokens
            .write()
            .expect("lock poisoned")
            .remove(delete_token)
            .ok_or_else(|| GatewayError::NotFound("unknown delete token".into()))?;
        self.images.write().expect("lock poisoned").remove(&remote_id);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGateway")
            .field("image_count", &self.len())
            .field("latency", &self.latency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_download_roundtrip() {
        let gw = InMemoryGateway::new();
        let handle = gw.upload(Bytes::from_static(b"png bytes")).await.unwrap();
        assert!(gw.contains(&handle.remote_id));

        let data = gw.download(&handle.remote_id).await.unwrap();
        assert_eq!(&data[..], b"png bytes");
        assert_eq!(gw.upload_calls(), 1);
        assert_eq!(gw.download_calls(), 1);
    }

    #[tokio::test]
    async fn delete_removes_image() {
        let gw = InMemoryGateway::new();
        let handle = gw.upload(Bytes::from_static(b"x")).await.unwrap();
        gw.delete(&handle.delete_token).await.unwrap();
        assert!(gw.is_empty());

        let err = gw.download(&handle.remote_id).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_with_unknown_token() {
        let gw = InMemoryGateway::new();
        let err = gw.delete("nope").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
        assert_eq!(gw.delete_calls(), 1);
    }

    #[tokio::test]
    async fn upload_filter_rejects_matching_payloads() {
        let gw = InMemoryGateway::new();
        gw.fail_uploads_where(|data| data.starts_with(b"bad"));

        assert!(gw.upload(Bytes::from_static(b"good")).await.is_ok());
        let err = gw.upload(Bytes::from_static(b"bad one")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
        assert_eq!(gw.len(), 1);
        assert_eq!(gw.upload_calls(), 2);

        gw.clear_faults();
        assert!(gw.upload(Bytes::from_static(b"bad again")).await.is_ok());
    }

    #[tokio::test]
    async fn injected_download_and_delete_faults() {
        let gw = InMemoryGateway::new();
        let handle = gw.upload(Bytes::from_static(b"x")).await.unwrap();
        gw.fail_download(handle.remote_id.clone());
        gw.fail_delete(handle.delete_token.clone());

        assert!(gw.download(&handle.remote_id).await.is_err());
        assert!(gw.delete(&handle.delete_token).await.is_err());
        assert!(gw.contains(&handle.remote_id));
        assert_eq!(gw.total_calls(), 3);
    }

    #[tokio::test]
    async fn overwrite_replaces_bytes() {
        let gw = InMemoryGateway::new();
        let handle = gw.upload(Bytes::from_static(b"before")).await.unwrap();
        assert!(gw.overwrite(&handle.remote_id, Bytes::from_static(b"after")));
        assert!(!gw.overwrite("missing", Bytes::new()));
        assert_eq!(&gw.download(&handle.remote_id).await.unwrap()[..], b"after");
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_calls() {
        let gw = InMemoryGateway::new().with_latency(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        gw.upload(Bytes::from_static(b"slow")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn debug_format() {
        let gw = InMemoryGateway::new();
        let debug = format!("{gw:?}");
        assert!(debug.contains("InMemoryGateway"));
        assert!(debug.contains("image_count"));
    }
}
