use async_trait::async_trait;
use bytes::Bytes;
use pixbucket_types::RemoteHandle;

use crate::error::GatewayResult;

/// Remote image host.
///
/// The gateway stores opaque byte blobs and knows nothing about buckets or
/// object names. Implementations must be safe to call concurrently: a bucket
/// fans out one call per object during bulk operations.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Store an image and return where it lives plus how to delete it.
    async fn upload(&self, image: Bytes) -> GatewayResult<RemoteHandle>;

    /// Fetch the image stored under `remote_id`.
    async fn download(&self, remote_id: &str) -> GatewayResult<Bytes>;

    /// Delete the image that `delete_token` was issued for.
    async fn delete(&self, delete_token: &str) -> GatewayResult<()>;
}

/// Mint a fresh remote id and delete token.
pub(crate) fn mint_handle() -> RemoteHandle {
    let remote_id = uuid::Uuid::now_v7().simple().to_string();
    let delete_token = hex::encode(rand::random::<[u8; 16]>());
    RemoteHandle::new(remote_id, delete_token)
}
