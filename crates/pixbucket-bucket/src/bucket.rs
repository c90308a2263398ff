use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use pixbucket_codec::Codec;
use pixbucket_gateway::{Gateway, GatewayError, GatewayResult};
use pixbucket_index::{IndexEntry, IndexRecord, IndexResult, IndexStore};
use pixbucket_types::{validate_bucket_name, validate_object_name, RemoteHandle, Value};

use crate::batch::fan_out;
use crate::error::{BatchFailure, BatchOperation, BucketError, BucketResult};
use crate::object::{StagedObject, UploadedObject};

const BUCKET_ID_LEN: usize = 6;
const BUCKET_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const CREATE_ATTEMPTS: usize = 16;

/// The services a bucket talks to.
#[derive(Clone)]
pub struct Backend {
    pub codec: Codec,
    pub gateway: Arc<dyn Gateway>,
    pub index: Arc<dyn IndexStore>,
}

impl Backend {
    /// Backend with the default codec.
    pub fn new(gateway: Arc<dyn Gateway>, index: Arc<dyn IndexStore>) -> Self {
        Self {
            codec: Codec::default(),
            gateway,
            index,
        }
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }
}

/// A random bucket name of six ASCII letters.
pub fn random_bucket_name() -> String {
    let mut rng = rand::thread_rng();
    (0..BUCKET_ID_LEN)
        .map(|_| BUCKET_ID_ALPHABET[rng.gen_range(0..BUCKET_ID_ALPHABET.len())] as char)
        .collect()
}

struct BucketState<V> {
    staged: BTreeMap<String, StagedObject<V>>,
    uploaded: BTreeMap<String, UploadedObject<V>>,
    next_revision: u64,
    /// The last persist attempt failed; the stored index is stale.
    dirty: bool,
    /// Images superseded by a newer upload of the same name. Deleted once an
    /// index without them has been persisted.
    orphans: Vec<RemoteHandle>,
}

struct Shared<V> {
    name: String,
    backend: Backend,
    state: Mutex<BucketState<V>>,
    /// Held by a driver task for the whole of a bulk operation.
    ops: tokio::sync::Mutex<()>,
}

/// Remote delete where an already missing image counts as deleted.
async fn delete_remote(gateway: &dyn Gateway, delete_token: &str) -> GatewayResult<()> {
    match gateway.delete(delete_token).await {
        Err(GatewayError::NotFound(reason)) => {
            debug!(%reason, "remote image already gone");
            Ok(())
        }
        other => other,
    }
}

fn batch_result(operation: BatchOperation, attempted: usize, failed: BTreeMap<String, String>) -> Option<BatchFailure> {
    (!failed.is_empty()).then(|| BatchFailure::new(operation, attempted, failed))
}

impl<V> Shared<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, BucketState<V>> {
        self.state.lock().expect("lock poisoned")
    }

    fn persist_locked(&self, state: &mut BucketState<V>) -> IndexResult<()> {
        let record = IndexRecord::new(
            &self.name,
            state
                .uploaded
                .values()
                .map(|o| IndexEntry::new(&o.name, &o.remote)),
        );
        match self.backend.index.save_record(&record) {
            Ok(()) => {
                state.dirty = false;
                debug!(bucket = %self.name, entries = record.len(), "persisted index");
                Ok(())
            }
            Err(e) => {
                state.dirty = true;
                warn!(bucket = %self.name, error = %e, "failed to persist index");
                Err(e)
            }
        }
    }

    fn persist(&self) -> BucketResult<()> {
        let mut state = self.lock();
        Ok(self.persist_locked(&mut state)?)
    }

    fn flush_if_dirty(&self) -> BucketResult<()> {
        let mut state = self.lock();
        if state.dirty {
            self.persist_locked(&mut state)?;
        }
        Ok(())
    }

    /// Best-effort delete of superseded images. Failures are logged only.
    async fn reap_orphans(&self) {
        let orphans = {
            let mut state = self.lock();
            if state.dirty {
                return;
            }
            std::mem::take(&mut state.orphans)
        };
        if orphans.is_empty() {
            return;
        }

        let jobs = orphans
            .into_iter()
            .map(|h| (h.remote_id.clone(), h))
            .collect();
        let gateway = Arc::clone(&self.backend.gateway);
        let outcome = fan_out(jobs, |handle: RemoteHandle| {
            let gateway = Arc::clone(&gateway);
            async move {
                delete_remote(gateway.as_ref(), &handle.delete_token)
                    .await
                    .map_err(|e| e.to_string())
            }
        })
        .await;

        for (remote_id, reason) in outcome.failed {
            warn!(bucket = %self.name, %remote_id, %reason, "failed to delete replaced image");
        }
    }

    /// Upload the staged object `target`, or every staged object if `None`.
    async fn upload_batch(
        self: Arc<Self>,
        operation: BatchOperation,
        target: Option<String>,
    ) -> BucketResult<()> {
        let _op = self.ops.lock().await;
        let batch: Vec<StagedObject<V>> = {
            let state = self.lock();
            match &target {
                Some(name) => state.staged.get(name).cloned().into_iter().collect(),
                None => state.staged.values().cloned().collect(),
            }
        };
        let attempted = batch.len();
        let mut failed = BTreeMap::new();

        let mut jobs = Vec::with_capacity(attempted);
        for staged in batch {
            match self.backend.codec.encode_image(&staged.value) {
                Ok(png) => {
                    debug!(bucket = %self.name, object = %staged.name, bytes = png.len(), "encoded object");
                    jobs.push((staged.name.clone(), (staged, Bytes::from(png))));
                }
                Err(e) => {
                    failed.insert(staged.name, e.to_string());
                }
            }
        }

        let gateway = Arc::clone(&self.backend.gateway);
        let outcome = fan_out(jobs, |(staged, png): (StagedObject<V>, Bytes)| {
            let gateway = Arc::clone(&gateway);
            async move {
                match gateway.upload(png).await {
                    Ok(handle) => Ok((staged, handle)),
                    Err(e) => Err(e.to_string()),
                }
            }
        })
        .await;
        failed.extend(outcome.failed);

        let persisted = {
            let mut state = self.lock();
            for (name, (staged, handle)) in outcome.succeeded {
                debug!(bucket = %self.name, object = %name, remote_id = %handle.remote_id, "uploaded object");
                // A newer value staged during the upload stays staged.
                if state
                    .staged
                    .get(&name)
                    .is_some_and(|s| s.revision == staged.revision)
                {
                    state.staged.remove(&name);
                }
                let uploaded = UploadedObject::new(name.clone(), handle, Some(staged.value));
                if let Some(previous) = state.uploaded.insert(name, uploaded) {
                    state.orphans.push(previous.remote);
                }
            }
            self.persist_locked(&mut state)
        };

        for (name, reason) in &failed {
            warn!(bucket = %self.name, object = %name, %reason, "upload failed");
        }
        info!(
            bucket = %self.name,
            %operation,
            attempted,
            failed = failed.len(),
            "upload batch finished"
        );

        let batch = batch_result(operation, attempted, failed);
        match persisted {
            Ok(()) => {
                self.reap_orphans().await;
                batch.map_or(Ok(()), |b| Err(BucketError::BatchFailed(b)))
            }
            Err(source) => Err(BucketError::PersistFailed { source, batch }),
        }
    }

    async fn delete_one(self: Arc<Self>, name: String) -> BucketResult<()> {
        let _op = self.ops.lock().await;
        let handle = self
            .lock()
            .uploaded
            .get(&name)
            .map(|o| o.remote.clone())
            .ok_or_else(|| BucketError::NotFound(name.clone()))?;

        if let Err(e) = delete_remote(self.backend.gateway.as_ref(), &handle.delete_token).await {
            warn!(bucket = %self.name, object = %name, error = %e, "remote delete failed");
            self.flush_if_dirty()?;
            return Err(e.into());
        }

        {
            let mut state = self.lock();
            if state
                .uploaded
                .get(&name)
                .is_some_and(|o| o.remote == handle)
            {
                state.uploaded.remove(&name);
            }
            self.persist_locked(&mut state)?;
        }

        info!(bucket = %self.name, object = %name, "deleted object");
        self.reap_orphans().await;
        Ok(())
    }

    async fn delete_all(self: Arc<Self>) -> BucketResult<()> {
        let _op = self.ops.lock().await;
        let jobs: Vec<(String, RemoteHandle)> = {
            let state = self.lock();
            state
                .uploaded
                .values()
                .map(|o| (o.name.clone(), o.remote.clone()))
                .collect()
        };
        let mut attempted = jobs.len();

        let gateway = Arc::clone(&self.backend.gateway);
        let mut outcome = fan_out(jobs, |handle: RemoteHandle| {
            let gateway = Arc::clone(&gateway);
            async move {
                match delete_remote(gateway.as_ref(), &handle.delete_token).await {
                    Ok(()) => Ok(handle),
                    Err(e) => Err(e.to_string()),
                }
            }
        })
        .await;

        let stored = {
            let mut state = self.lock();
            for (name, handle) in &outcome.succeeded {
                if state
                    .uploaded
                    .get(name)
                    .is_some_and(|o| &o.remote == handle)
                {
                    state.uploaded.remove(name);
                }
            }
            // Anything still uploaded keeps the bucket alive.
            for name in state.uploaded.keys() {
                if !outcome.failed.contains_key(name) {
                    if !outcome.succeeded.iter().any(|(done, _)| done == name) {
                        attempted += 1;
                    }
                    outcome
                        .failed
                        .insert(name.clone(), "uploaded while the bucket was being deleted".into());
                }
            }

            if outcome.failed.is_empty() {
                match self.backend.index.remove(&self.name) {
                    Ok(existed) => {
                        state.dirty = false;
                        debug!(bucket = %self.name, existed, "removed index");
                        Ok(())
                    }
                    Err(e) => {
                        state.dirty = true;
                        warn!(bucket = %self.name, error = %e, "failed to remove index");
                        Err(e)
                    }
                }
            } else {
                self.persist_locked(&mut state)
            }
        };

        for (name, reason) in &outcome.failed {
            warn!(bucket = %self.name, object = %name, %reason, "remote delete failed");
        }
        info!(
            bucket = %self.name,
            attempted,
            failed = outcome.failed.len(),
            "bucket delete finished"
        );

        let batch = batch_result(BatchOperation::DeleteBucket, attempted, outcome.failed);
        match stored {
            Ok(()) => {
                self.reap_orphans().await;
                batch.map_or(Ok(()), |b| Err(BucketError::BatchFailed(b)))
            }
            Err(source) => Err(BucketError::PersistFailed { source, batch }),
        }
    }
}

/// A named collection of objects stored as images on a remote host.
///
/// Values are first staged locally, then committed: each staged value is
/// encoded to a PNG and uploaded, and the bucket's index (which names every
/// uploaded object and where it lives) is persisted through the
/// [`IndexStore`]. Staged values are never durable.
///
/// Bulk operations run on a spawned task. Dropping the future returned by
/// [`commit`](Self::commit), [`push`](Self::push),
/// [`delete_obj`](Self::delete_obj) or [`delete_bucket`](Self::delete_bucket)
/// does not stop the operation: remote calls already issued complete and
/// their results are recorded and persisted.
pub struct Bucket<V = Value> {
    shared: Arc<Shared<V>>,
}

impl<V> Bucket<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn from_parts(name: String, backend: Backend, uploaded: BTreeMap<String, UploadedObject<V>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                backend,
                state: Mutex::new(BucketState {
                    staged: BTreeMap::new(),
                    uploaded,
                    next_revision: 0,
                    dirty: false,
                    orphans: Vec::new(),
                }),
                ops: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Create a new, empty bucket and persist its index right away.
    ///
    /// Fails with [`BucketError::AlreadyExists`] if an index for `name` is
    /// already stored.
    pub fn new(name: impl Into<String>, backend: Backend) -> BucketResult<Self> {
        let name = name.into();
        validate_bucket_name(&name)?;
        if backend.index.contains(&name)? {
            return Err(BucketError::AlreadyExists(name));
        }

        let bucket = Self::from_parts(name, backend, BTreeMap::new());
        bucket.shared.persist()?;
        info!(bucket = %bucket.name(), "created bucket");
        Ok(bucket)
    }

    /// Create a new bucket under a random six-letter name.
    pub fn create(backend: Backend) -> BucketResult<Self> {
        for _ in 0..CREATE_ATTEMPTS {
            match Self::new(random_bucket_name(), backend.clone()) {
                Err(BucketError::AlreadyExists(_)) => continue,
                other => return other,
            }
        }
        Err(BucketError::AlreadyExists(
            "no free random bucket name".to_string(),
        ))
    }

    /// Reopen a bucket from its persisted index.
    ///
    /// Uploaded objects come back without cached values; the first `get` of
    /// each downloads it.
    pub fn load(name: impl Into<String>, backend: Backend) -> BucketResult<Self> {
        let name = name.into();
        validate_bucket_name(&name)?;
        let record = backend
            .index
            .load_record(&name)?
            .ok_or_else(|| BucketError::NoSuchBucket(name.clone()))?;

        let uploaded: BTreeMap<String, UploadedObject<V>> = record
            .entries
            .into_iter()
            .map(|entry| {
                let handle = entry.handle();
                (entry.name.clone(), UploadedObject::new(entry.name, handle, None))
            })
            .collect();
        info!(bucket = %name, objects = uploaded.len(), "loaded bucket");
        Ok(Self::from_parts(name, backend, uploaded))
    }

    /// Load the bucket if its index exists, otherwise create it.
    pub fn open(name: impl Into<String>, backend: Backend) -> BucketResult<Self> {
        let name = name.into();
        match Self::load(name.clone(), backend.clone()) {
            Err(BucketError::NoSuchBucket(_)) => Self::new(name, backend),
            other => other,
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Names of staged objects, sorted.
    pub fn staged_names(&self) -> Vec<String> {
        self.shared.lock().staged.keys().cloned().collect()
    }

    /// Names of uploaded objects, sorted.
    pub fn uploaded_names(&self) -> Vec<String> {
        self.shared.lock().uploaded.keys().cloned().collect()
    }

    pub fn is_staged(&self, name: &str) -> bool {
        self.shared.lock().staged.contains_key(name)
    }

    pub fn is_uploaded(&self, name: &str) -> bool {
        self.shared.lock().uploaded.contains_key(name)
    }

    /// Where an uploaded object lives.
    pub fn remote_handle(&self, name: &str) -> Option<RemoteHandle> {
        self.shared
            .lock()
            .uploaded
            .get(name)
            .map(|o| o.remote.clone())
    }

    /// Whether `get(name)` would be served without remote I/O.
    pub fn is_cached(&self, name: &str) -> bool {
        self.shared
            .lock()
            .uploaded
            .get(name)
            .is_some_and(|o| o.cached.is_some())
    }

    /// Drop every cached value.
    pub fn evict_cache(&self) {
        for object in self.shared.lock().uploaded.values_mut() {
            object.cached = None;
        }
    }

    /// True when nothing is waiting to be committed.
    pub fn is_synced(&self) -> bool {
        self.shared.lock().staged.is_empty()
    }

    /// True when the last attempt to persist the index failed.
    pub fn is_dirty(&self) -> bool {
        self.shared.lock().dirty
    }

    /// Stage `value` under `name`, replacing any staged value of that name.
    ///
    /// Uploaded objects are untouched until the next commit. If an earlier
    /// persist failed, the index is flushed here; an error from that flush is
    /// returned but the value is staged either way.
    pub fn stage(&mut self, name: impl Into<String>, value: impl Into<V>) -> BucketResult<()> {
        let name = name.into();
        validate_object_name(&name)?;

        let mut state = self.shared.lock();
        state.next_revision += 1;
        let revision = state.next_revision;
        debug!(bucket = %self.shared.name, object = %name, revision, "staged object");
        state.staged.insert(
            name.clone(),
            StagedObject {
                name,
                value: value.into(),
                revision,
            },
        );

        if state.dirty {
            self.shared.persist_locked(&mut state)?;
        }
        Ok(())
    }

    /// Remove a staged value and return it.
    pub fn unstage(&mut self, name: &str) -> BucketResult<V> {
        let removed = self.shared.lock().staged.remove(name);
        match removed {
            Some(staged) => {
                debug!(bucket = %self.shared.name, object = %name, "unstaged object");
                Ok(staged.value)
            }
            None => Err(BucketError::NotFound(name.to_string())),
        }
    }

    /// Upload every staged object concurrently.
    ///
    /// Each object succeeds or fails on its own. Successful uploads move
    /// from staged to uploaded; failed ones stay staged. The index is
    /// persisted whatever happened, then any failures are reported as
    /// [`BucketError::BatchFailed`]. If persisting fails,
    /// [`BucketError::PersistFailed`] is returned instead, still carrying the
    /// failed names, and the flush is retried by the next operation.
    ///
    /// Waits for any bulk operation still running from a dropped call.
    pub async fn commit(&mut self) -> BucketResult<()> {
        info!(bucket = %self.shared.name, objects = self.shared.lock().staged.len(), "committing");
        let shared = Arc::clone(&self.shared);
        self.drive(shared.upload_batch(BatchOperation::Commit, None))
            .await
    }

    /// Commit a single staged object.
    pub async fn push(&mut self, name: &str) -> BucketResult<()> {
        if !self.is_staged(name) {
            return Err(BucketError::NotFound(name.to_string()));
        }
        let shared = Arc::clone(&self.shared);
        self.drive(shared.upload_batch(BatchOperation::Push, Some(name.to_string())))
            .await
    }

    /// Stage `value` under `name` and push it immediately.
    pub async fn put(&mut self, name: impl Into<String>, value: impl Into<V>) -> BucketResult<()> {
        let name = name.into();
        self.stage(name.clone(), value)?;
        self.push(&name).await
    }

    /// Fetch an uploaded object.
    ///
    /// Served from the cache when possible; otherwise downloaded, decoded,
    /// and cached.
    pub async fn get(&self, name: &str) -> BucketResult<V> {
        let remote_id = {
            let state = self.shared.lock();
            let object = state
                .uploaded
                .get(name)
                .ok_or_else(|| BucketError::NotFound(name.to_string()))?;
            if let Some(value) = &object.cached {
                debug!(bucket = %self.shared.name, object = %name, "cache hit");
                return Ok(value.clone());
            }
            object.remote.remote_id.clone()
        };

        let image = self.shared.backend.gateway.download(&remote_id).await?;
        let value: V = self.shared.backend.codec.decode_image(&image)?;
        debug!(bucket = %self.shared.name, object = %name, bytes = image.len(), "downloaded object");

        if let Some(object) = self.shared.lock().uploaded.get_mut(name) {
            // Skip if the object was replaced while downloading.
            if object.remote.remote_id == remote_id {
                object.cached = Some(value.clone());
            }
        }
        Ok(value)
    }

    /// Delete an uploaded object from the remote host and the index.
    ///
    /// On a remote failure the object stays in the bucket. An image the host
    /// no longer has counts as deleted.
    pub async fn delete_obj(&mut self, name: &str) -> BucketResult<()> {
        if !self.is_uploaded(name) {
            return Err(BucketError::NotFound(name.to_string()));
        }
        let shared = Arc::clone(&self.shared);
        self.drive(shared.delete_one(name.to_string())).await
    }

    /// Delete every uploaded object, then the index.
    ///
    /// Objects whose remote delete fails stay in the bucket and in a
    /// re-persisted index, so the call can be retried. Succeeds only once the
    /// stored index is gone.
    pub async fn delete_bucket(&mut self) -> BucketResult<()> {
        info!(bucket = %self.shared.name, "deleting bucket");
        let shared = Arc::clone(&self.shared);
        self.drive(shared.delete_all()).await
    }

    async fn drive<T, F>(&self, task: F) -> BucketResult<T>
    where
        F: Future<Output = BucketResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::spawn(task).await {
            Ok(result) => result,
            Err(e) => Err(BucketError::Interrupted(e.to_string())),
        }
    }
}

impl<V> fmt::Debug for Bucket<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock().expect("lock poisoned");
        f.debug_struct("Bucket")
            .field("name", &self.shared.name)
            .field("staged", &state.staged.len())
            .field("uploaded", &state.uploaded.len())
            .field("dirty", &state.dirty)
            .finish()
    }
}
