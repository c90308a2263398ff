use pixbucket_types::RemoteHandle;

/// A value waiting for the next commit.
#[derive(Clone, Debug)]
pub(crate) struct StagedObject<V> {
    pub name: String,
    pub value: V,
    /// Bumped on every `stage`, so a commit can tell whether the entry it
    /// uploaded was replaced in the meantime.
    pub revision: u64,
}

/// An object that lives on the remote host.
#[derive(Clone, Debug)]
pub(crate) struct UploadedObject<V> {
    pub name: String,
    pub remote: RemoteHandle,
    /// Never persisted.
    pub cached: Option<V>,
}

impl<V> UploadedObject<V> {
    pub fn new(name: impl Into<String>, remote: RemoteHandle, cached: Option<V>) -> Self {
        Self {
            name: name.into(),
            remote,
            cached,
        }
    }
}
