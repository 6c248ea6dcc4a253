use camino::Utf8Path;
use cloudsync::RemoteEntries;
use futures::Future;
use url::Url;

pub mod disk;
pub mod fs;

/// Short-lived target reserved by the remote store for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHandle {
    href: Url,
}

impl UploadHandle {
    pub fn new(href: Url) -> Self {
        Self { href }
    }

    pub fn href(&self) -> &Url {
        &self.href
    }
}

/// Outcome of a successful delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    Done,
    /// The object was not there anymore
    AlreadyAbsent,
}

pub trait ListEntries {
    /// Lists the objects directly under the synced folder.
    fn list_entries(&self) -> impl Future<Output = cloudsync::Result<RemoteEntries>> + Send;
}

/// First phase of an upload.
pub trait RequestUpload {
    /// Reserves an upload target for `name`.
    /// Resolves to `None` if the store refuses because the object already
    /// exists and `overwrite` is false.
    fn request_upload(
        &self,
        name: &str,
        overwrite: bool,
    ) -> impl Future<Output = cloudsync::Result<Option<UploadHandle>>> + Send;
}

/// Second phase of an upload.
pub trait Upload {
    /// Streams the content of the local file at `path` to `handle`.
    fn upload(
        &self,
        handle: &UploadHandle,
        path: &Utf8Path,
    ) -> impl Future<Output = cloudsync::Result<()>> + Send;
}

pub trait Delete {
    fn delete(&self, name: &str) -> impl Future<Output = cloudsync::Result<Deleted>> + Send;
}

/// A trait for the remote side of the sync
pub trait RemoteStore:
    ListEntries + RequestUpload + Upload + Delete + Send + Sync + 'static
{
}
