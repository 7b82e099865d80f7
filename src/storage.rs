//! Object-storage capability and locator helpers.
//!
//! The catalog does not own remote storage mechanics; it depends on the
//! [`ObjectStore`] trait: durably store a byte stream at a bucket/path,
//! optionally publicly readable, return a retrievable URL; delete it;
//! mint a time-limited signed URL; and fetch bytes back for proxying.
//! Production wires an S3-style client behind this trait, tests use
//! [`tests::MemoryObjectStore`].

use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote storage error: {0}")]
    Remote(String),
}

/// Durable blob storage with signed-URL support.
pub trait ObjectStore: Sync {
    /// Store the file at `local` under `bucket`/`path`. Returns the
    /// object's standing URL (readable by anyone only when `public`).
    fn upload(
        &self,
        local: &Path,
        bucket: &str,
        path: &str,
        public: bool,
    ) -> Result<String, StorageError>;

    fn delete(&self, bucket: &str, path: &str) -> Result<(), StorageError>;

    /// Mint a time-limited signed URL for a private object.
    fn sign(&self, bucket: &str, path: &str, expiry_secs: u64) -> Result<String, StorageError>;

    /// Open a byte stream for the object at `url` (standing or signed).
    fn fetch(&self, url: &str) -> Result<Box<dyn Read + Send>, StorageError>;
}

/// Heuristic remote-ness test: URL schemes and their URL-encoded forms.
pub fn is_remote_url(url: &str) -> bool {
    ["https:", "http:", "http%3A", "https%3A"]
        .iter()
        .any(|p| url.contains(p))
}

/// Compose the remote object key for a record: optional configured folder
/// prefix, then the record's stable key, then the file path.
pub fn remote_object_path(folder: Option<&str>, record_key: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    match folder {
        Some(folder) => format!("{}/{record_key}/{path}", folder.trim_matches('/')),
        None => format!("{record_key}/{path}"),
    }
}

/// Map a local URL path (`/resized/a.jpg`) to its filesystem location
/// under the media root.
pub fn local_fs_path(media_root: &Path, url_path: &str) -> PathBuf {
    media_root.join(url_path.trim_start_matches('/'))
}
