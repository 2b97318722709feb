//! # SCORM Storage
//!
//! Storage layer for uploaded SCORM packages.
//!
//! This crate provides:
//! - **Path validation**: Folder names and relative paths are checked before
//!   any backend call
//! - **Local storage**: Packages written under a public directory tree
//! - **Cloud storage**: Cloudinary-compatible upload, list and delete-by-prefix
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Gateway handlers             │
//! ├─────────────────────────────────────────┤
//! │          StorageAdapter Trait           │
//! ├────────────────────┬────────────────────┤
//! │    LocalStorage    │    CloudStorage    │
//! ├────────────────────┼────────────────────┤
//! │     filesystem     │   Cloudinary API   │
//! └────────────────────┴────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use scorm_storage::{LocalStorage, ObjectKey, StorageAdapter};
//!
//! let storage = LocalStorage::new("public");
//! let key = ObjectKey::parse("course", "index.html")?;
//! let stored = storage.put_bytes(&key, data).await?;
//! let folders = storage.list_folders(500).await?;
//! ```

pub mod cloud;
pub mod error;
pub mod local;
pub mod path;
pub mod types;

pub use cloud::{CloudConfig, CloudStorage};
pub use error::{Result, StorageError};
pub use local::LocalStorage;
pub use path::{FolderName, ObjectKey, RelativePath};
pub use types::{FolderEntry, ResourceType, StoredFile};

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

/// Default number of folders returned by a listing
pub const DEFAULT_MAX_LIST_RESULTS: usize = 500;

/// Trait for storage backends
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Store in-memory content under a key
    async fn put_bytes(&self, key: &ObjectKey, data: Bytes) -> Result<StoredFile>;

    /// Store the contents of a local file under a key
    async fn put_file(&self, key: &ObjectKey, source: &Path) -> Result<StoredFile>;

    /// List top-level folders, at most `max_results`
    async fn list_folders(&self, max_results: usize) -> Result<Vec<FolderEntry>>;

    /// Remove a folder and everything in it; missing folders are not an error
    async fn delete_folder(&self, folder: &FolderName) -> Result<()>;
}

/// Storage backend selected at startup
pub enum FlexibleStorage {
    /// Files under a local directory
    Local(LocalStorage),
    /// Files in the cloud media service
    Cloud(CloudStorage),
}

impl FlexibleStorage {
    /// Local root directory, if this is the local backend
    pub fn local_root(&self) -> Option<&Path> {
        match self {
            FlexibleStorage::Local(store) => Some(store.root()),
            FlexibleStorage::Cloud(_) => None,
        }
    }

    /// Backend name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            FlexibleStorage::Local(_) => "local",
            FlexibleStorage::Cloud(_) => "cloudinary",
        }
    }
}

#[async_trait]
impl StorageAdapter for FlexibleStorage {
    async fn put_bytes(&self, key: &ObjectKey, data: Bytes) -> Result<StoredFile> {
        match self {
            FlexibleStorage::Local(store) => store.put_bytes(key, data).await,
            FlexibleStorage::Cloud(store) => store.put_bytes(key, data).await,
        }
    }

    async fn put_file(&self, key: &ObjectKey, source: &Path) -> Result<StoredFile> {
        match self {
            FlexibleStorage::Local(store) => store.put_file(key, source).await,
            FlexibleStorage::Cloud(store) => store.put_file(key, source).await,
        }
    }

    async fn list_folders(&self, max_results: usize) -> Result<Vec<FolderEntry>> {
        match self {
            FlexibleStorage::Local(store) => store.list_folders(max_results).await,
            FlexibleStorage::Cloud(store) => store.list_folders(max_results).await,
        }
    }

    async fn delete_folder(&self, folder: &FolderName) -> Result<()> {
        match self {
            FlexibleStorage::Local(store) => store.delete_folder(folder).await,
            FlexibleStorage::Cloud(store) => store.delete_folder(folder).await,
        }
    }
}
