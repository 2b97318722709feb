//! Local filesystem storage rooted at a public directory

use crate::{FolderEntry, FolderName, ObjectKey, Result, StorageAdapter, StoredFile};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Stores each folder as a directory under `root`
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a store rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of an object
    pub fn object_path(&self, key: &ObjectKey) -> PathBuf {
        key.path.to_path(&self.root.join(key.folder.as_str()))
    }

    /// URL path under which the gateway serves an object
    pub fn public_url(key: &ObjectKey) -> String {
        let mut url = format!("/{}", urlencoding::encode(key.folder.as_str()));
        for segment in key.path.segments() {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    /// Conventional entry point link for a folder
    pub fn folder_link(folder: &str) -> String {
        format!("/{}/index.html", urlencoding::encode(folder))
    }

    async fn prepare_parent(&self, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for LocalStorage {
    #[instrument(skip(self, key, data), fields(key = %key, size = data.len()))]
    async fn put_bytes(&self, key: &ObjectKey, data: Bytes) -> Result<StoredFile> {
        let dest = self.object_path(key);
        self.prepare_parent(&dest).await?;
        fs::write(&dest, &data).await?;

        debug!(path = %dest.display(), "Wrote file");
        Ok(StoredFile::new(
            key.to_string(),
            Self::public_url(key),
            key.path.file_name(),
            data.len() as u64,
        ))
    }

    #[instrument(skip(self, key), fields(key = %key))]
    async fn put_file(&self, key: &ObjectKey, source: &Path) -> Result<StoredFile> {
        let dest = self.object_path(key);
        self.prepare_parent(&dest).await?;
        let size = fs::copy(source, &dest).await?;

        debug!(path = %dest.display(), size, "Copied file");
        Ok(StoredFile::new(
            key.to_string(),
            Self::public_url(key),
            key.path.file_name(),
            size,
        ))
    }

    #[instrument(skip(self))]
    async fn list_folders(&self, max_results: usize) -> Result<Vec<FolderEntry>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => warn!(name = ?raw, "Skipping folder with non UTF-8 name"),
            }
        }

        // read_dir order is platform dependent
        names.sort();
        names.truncate(max_results);

        Ok(names
            .into_iter()
            .map(|name| FolderEntry {
                link: Self::folder_link(&name),
                name,
            })
            .collect())
    }

    #[instrument(skip(self, folder), fields(folder = %folder))]
    async fn delete_folder(&self, folder: &FolderName) -> Result<()> {
        let path = self.root.join(folder.as_str());
        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed folder");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Folder already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
