//! Cloudinary-compatible cloud storage client
//!
//! Uploads use the signed Upload API; listing and prefix deletion use the
//! Admin API with basic authentication. Every object lives under
//! `<root_prefix>/<folder>/...`.

use crate::path::validate_segment;
use crate::{
    FolderEntry, FolderName, ObjectKey, ResourceType, Result, StorageAdapter, StorageError,
    StoredFile,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Maximum page size accepted by the Admin API
pub const MAX_PAGE_SIZE: usize = 500;

/// Configuration for the cloud backend
#[derive(Clone)]
pub struct CloudConfig {
    /// API base URL (e.g., "https://api.cloudinary.com/v1_1")
    pub api_url: String,
    /// Account (cloud) name
    pub cloud_name: String,
    /// API key
    pub api_key: String,
    /// API secret
    pub api_secret: String,
    /// Key prefix under which all folders are stored
    pub root_prefix: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.cloudinary.com/v1_1".to_string(),
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            root_prefix: "scorm_packages".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl CloudConfig {
    /// Create with account credentials
    pub fn with_credentials(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Default::default()
        }
    }

    /// Override the API base URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override the root prefix
    pub fn with_root_prefix(mut self, root_prefix: impl Into<String>) -> Self {
        self.root_prefix = root_prefix.into();
        self
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cloud name", &self.cloud_name),
            ("API key", &self.api_key),
            ("API secret", &self.api_secret),
        ] {
            if value.is_empty() {
                return Err(StorageError::Configuration(format!("missing cloud {}", name)));
            }
        }
        validate_segment(&self.root_prefix).map_err(|e| {
            StorageError::Configuration(format!("invalid root prefix: {}", e))
        })?;
        Ok(())
    }
}

/// Cloud storage client
#[derive(Clone)]
pub struct CloudStorage {
    client: Client,
    config: CloudConfig,
}

impl CloudStorage {
    /// Create a new cloud storage client
    pub fn new(config: CloudConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// The configuration in use
    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Public id for an object key
    ///
    /// Images and videos get their format appended by the service, so the
    /// extension is dropped for those; raw files keep their full name.
    pub fn public_id(&self, key: &ObjectKey) -> String {
        let full = format!("{}/{}", self.config.root_prefix, key);
        match ResourceType::detect(key.path.file_name()) {
            ResourceType::Raw => full,
            _ => match full.rsplit_once('.') {
                Some((stem, _)) if !stem.ends_with('/') => stem.to_string(),
                _ => full,
            },
        }
    }

    fn folder_prefix(&self, folder: Option<&FolderName>) -> String {
        match folder {
            Some(folder) => format!("{}/{}/", self.config.root_prefix, folder),
            None => format!("{}/", self.config.root_prefix),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/auto/upload", self.config.api_url, self.config.cloud_name)
    }

    fn resources_url(&self, resource_type: ResourceType) -> String {
        format!(
            "{}/{}/resources/{}/upload",
            self.config.api_url, self.config.cloud_name, resource_type
        )
    }

    fn http_error(&self, err: reqwest::Error) -> StorageError {
        StorageError::from_http(err, self.config.timeout)
    }

    fn admin(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.config.api_key, Some(&self.config.api_secret))
    }

    /// Build the signed form for an upload
    fn signed_form(&self, public_id: &str) -> multipart::Form {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [
            ("overwrite", "true".to_string()),
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
        ];
        let signature = sign_params(&params, &self.config.api_secret);

        let mut form = multipart::Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);
        for (name, value) in params {
            form = form.text(name, value);
        }
        form
    }

    async fn upload(&self, key: &ObjectKey, part: multipart::Part) -> Result<StoredFile> {
        let public_id = self.public_id(key);
        let form = self.signed_form(&public_id).part("file", part);

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.http_error(e))?;
        let response = check_status(response).await?;
        let uploaded: UploadResponse = response.json().await.map_err(|e| self.http_error(e))?;

        debug!(public_id = %uploaded.public_id, bytes = uploaded.bytes, "Uploaded to cloud");

        let mut stored = StoredFile::new(
            key.to_string(),
            uploaded.secure_url,
            key.path.file_name(),
            uploaded.bytes,
        );
        if let Some(resource_type) = uploaded.resource_type {
            stored.resource_type = resource_type;
        }
        Ok(stored)
    }
}

#[async_trait]
impl StorageAdapter for CloudStorage {
    #[instrument(skip(self, key, data), fields(key = %key, size = data.len()))]
    async fn put_bytes(&self, key: &ObjectKey, data: Bytes) -> Result<StoredFile> {
        let size = data.len() as u64;
        let part = multipart::Part::stream_with_length(data, size)
            .file_name(key.path.file_name().to_string());
        self.upload(key, part).await
    }

    #[instrument(skip(self, key), fields(key = %key))]
    async fn put_file(&self, key: &ObjectKey, source: &Path) -> Result<StoredFile> {
        let file = tokio::fs::File::open(source).await?;
        let size = file.metadata().await?.len();
        let part = multipart::Part::stream_with_length(file, size)
            .file_name(key.path.file_name().to_string());
        self.upload(key, part).await
    }

    #[instrument(skip(self))]
    async fn list_folders(&self, max_results: usize) -> Result<Vec<FolderEntry>> {
        let prefix = self.folder_prefix(None);
        let page_size = max_results.clamp(1, MAX_PAGE_SIZE);
        let mut folders: Vec<FolderListing> = Vec::new();

        for resource_type in ResourceType::ALL {
            let request = self
                .client
                .get(self.resources_url(resource_type))
                .query(&[("prefix", prefix.as_str())])
                .query(&[("max_results", page_size)]);
            let response = self
                .admin(request)
                .send()
                .await
                .map_err(|e| self.http_error(e))?;
            let response = check_status(response).await?;
            let page: ResourcesResponse = response.json().await.map_err(|e| self.http_error(e))?;

            debug!(%resource_type, count = page.resources.len(), "Listed cloud resources");

            for resource in page.resources {
                let Some(rest) = resource.public_id.strip_prefix(&prefix) else {
                    continue;
                };
                let Some((folder, file)) = rest.split_once('/') else {
                    // Objects directly under the root belong to no folder
                    continue;
                };
                match folders.iter_mut().find(|f| f.name == folder) {
                    Some(existing) => {
                        if !existing.has_index && is_index(file) {
                            existing.link = resource.secure_url;
                            existing.has_index = true;
                        }
                    }
                    None => folders.push(FolderListing {
                        name: folder.to_string(),
                        has_index: is_index(file),
                        link: resource.secure_url,
                    }),
                }
            }
        }

        folders.truncate(max_results);
        Ok(folders
            .into_iter()
            .map(|f| FolderEntry {
                name: f.name,
                link: f.link,
            })
            .collect())
    }

    #[instrument(skip(self, folder), fields(folder = %folder))]
    async fn delete_folder(&self, folder: &FolderName) -> Result<()> {
        let prefix = self.folder_prefix(Some(folder));

        for resource_type in ResourceType::ALL {
            let request = self
                .client
                .delete(self.resources_url(resource_type))
                .query(&[("prefix", prefix.as_str())]);
            let response = self
                .admin(request)
                .send()
                .await
                .map_err(|e| self.http_error(e))?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                continue;
            }
            check_status(response).await?;
        }

        debug!(%prefix, "Deleted cloud prefix");
        Ok(())
    }
}

/// Compute the request signature: sorted `k=v` pairs joined by `&`, then the
/// secret, hashed with SHA-256
pub fn sign_params(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn is_index(file: &str) -> bool {
    file == "index.html" || file == "index"
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    Err(StorageError::Api {
        status: status.as_u16(),
        message,
    })
}

struct FolderListing {
    name: String,
    link: String,
    has_index: bool,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    bytes: u64,
    resource_type: Option<ResourceType>,
}

#[derive(Debug, Deserialize)]
struct ResourcesResponse {
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    public_id: String,
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> CloudStorage {
        CloudStorage::new(CloudConfig::with_credentials("demo", "key", "secret")).unwrap()
    }

    #[test]
    fn test_sign_params_sorted() {
        let a = sign_params(
            &[("timestamp", "1".to_string()), ("public_id", "x".to_string())],
            "secret",
        );
        let b = sign_params(
            &[("public_id", "x".to_string()), ("timestamp", "1".to_string())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut expected = Sha256::new();
        expected.update(b"public_id=x&timestamp=1secret");
        assert_eq!(a, hex::encode(expected.finalize()));
    }

    #[test]
    fn test_sign_params_skips_empty() {
        let with_empty = sign_params(
            &[("public_id", "x".to_string()), ("folder", String::new())],
            "s",
        );
        let without = sign_params(&[("public_id", "x".to_string())], "s");
        assert_eq!(with_empty, without);
    }

    #[test]
    fn test_public_id_by_resource_type() {
        let store = storage();
        let raw = ObjectKey::parse("course", "index.html").unwrap();
        let image = ObjectKey::parse("course", "img/logo.png").unwrap();

        assert_eq!(store.public_id(&raw), "scorm_packages/course/index.html");
        assert_eq!(store.public_id(&image), "scorm_packages/course/img/logo");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = CloudStorage::new(CloudConfig::with_credentials("demo", "", "secret"));
        assert!(matches!(result, Err(StorageError::Configuration(_))));

        let bad_prefix = CloudConfig::with_credentials("demo", "k", "s").with_root_prefix("a/b");
        assert!(CloudStorage::new(bad_prefix).is_err());
    }
}
