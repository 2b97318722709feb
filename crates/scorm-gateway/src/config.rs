//! Gateway configuration

use anyhow::{bail, Context};
use scorm_storage::CloudConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage backend used by a deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under `public_dir`
    Local,
    /// Cloudinary-compatible media service
    Cloudinary,
}

/// Gateway server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Storage backend
    pub storage_backend: StorageBackend,
    /// Cloud API base URL
    pub cloud_api_url: String,
    /// Cloud account name
    pub cloud_name: Option<String>,
    /// Cloud API key
    pub cloud_api_key: Option<String>,
    /// Cloud API secret
    #[serde(skip_serializing)]
    pub cloud_api_secret: Option<String>,
    /// Cloud key prefix under which folders are stored
    pub cloud_root_prefix: String,
    /// The single frontend origin allowed by CORS
    pub cors_origin: String,
    /// Local storage root (also served statically)
    pub public_dir: PathBuf,
    /// Per-file chunk directories
    pub temp_dir: PathBuf,
    /// Merged chunked uploads
    pub uploads_dir: PathBuf,
    /// Folder used when an upload names none
    pub default_folder: String,
    /// Maximum `/upload` body size in bytes (0 disables the cap)
    pub max_upload_size: usize,
    /// Maximum `/upload-chunk` body size in bytes (0 disables the cap)
    pub max_chunk_size: usize,
    /// Maximum `totalChunks` a chunked upload may declare
    pub max_chunks: u32,
    /// Maximum number of file parts per upload
    pub max_files: usize,
    /// Maximum number of folders returned by a listing
    pub max_list_results: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            storage_backend: StorageBackend::Local,
            cloud_api_url: "https://api.cloudinary.com/v1_1".to_string(),
            cloud_name: None,
            cloud_api_key: None,
            cloud_api_secret: None,
            cloud_root_prefix: "scorm_packages".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            public_dir: PathBuf::from("public"),
            temp_dir: PathBuf::from("temp"),
            uploads_dir: PathBuf::from("uploads"),
            default_folder: "scorm_files".to_string(),
            max_upload_size: 150 * 1024 * 1024, // 150 MB
            max_chunk_size: 150 * 1024 * 1024,
            max_chunks: crate::chunks::DEFAULT_MAX_CHUNKS,
            max_files: 100,
            max_list_results: scorm_storage::DEFAULT_MAX_LIST_RESULTS,
        }
    }
}

impl GatewayConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the cloud backend configuration from the credential fields
    pub fn cloud_config(&self) -> anyhow::Result<CloudConfig> {
        let cloud_name = self
            .cloud_name
            .as_deref()
            .context("CLOUDINARY_CLOUD_NAME is required for the cloudinary backend")?;
        let api_key = self
            .cloud_api_key
            .as_deref()
            .context("CLOUDINARY_API_KEY is required for the cloudinary backend")?;
        let api_secret = self
            .cloud_api_secret
            .as_deref()
            .context("CLOUDINARY_API_SECRET is required for the cloudinary backend")?;

        Ok(CloudConfig::with_credentials(cloud_name, api_key, api_secret)
            .with_api_url(self.cloud_api_url.trim_end_matches('/'))
            .with_root_prefix(&self.cloud_root_prefix))
    }

    /// Check settings that cannot be expressed in the types
    pub fn validate(&self) -> anyhow::Result<()> {
        scorm_storage::FolderName::parse(&self.default_folder)
            .with_context(|| format!("invalid default folder '{}'", self.default_folder))?;
        if self.max_chunks == 0 {
            bail!("max_chunks must be at least 1");
        }
        if self.max_files == 0 {
            bail!("max_files must be at least 1");
        }
        if self.max_list_results == 0 {
            bail!("max_list_results must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_files, 100);
        assert_eq!(config.max_chunks, 10_000);
        assert_eq!(config.max_upload_size, 157_286_400);
        assert_eq!(config.max_list_results, 500);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cloud_config_requires_credentials() {
        let mut config = GatewayConfig {
            storage_backend: StorageBackend::Cloudinary,
            cloud_name: Some("demo".to_string()),
            cloud_api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(config.cloud_config().is_err());

        config.cloud_api_secret = Some("secret".to_string());
        let cloud = config.cloud_config().unwrap();
        assert_eq!(cloud.cloud_name, "demo");
        assert_eq!(cloud.root_prefix, "scorm_packages");
    }

    #[test]
    fn test_invalid_default_folder() {
        let config = GatewayConfig {
            default_folder: "../escape".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
