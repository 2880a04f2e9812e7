//! Cover image storage.
//!
//! Uploads live behind [`CoverStore`]: a local-directory backend for
//! development and tests, and an S3-compatible backend for production.
//! `put` returns the public URL recorded on the book.

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use minio::s3::builders::ObjectToDelete;
use minio::s3::client::Client;
use minio::s3::creds::StaticProvider;
use minio::s3::http::BaseUrl;
use minio::s3::types::S3Api;
use std::path::{Path, PathBuf};

/// Object storage for uploaded cover images.
#[derive(Debug, Clone)]
pub enum CoverStore {
    /// Covers written under a local directory.
    Local(LocalCoverStore),
    /// Covers uploaded to an S3-compatible bucket.
    S3(S3CoverStore),
}

impl CoverStore {
    /// Build the store selected by the configuration.
    pub async fn from_config(cfg: &StorageConfig) -> Result<Self> {
        match cfg.backend.as_str() {
            "local" => Ok(Self::Local(LocalCoverStore::new(
                &cfg.root,
                cfg.public_url.as_deref(),
            )?)),
            "s3" => Ok(Self::S3(S3CoverStore::new(cfg).await?)),
            other => Err(AppError::Config(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }

    /// Store an object and return its public URL.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<String> {
        match self {
            Self::Local(store) => store.put(key, data),
            Self::S3(store) => store.put(key, data).await,
        }
    }

    /// Delete an object. Used for best-effort cleanup only.
    pub async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Self::Local(store) => store.delete(key),
            Self::S3(store) => store.delete(key).await,
        }
    }
}

/// Filesystem-backed cover store.
#[derive(Debug, Clone)]
pub struct LocalCoverStore {
    root: PathBuf,
    public_url: String,
}

impl LocalCoverStore {
    /// Create the store, ensuring the root directory exists.
    pub fn new(root: &Path, public_url: Option<&str>) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            public_url: public_url.unwrap_or("").trim_end_matches('/').to_string(),
        })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key.trim_start_matches('/'))
    }

    fn put(&self, key: &str, data: &[u8]) -> Result<String> {
        let path = self.key_path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crashed upload never leaves a partial file.
        let tmp = path.with_extension(format!("tmp.{}", std::process::id()));
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &path)?;

        Ok(format!("{}/{}", self.public_url, key.trim_start_matches('/')))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// S3-compatible cover store.
#[derive(Debug, Clone)]
pub struct S3CoverStore {
    client: Client,
    bucket: String,
    public_url: String,
}

impl S3CoverStore {
    /// Connect to the configured endpoint, creating the bucket if missing.
    pub async fn new(cfg: &StorageConfig) -> Result<Self> {
        if cfg.endpoint.is_empty() {
            return Err(AppError::Config(
                "storage.endpoint must be set for the s3 backend".to_string(),
            ));
        }
        if cfg.bucket.is_empty() {
            return Err(AppError::Config(
                "storage.bucket must be set for the s3 backend".to_string(),
            ));
        }

        let endpoint = if cfg.endpoint.contains("://") {
            cfg.endpoint.clone()
        } else {
            format!("https://{}", cfg.endpoint)
        };

        let base_url: BaseUrl = endpoint
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid s3 endpoint: {}", e)))?;
        let provider = StaticProvider::new(&cfg.access_key, &cfg.secret_key, None);
        let client = Client::new(base_url, Some(Box::new(provider)), None, None)
            .map_err(|e| AppError::Storage(format!("Failed to create s3 client: {}", e)))?;

        let public_url = cfg
            .public_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), cfg.bucket));

        let store = Self {
            client,
            bucket: cfg.bucket.clone(),
            public_url: public_url.trim_end_matches('/').to_string(),
        };

        store.ensure_bucket(&cfg.region).await?;
        Ok(store)
    }

    async fn ensure_bucket(&self, region: &str) -> Result<()> {
        let exists = self
            .client
            .bucket_exists(self.bucket.clone())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to check bucket: {}", e)))?
            .exists;

        if exists {
            return Ok(());
        }

        self.client
            .create_bucket(self.bucket.clone())
            .region(Some(region.to_string()))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create bucket: {}", e)))?;

        Ok(())
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<String> {
        let key = key.trim_start_matches('/');

        self.client
            .put_object_content(self.bucket.clone(), key.to_string(), data.to_vec())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to upload object: {}", e)))?;

        Ok(format!("{}/{}", self.public_url, key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.trim_start_matches('/');

        self.client
            .delete_object(self.bucket.clone(), ObjectToDelete::from(key.to_string()))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete object: {}", e)))?;

        Ok(())
    }
}
