// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Cloud Storage client wrapper.

use crate::error::AppError;
use crate::storage::BlobStore;
use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::download::Range;
use google_cloud_storage::http::objects::get::GetObjectRequest;
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use std::path::Path;
use std::sync::Arc;

/// Cloud Storage client.
#[derive(Clone)]
pub struct GcsStorage {
    client: Option<Arc<Client>>,
}

impl GcsStorage {
    /// Create a new Cloud Storage client using ambient credentials.
    ///
    /// For local development with an emulator, set STORAGE_EMULATOR_HOST.
    pub async fn new() -> Result<Self, AppError> {
        if let Ok(host) = std::env::var("STORAGE_EMULATOR_HOST") {
            tracing::info!(endpoint = %host, "Using anonymous connection for Storage Emulator");
            let config = ClientConfig {
                storage_endpoint: host,
                ..ClientConfig::default().anonymous()
            };
            return Ok(Self {
                client: Some(Arc::new(Client::new(config))),
            });
        }

        let config = ClientConfig::default().with_auth().await.map_err(|e| {
            AppError::Storage(format!("Failed to create Cloud Storage auth config: {}", e))
        })?;

        tracing::info!("Connected to Cloud Storage");

        Ok(Self {
            client: Some(Arc::new(Client::new(config))),
        })
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All storage operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&Client, AppError> {
        self.client
            .as_deref()
            .ok_or_else(|| AppError::Storage("Storage not connected (offline mode)".to_string()))
    }
}

impl BlobStore for GcsStorage {
    async fn download_to(&self, bucket: &str, object: &str, dest: &Path) -> Result<(), AppError> {
        let request = GetObjectRequest {
            bucket: bucket.to_string(),
            object: object.to_string(),
            ..Default::default()
        };

        let bytes = self
            .get_client()?
            .download_object(&request, &Range::default())
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to download gs://{}/{}: {}", bucket, object, e))
            })?;

        tokio::fs::write(dest, &bytes).await?;

        tracing::debug!(bucket, object, bytes = bytes.len(), "Object downloaded");
        Ok(())
    }

    async fn upload_from(
        &self,
        bucket: &str,
        object: &str,
        src: &Path,
        content_type: &str,
    ) -> Result<(), AppError> {
        let bytes = tokio::fs::read(src).await?;
        let size = bytes.len();

        let mut media = Media::new(object.to_string());
        media.content_type = content_type.to_string().into();

        let request = UploadObjectRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };

        self.get_client()?
            .upload_object(&request, bytes, &UploadType::Simple(media))
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to upload gs://{}/{}: {}", bucket, object, e))
            })?;

        tracing::debug!(bucket, object, bytes = size, "Object uploaded");
        Ok(())
    }
}
