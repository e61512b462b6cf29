use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::{config::Region, primitives::ByteStream, Client as S3Client};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::models::{image_extension, PhotoPosition};

/// Progress photos in S3-compatible object storage
#[derive(Debug, Clone)]
pub struct StorageService {
    client: S3Client,
    bucket_name: String,
    url_expiry_seconds: u64,
}

impl StorageService {
    pub fn new(client: S3Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
            url_expiry_seconds: 3600,
        }
    }

    /// Build a client from the ambient AWS configuration, honouring a custom endpoint
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        let mut service = Self::new(S3Client::from_conf(s3_config), config.bucket.clone());
        service.set_url_expiry_seconds(config.url_expiry_seconds);
        service
    }

    /// Upload one progress photo and return its storage key
    pub async fn upload_photo(
        &self,
        user_id: Uuid,
        week_start: NaiveDate,
        position: PhotoPosition,
        content_type: &str,
        data: bytes::Bytes,
    ) -> Result<String> {
        let storage_key = photo_storage_key(user_id, week_start, position, content_type)
            .with_context(|| format!("Unsupported image type {}", content_type))?;

        info!(
            "Uploading photo to storage: bucket={}, key={}, size={}",
            self.bucket_name,
            storage_key,
            data.len()
        );

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&storage_key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .context("Failed to upload photo to S3")?;

        Ok(storage_key)
    }

    pub async fn generate_presigned_url(&self, storage_key: &str) -> Result<String> {
        let presigning_config = aws_sdk_s3::presigning::PresigningConfig::builder()
            .expires_in(Duration::from_secs(self.url_expiry_seconds))
            .build()
            .context("Failed to build presigning config")?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(storage_key)
            .presigned(presigning_config)
            .await
            .context("Failed to generate presigned URL")?;

        Ok(presigned_request.uri().to_string())
    }

    pub fn set_url_expiry_seconds(&mut self, seconds: u64) {
        self.url_expiry_seconds = seconds;
    }
}

/// `progress/{user_id}/{monday}/{position}.{ext}`, or `None` for an unsupported content type
pub fn photo_storage_key(
    user_id: Uuid,
    week_start: NaiveDate,
    position: PhotoPosition,
    content_type: &str,
) -> Option<String> {
    let extension = image_extension(content_type)?;
    Some(format!(
        "progress/{}/{}/{}.{}",
        user_id,
        week_start.format("%Y-%m-%d"),
        position.as_str(),
        extension
    ))
}
