//! S3 implementation of [`RemoteStore`].
//!
//! Credentials come from the standard AWS chain (`AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`, profiles, instance metadata). The bucket and an
//! optional S3-compatible endpoint come from [`StoreSettings`].

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::StorageClass;
use aws_sdk_s3::Client;
use std::path::Path;
use tracing::{debug, error, info};

use crate::config::StoreSettings;
use crate::contract::RemoteStore;
use crate::error::StoreError;

/// Shared S3 handle for one bucket. Cheap to clone; safe for concurrent use.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the environment plus the optional endpoint override.
    pub async fn from_settings(settings: &StoreSettings) -> Self {
        let aws_config = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&aws_config);
        if let Some(endpoint_url) = &settings.endpoint_url {
            info!(endpoint_url = %endpoint_url, "Using custom S3 endpoint");
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }
        info!(bucket = %settings.bucket, "Initialized S3 store");
        Self::new(Client::from_conf(builder.build()), settings.bucket.clone())
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl RemoteStore for S3Store {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(|e| {
                    let message = format!("{}", aws_sdk_s3::error::DisplayErrorContext(&e));
                    error!(bucket = %self.bucket, prefix, error = %message, "ListObjectsV2 failed");
                    StoreError::List {
                        prefix: prefix.to_string(),
                        message,
                    }
                })?;

            keys.extend(res.contents().iter().filter_map(|o| o.key().map(str::to_string)));

            if res.is_truncated().unwrap_or(false) {
                continuation_token = res.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        debug!(prefix, count = keys.len(), "Listed keys");
        Ok(keys)
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        key: &str,
        storage_class: &str,
    ) -> Result<(), StoreError> {
        let upload_error = |message: String| StoreError::Upload {
            local_path: local_path.to_path_buf(),
            key: key.to_string(),
            message,
        };

        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            error!(path = %local_path.display(), error = ?e, "Failed to open file for upload");
            upload_error(e.to_string())
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .storage_class(StorageClass::from(storage_class))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                let message = format!("{}", aws_sdk_s3::error::DisplayErrorContext(&e));
                error!(key, error = %message, "PutObject failed");
                upload_error(message)
            })?;
        Ok(())
    }
}
