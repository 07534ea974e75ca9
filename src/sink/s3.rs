//! Object storage upload

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use crate::probe::errors::ProbeError;

#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// Upload the file at `local_path` under `key`
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), ProbeError>;
}

pub struct S3Uploader {
    client: aws_sdk_s3::Client,
    bucket: String,
    key_prefix: String,
}

impl S3Uploader {
    /// Build a client from the standard AWS credential chain
    pub async fn from_env(bucket: impl Into<String>, region: Option<String>, key_prefix: impl Into<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: bucket.into(),
            key_prefix: key_prefix.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_key(&self, key: &str) -> String {
        object_key(&self.key_prefix, key)
    }
}

fn object_key(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", prefix, key)
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    async fn upload(&self, local_path: &Path, key: &str) -> Result<(), ProbeError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| ProbeError::Persistence(format!("failed to read {}: {}", local_path.display(), e)))?;

        let object_key = self.object_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(body)
            .content_type("application/octet-stream")
            .send()
            .await
            .map_err(|e| ProbeError::Persistence(format!("s3 upload failed: {}", DisplayErrorContext(&e))))?;

        tracing::debug!(bucket = %self.bucket, key = %object_key, "Artifact uploaded");
        Ok(())
    }
}
