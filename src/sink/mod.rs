//! Durable storage of probe results
//!
//! Each result becomes its own Parquet artifact, is uploaded to object
//! storage and then removed locally. A failed upload leaves the artifact on
//! disk.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::probe::errors::ProbeError;
use crate::probe::result::ProbeResult;

pub mod artifact;
pub mod s3;

pub use artifact::{artifact_name, result_schema, write_artifact, ArtifactNamer};
pub use s3::{ObjectUploader, S3Uploader};

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, result: &ProbeResult) -> Result<(), ProbeError>;
}

pub struct ArtifactSink {
    artifact_dir: PathBuf,
    uploader: Arc<dyn ObjectUploader>,
    namer: ArtifactNamer,
}

impl ArtifactSink {
    pub fn new(artifact_dir: impl Into<PathBuf>, uploader: Arc<dyn ObjectUploader>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            uploader,
            namer: ArtifactNamer::new(),
        }
    }
}

#[async_trait]
impl ResultSink for ArtifactSink {
    async fn persist(&self, result: &ProbeResult) -> Result<(), ProbeError> {
        let name = self.namer.next_name(chrono::Utc::now());
        let path = self.artifact_dir.join(&name);

        // Parquet writing is synchronous file I/O
        let write_path = path.clone();
        let row = result.clone();
        tokio::task::spawn_blocking(move || write_artifact(&write_path, &row))
            .await
            .map_err(|e| ProbeError::Persistence(format!("artifact writer panicked: {}", e)))??;

        self.uploader.upload(&path, &name).await?;
        tokio::fs::remove_file(&path).await?;

        tracing::debug!(artifact = %name, "Result persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockUploader;

    #[tokio::test]
    async fn test_persist_uploads_then_removes() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(MockUploader::new());
        let sink = ArtifactSink::new(dir.path(), uploader.clone());

        sink.persist(&ProbeResult::started_at(1, 43113)).await.unwrap();

        let uploads = uploader.uploads();
        assert_eq!(uploads.len(), 1);
        let (key, size) = &uploads[0];
        assert!(key.ends_with(".parquet"));
        assert_eq!(key.len(), "20220101_032921.parquet".len());
        assert!(*size > 0);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_persists_get_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(MockUploader::new());
        let sink = ArtifactSink::new(dir.path(), uploader.clone());

        let first = ProbeResult::started_at(1, 43113);
        let second = ProbeResult::started_at(2, 43113);
        let (a, b) = tokio::join!(sink.persist(&first), sink.persist(&second));
        a.unwrap();
        b.unwrap();

        let mut keys: Vec<String> = uploader.uploads().into_iter().map(|(key, _)| key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(MockUploader::failing());
        let sink = ArtifactSink::new(dir.path(), uploader);

        let err = sink
            .persist(&ProbeResult::started_at(1, 43113))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "persistence");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_artifact_dir_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Arc::new(MockUploader::new());
        let sink = ArtifactSink::new(dir.path().join("missing"), uploader.clone());

        let err = sink
            .persist(&ProbeResult::started_at(1, 43113))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "persistence");
        assert!(uploader.uploads().is_empty());
    }
}
