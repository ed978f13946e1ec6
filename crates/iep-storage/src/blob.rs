// Blob storage for large content: OCR text, content blobs.
//
// Unified across backends via OpenDAL, the way the teacher wraps it for
// S3/R2/fs. IEP deployments only ever run on S3 (Lambda) or local fs (CLI
// dev), so R2 is not carried forward.

use async_trait::async_trait;
use opendal::Operator;

use crate::error::StorageError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn write(&self, path: &str, data: Vec<u8>) -> Result<(), StorageError>;
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct OpenDalBlobStore {
    operator: Operator,
}

impl OpenDalBlobStore {
    /// Storage backed by S3 (the Lambda deployment target).
    pub fn new_s3(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
    ) -> anyhow::Result<Self> {
        use opendal::services;

        let mut builder = services::S3::default().bucket(bucket).region(region);
        if let Some(ep) = endpoint {
            builder = builder.endpoint(ep);
        }

        let operator = Operator::new(builder)?.finish();
        Ok(Self { operator })
    }

    /// Storage backed by the local filesystem, for the CLI and tests.
    pub fn new_fs(root: &str) -> anyhow::Result<Self> {
        use opendal::services;

        let builder = services::Fs::default().root(root);
        let operator = Operator::new(builder)?.finish();
        Ok(Self { operator })
    }
}

#[async_trait]
impl BlobStore for OpenDalBlobStore {
    async fn write(&self, path: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.operator.write(path, data).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        match self.operator.read(path).await {
            Ok(data) => Ok(data.to_vec()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self.operator.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.operator.delete(path).await?;
        Ok(())
    }
}
