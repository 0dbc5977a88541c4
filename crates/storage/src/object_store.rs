//! Object storage interface for raster artifacts (MinIO/S3 compatible).

use bytes::Bytes;
use futures::future::try_join_all;
use object_store::{aws::AmazonS3Builder, memory::InMemory, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use sfms_common::{SfmsError, SfmsResult};

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "fire-weather".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

/// Object storage client for raster artifacts.
///
/// The store is the only shared mutable resource in the pipeline; no
/// stage ever writes another stage's address, so existence checks plus
/// plain puts are the whole coordination protocol.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> SfmsResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| SfmsError::storage(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// An isolated in-memory store, used by tests and local dry runs.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            bucket: "memory".to_string(),
        }
    }

    /// Write bytes to a key.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, key = %key))]
    pub async fn put(&self, key: &str, data: Bytes) -> SfmsResult<()> {
        let location = Path::from(key);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| SfmsError::storage(format!("Failed to write {}: {}", key, e)))?;

        Ok(())
    }

    /// Read bytes from a key.
    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    pub async fn get(&self, key: &str) -> SfmsResult<Bytes> {
        let location = Path::from(key);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| match e {
                object_store::Error::NotFound { .. } => SfmsError::missing_input(key),
                other => SfmsError::storage(format!("Failed to read {}: {}", key, other)),
            })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| SfmsError::storage(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> SfmsResult<bool> {
        let location = Path::from(key);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(SfmsError::storage(format!(
                "Failed to check {}: {}",
                key, e
            ))),
        }
    }

    /// Check several unrelated keys concurrently; true when all exist.
    pub async fn all_exist<I, S>(&self, keys: I) -> SfmsResult<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let checks = keys
            .into_iter()
            .map(|key| {
                let key = key.as_ref().to_string();
                async move { self.exists(&key).await }
            })
            .collect::<Vec<_>>();
        let results = try_join_all(checks).await?;
        Ok(results.into_iter().all(|found| found))
    }

    /// List keys with a given prefix.
    pub async fn list(&self, prefix: &str) -> SfmsResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut keys = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| SfmsError::storage(format!("List failed: {}", e)))?
        {
            keys.push(meta.location.to_string());
        }

        Ok(keys)
    }

    /// Delete an object.
    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    pub async fn delete(&self, key: &str) -> SfmsResult<()> {
        let location = Path::from(key);

        self.store
            .delete(&location)
            .await
            .map_err(|e| SfmsError::storage(format!("Failed to delete {}: {}", key, e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let storage = ObjectStorage::in_memory();
        storage
            .put("sfms/calculated/test.tif", Bytes::from_static(b"payload"))
            .await
            .unwrap();
        let data = storage.get("sfms/calculated/test.tif").await.unwrap();
        assert_eq!(&data[..], b"payload");
    }

    #[tokio::test]
    async fn test_exists() {
        let storage = ObjectStorage::in_memory();
        assert!(!storage.exists("missing.tif").await.unwrap());
        storage
            .put("present.tif", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(storage.exists("present.tif").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_is_missing_input() {
        let storage = ObjectStorage::in_memory();
        let err = storage.get("nope.tif").await.unwrap_err();
        assert!(matches!(err, SfmsError::MissingInput(_)));
    }

    #[tokio::test]
    async fn test_all_exist() {
        let storage = ObjectStorage::in_memory();
        storage.put("a.tif", Bytes::from_static(b"a")).await.unwrap();
        storage.put("b.tif", Bytes::from_static(b"b")).await.unwrap();
        assert!(storage.all_exist(["a.tif", "b.tif"]).await.unwrap());
        assert!(!storage.all_exist(["a.tif", "c.tif"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_prefix() {
        let storage = ObjectStorage::in_memory();
        storage
            .put("sfms/interpolated/temp/x.tif", Bytes::from_static(b"1"))
            .await
            .unwrap();
        storage
            .put("sfms/interpolated/rh/y.tif", Bytes::from_static(b"2"))
            .await
            .unwrap();
        let keys = storage.list("sfms/interpolated/temp").await.unwrap();
        assert_eq!(keys, vec!["sfms/interpolated/temp/x.tif".to_string()]);
    }
}
