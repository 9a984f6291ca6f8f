//! S3 storage client implementation.

use std::time::Duration;

use cred_core::AppError;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use tracing::{debug, info};

/// S3 storage configuration.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Config {
    /// Parse S3 URL: `http://host:port/bucket-name/`
    pub fn from_url(
        url: &str,
        access_key_id: String,
        secret_access_key: String,
    ) -> Result<Self, AppError> {
        let url = url.trim_end_matches('/');
        let last_slash = url
            .rfind('/')
            .ok_or_else(|| AppError::InvalidArgument("Invalid S3 URL format".to_string()))?;

        let (endpoint, bucket) = url.split_at(last_slash);
        let bucket = &bucket[1..]; // Skip the slash

        if bucket.is_empty() {
            return Err(AppError::InvalidArgument(
                "S3 URL must contain bucket name".to_string(),
            ));
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            bucket: bucket.to_string(),
            access_key_id,
            secret_access_key,
        })
    }
}

/// S3 storage client for uploaded registration documents.
///
/// Keys are chosen by the caller; this client only moves bytes.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl S3Storage {
    /// Create a new S3 storage client.
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "credentialing-service",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint)
            .region(Region::new("us-east-1")) // MinIO doesn't care about region
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        info!(bucket = %config.bucket, endpoint = %config.endpoint, "S3 storage initialized");

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket,
        }
    }

    /// Check if S3 is accessible.
    pub async fn health_check(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
    }

    /// Store a document under the given key.
    pub async fn put(&self, key: &str, content_type: &str, body: Vec<u8>) -> Result<(), AppError> {
        debug!(key = %key, size = body.len(), "Storing document");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = ?e, "S3 put failed");
                AppError::Internal(format!("Failed to store document: {e}"))
            })?;

        info!(key = %key, "Document stored");
        Ok(())
    }

    /// Fetch a document's bytes by key.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        debug!(key = %key, "Fetching document");

        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    AppError::not_found("Document file", key)
                } else {
                    AppError::Internal(format!("Failed to fetch document: {service_err}"))
                }
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read document body: {e}")))?;

        Ok(data.into_bytes().to_vec())
    }

    /// Build a presigned GET URL so reviewers can download a document
    /// without proxying the bytes through the service.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, AppError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| AppError::Internal(format!("Invalid presign expiry: {e}")))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = ?e, "S3 presign failed");
                AppError::Internal(format!("Failed to presign document URL: {e}"))
            })?;

        Ok(presigned.uri().to_string())
    }

    /// Delete a document by key. Deleting a missing key is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        debug!(key = %key, "Deleting document");

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = ?e, "S3 delete failed");
                AppError::Internal(format!("Failed to delete document: {e}"))
            })?;

        info!(key = %key, "Document deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_endpoint_and_bucket() {
        let config = S3Config::from_url(
            "http://localhost:9000/documents/",
            "minio".to_string(),
            "secret".to_string(),
        )
        .unwrap();

        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.bucket, "documents");
    }

    #[test]
    fn rejects_url_without_bucket() {
        let result = S3Config::from_url(
            "http://localhost:9000/",
            "minio".to_string(),
            "secret".to_string(),
        );
        assert!(result.is_err());
    }
}
