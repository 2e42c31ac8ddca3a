use crate::config::S3Config;
use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// An image submitted with a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Client-supplied file name
    pub file_name: String,
    /// MIME type reported by the client
    pub content_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Errors raised by blob store backends
#[derive(Error, Debug)]
pub enum BlobStoreError {
    #[error("URL does not belong to this store: {0}")]
    ForeignUrl(String),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

/// Object storage for post images, addressed by durable URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an image under `path` and return its URL
    async fn upload(&self, path: &str, image: ImageUpload) -> Result<String, BlobStoreError>;

    /// Delete the object behind a URL previously returned by `upload`
    async fn delete(&self, url: &str) -> Result<(), BlobStoreError>;
}

/// S3 image store
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
    base_url: String,
    config: S3Config,
}

impl S3BlobStore {
    /// Create a new S3 image store
    pub async fn new(config: &S3Config) -> anyhow::Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "S3 image store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            base_url: public_base_url(config),
            config: config.clone(),
        })
    }

    /// Single-part upload for small images
    async fn simple_upload(&self, key: &str, image: ImageUpload) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(image.bytes))
            .content_type(&image.content_type)
            .metadata("original-file-name", sanitize_file_name(&image.file_name))
            .send()
            .await
            .context("Failed to upload image to S3")?;

        Ok(())
    }

    /// Multipart upload for large images
    async fn multipart_upload(&self, key: &str, image: ImageUpload) -> anyhow::Result<()> {
        let create_response = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(&image.content_type)
            .metadata("original-file-name", sanitize_file_name(&image.file_name))
            .send()
            .await
            .context("Failed to create multipart upload")?;

        let upload_id = create_response
            .upload_id()
            .context("No upload ID in response")?
            .to_string();

        match self.upload_parts(key, &upload_id, &image.bytes).await {
            Ok(completed_parts) => {
                let completed_upload = CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build();

                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(completed_upload)
                    .send()
                    .await
                    .context("Failed to complete multipart upload")?;

                Ok(())
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key = %key, error = %abort_err, "Failed to abort multipart upload");
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        bytes: &[u8],
    ) -> anyhow::Result<Vec<CompletedPart>> {
        let mut completed_parts = Vec::new();

        for (index, chunk) in bytes.chunks(self.config.part_size_bytes.max(1)).enumerate() {
            let part_number = i32::try_from(index + 1).context("Too many upload parts")?;

            let upload_part_response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await
                .context("Failed to upload part")?;

            completed_parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(upload_part_response.e_tag().unwrap_or_default())
                    .build(),
            );
        }

        Ok(completed_parts)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, image), fields(file_name = %image.file_name, size_bytes = image.len()))]
    async fn upload(&self, path: &str, image: ImageUpload) -> Result<String, BlobStoreError> {
        let key = object_key(path, &image.file_name);

        debug!(key = %key, "Uploading image to S3");

        if image.len() > self.config.multipart_threshold_bytes {
            self.multipart_upload(&key, image).await?;
        } else {
            self.simple_upload(&key, image).await?;
        }

        info!(key = %key, "Image uploaded successfully");

        Ok(format!("{}/{}", self.base_url, key))
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), BlobStoreError> {
        let key = key_from_url(&self.base_url, url)?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("Failed to delete image from S3")?;

        debug!(key = %key, "Image deleted from S3");
        Ok(())
    }
}

/// In-memory image store, keyed the same way as S3
pub struct InMemoryBlobStore {
    base_url: String,
    objects: RwLock<HashMap<String, ImageUpload>>,
}

impl InMemoryBlobStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            base_url: format!("memory://{bucket}"),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Whether an object currently exists behind `url`
    pub fn contains(&self, url: &str) -> bool {
        key_from_url(&self.base_url, url)
            .map(|key| self.objects.read().contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, path: &str, image: ImageUpload) -> Result<String, BlobStoreError> {
        let key = object_key(path, &image.file_name);
        let url = format!("{}/{}", self.base_url, key);
        self.objects.write().insert(key, image);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), BlobStoreError> {
        let key = key_from_url(&self.base_url, url)?;
        self.objects.write().remove(key);
        Ok(())
    }
}

/// Public URL prefix objects in this bucket are addressed by
fn public_base_url(config: &S3Config) -> String {
    match config.endpoint_url {
        Some(ref endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket),
        None => format!(
            "https://{}.s3.{}.amazonaws.com",
            config.bucket, config.region
        ),
    }
}

/// Generate a unique object key.
/// Format: {path}/{uuid}_{file_name}
fn object_key(path: &str, file_name: &str) -> String {
    let file_name = match sanitize_file_name(file_name) {
        name if name.is_empty() => "image".to_string(),
        name => name,
    };

    format!(
        "{path}/{id}_{file_name}",
        path = path.trim_matches('/'),
        id = Uuid::new_v4(),
        file_name = file_name
    )
}

/// Recover the object key from a URL issued under `base_url`
fn key_from_url<'a>(base_url: &str, url: &'a str) -> Result<&'a str, BlobStoreError> {
    url.strip_prefix(base_url)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|key| !key.is_empty())
        .ok_or_else(|| BlobStoreError::ForeignUrl(url.to_string()))
}

/// Sanitize a file name to prevent path traversal
fn sanitize_file_name(file_name: &str) -> String {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}
