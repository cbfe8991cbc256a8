use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, error, info};

use crate::application::ingest::{ObjectPublisher, StorageError};
use crate::media::EncodedImage;

use super::StorageLayout;

#[derive(Debug, Clone)]
pub struct S3PublisherConfig {
    pub bucket: String,
    pub region: String,
    /// Override for S3-compatible endpoints such as MinIO or LocalStack.
    pub endpoint_url: Option<String>,
}

/// Publishes derivatives as public S3 objects.
pub struct S3Publisher {
    client: aws_sdk_s3::Client,
    bucket: String,
    layout: StorageLayout,
}

impl std::fmt::Debug for S3Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Publisher")
            .field("bucket", &self.bucket)
            .field("layout", &self.layout)
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3Publisher {
    pub async fn new(config: S3PublisherConfig, layout: StorageLayout) -> Self {
        let mut loader =
            aws_config::from_env().region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            debug!(endpoint = %endpoint, "using custom S3 endpoint");
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if config.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: config.bucket,
            layout,
        }
    }

    /// Build around an existing client.
    pub fn with_client(client: aws_sdk_s3::Client, bucket: String, layout: StorageLayout) -> Self {
        Self {
            client,
            bucket,
            layout,
        }
    }
}

#[async_trait]
impl ObjectPublisher for S3Publisher {
    async fn upload(
        &self,
        image: &EncodedImage,
        path: &str,
        owner_id: i64,
    ) -> Result<String, StorageError> {
        let key = self.layout.object_key(path);
        debug!(bucket = %self.bucket, key = %key, size = image.bytes.len(), "uploading derivative");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(image.content_type())
            .metadata("owner-id", owner_id.to_string())
            .body(ByteStream::from(image.bytes.to_vec()))
            .send()
            .await
            .map_err(|err| {
                let message = err.to_string();
                error!(bucket = %self.bucket, key = %key, error = %message, "S3 put_object failed");
                StorageError::Backend(message)
            })?;

        info!(bucket = %self.bucket, key = %key, owner_id, "derivative uploaded");
        Ok(self.layout.public_url(path))
    }
}
