//! Turns one inline data-URI image into a published set of derivatives.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::media::{
    EncodedImage, ImageError, ImageKind, ImagePayload, ImageTransformer, Variant, VariantPlan,
    classify, plan_variants,
};

/// Name of the derivative whose URL is stored on the article.
pub const SHARED_VARIANT: &str = "shared";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object path `{0}`")]
    InvalidPath(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("object storage error: {0}")]
    Backend(String),
}

/// Durable home for encoded derivatives.
#[async_trait]
pub trait ObjectPublisher: Send + Sync {
    /// Store `image` at `path` (`<folder>/<file>`) and return its public URL.
    /// `owner_id` is attached for attribution where the backend supports it.
    async fn upload(
        &self,
        image: &EncodedImage,
        path: &str,
        owner_id: i64,
    ) -> Result<String, StorageError>;
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("failed to render `{variant}` derivative: {source}")]
    Transform {
        variant: &'static str,
        #[source]
        source: ImageError,
    },
    #[error("failed to publish `{variant}` derivative to `{path}`: {source}")]
    Storage {
        variant: &'static str,
        path: String,
        #[source]
        source: StorageError,
    },
    #[error("image worker stopped unexpectedly: {0}")]
    Worker(String),
}

impl IngestError {
    /// True when the input itself was at fault rather than a collaborator.
    pub fn is_validation(&self) -> bool {
        match self {
            IngestError::Image(_) => true,
            IngestError::Transform { source, .. } => !matches!(
                source,
                ImageError::Codec {
                    operation: "encode",
                    ..
                }
            ),
            IngestError::Storage { .. } | IngestError::Worker(_) => false,
        }
    }
}

/// Variant name to public URL. Always holds [`SHARED_VARIANT`] on success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariantResult(BTreeMap<String, String>);

impl VariantResult {
    pub fn shared(&self) -> Option<&str> {
        self.get(SHARED_VARIANT)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, name: &str, url: String) {
        self.0.insert(name.to_string(), url);
    }
}

#[derive(Clone)]
pub struct IngestionPipeline {
    publisher: Arc<dyn ObjectPublisher>,
    transformer: ImageTransformer,
}

impl IngestionPipeline {
    pub fn new(publisher: Arc<dyn ObjectPublisher>) -> Self {
        Self {
            publisher,
            transformer: ImageTransformer::new(),
        }
    }

    /// Classify, render every planned derivative, then publish them.
    ///
    /// All rendering completes before the first upload, so input that fails
    /// to decode or resize never reaches storage. Any failure aborts the
    /// whole call.
    pub async fn ingest(
        &self,
        data_uri: &str,
        article_id: i64,
        owner_id: i64,
    ) -> Result<VariantResult, IngestError> {
        let payload = classify(data_uri)?;
        let file_name = stored_file_name(article_id, &payload.kind);
        let plan = plan_variants(&payload.kind, payload.width);
        debug!(
            article_id,
            format = payload.kind.subtype(),
            width = payload.width,
            variants = ?plan.names(),
            "planned image derivatives"
        );

        let transformer = self.transformer;
        let rendered = tokio::task::spawn_blocking(move || render_all(transformer, &payload, plan))
            .await
            .map_err(|err| IngestError::Worker(err.to_string()))??;

        let mut result = VariantResult::default();
        for (variant, image) in rendered {
            let path = format!("{}/{}", variant.folder, file_name);
            let url = self
                .publisher
                .upload(&image, &path, owner_id)
                .await
                .map_err(|source| IngestError::Storage {
                    variant: variant.name,
                    path: path.clone(),
                    source,
                })?;
            counter!("newsdesk_ingest_variant_total", "variant" => variant.name).increment(1);
            result.insert(variant.name, url);
        }

        info!(article_id, owner_id, variants = result.len(), "image ingested");
        Ok(result)
    }
}

/// `<sha256(article id)><random>.<ext>`: stable prefix per article, unique per call.
pub fn stored_file_name(article_id: i64, kind: &ImageKind) -> String {
    let digest = Sha256::digest(article_id.to_string().as_bytes());
    format!(
        "{}{}.{}",
        hex::encode(digest),
        Uuid::new_v4().simple(),
        kind.extension()
    )
}

fn render_all(
    transformer: ImageTransformer,
    payload: &ImagePayload,
    plan: VariantPlan,
) -> Result<Vec<(Variant, EncodedImage)>, IngestError> {
    let mut rendered = Vec::with_capacity(plan.len());

    if payload.kind == ImageKind::Gif {
        for variant in plan {
            let image = if variant.is_original_size() {
                EncodedImage::new(ImageKind::Gif, payload.bytes.clone())
            } else {
                transformer
                    .still_frame(&payload.bytes, variant.width)
                    .map_err(|source| IngestError::Transform {
                        variant: variant.name,
                        source,
                    })?
            };
            rendered.push((variant, image));
        }
        return Ok(rendered);
    }

    let mut variants = plan.into_iter();
    let Some(first) = variants.next() else {
        return Ok(rendered);
    };
    let decoded = transformer
        .decode(&payload.bytes, &payload.kind)
        .map_err(|source| IngestError::Transform {
            variant: first.name,
            source,
        })?;

    for variant in std::iter::once(first).chain(variants) {
        let image = transformer
            .render(&decoded, &payload.kind, variant.width)
            .map_err(|source| IngestError::Transform {
                variant: variant.name,
                source,
            })?;
        rendered.push((variant, image));
    }
    Ok(rendered)
}
