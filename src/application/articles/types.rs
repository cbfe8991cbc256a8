use serde::Deserialize;
use thiserror::Error;

use crate::application::ingest::IngestError;
use crate::application::repos::RepoError;
use crate::domain::types::ArticleStatus;

/// Failure of a [`ListingService`](super::ListingService) operation.
#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("{op}: {entity} `{id}` not found")]
    NotFound {
        op: &'static str,
        entity: &'static str,
        id: i64,
    },
    #[error("{op}: {message}")]
    Validation { op: &'static str, message: String },
    #[error("{op}: title `{title}` is already used by another article")]
    DuplicateTitle { op: &'static str, title: String },
    #[error("{op}: image ingestion failed for article `{id}`: {source}")]
    Image {
        op: &'static str,
        id: i64,
        #[source]
        source: IngestError,
    },
    #[error("{op}: store failure{}: {source}", article_suffix(.id))]
    Repo {
        op: &'static str,
        id: Option<i64>,
        #[source]
        source: RepoError,
    },
}

fn article_suffix(id: &Option<i64>) -> String {
    id.map(|id| format!(" for article `{id}`"))
        .unwrap_or_default()
}

impl ArticleError {
    pub(crate) fn validation(op: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            op,
            message: message.into(),
        }
    }

    /// Wrap a store failure; a missing row becomes [`ArticleError::NotFound`].
    pub(crate) fn repo(op: &'static str, id: Option<i64>, source: RepoError) -> Self {
        match (source, id) {
            (RepoError::NotFound, Some(id)) => Self::NotFound {
                op,
                entity: "article",
                id,
            },
            (source, id) => Self::Repo { op, id, source },
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            ArticleError::NotFound { op, .. }
            | ArticleError::Validation { op, .. }
            | ArticleError::DuplicateTitle { op, .. }
            | ArticleError::Image { op, .. }
            | ArticleError::Repo { op, .. } => op,
        }
    }

    /// True when the caller's input was rejected.
    pub fn is_validation(&self) -> bool {
        match self {
            ArticleError::Validation { .. } | ArticleError::DuplicateTitle { .. } => true,
            ArticleError::Image { source, .. } => source.is_validation(),
            ArticleError::NotFound { .. } | ArticleError::Repo { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateArticleCommand {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    /// Either a `data:image/...;base64,` payload or a stored reference.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_caption: Option<String>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    pub writer_id: i64,
    #[serde(default)]
    pub topic_ids: Vec<i64>,
}

/// Partial update; empty or missing text fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateArticleCommand {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    /// Only `data:image` payloads replace the stored image.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_caption: Option<String>,
    pub editor_id: i64,
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

pub(crate) fn is_inline_image(value: &str) -> bool {
    value.starts_with("data:image")
}
