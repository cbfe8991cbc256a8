use std::error::Error as StdError;

use thiserror::Error;

use crate::application::articles::ArticleError;
use crate::application::ingest::IngestError;
use crate::application::listing::ListingQueryError;
use crate::cache::CacheError;
use crate::config::LoadError;
use crate::infra::error::InfraError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Query(#[from] ListingQueryError),
    #[error(transparent)]
    Article(#[from] ArticleError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("validation failed: {0}")]
    Validation(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the failure was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        match self {
            AppError::Query(_) | AppError::Validation(_) | AppError::NotFound { .. } => true,
            AppError::Article(err) => {
                err.is_validation() || matches!(err, ArticleError::NotFound { .. })
            }
            AppError::Ingest(err) => err.is_validation(),
            AppError::Config(_) | AppError::Infra(_) | AppError::Cache(_) => false,
        }
    }

    /// The error message followed by every message in its source chain.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = self.source();
        while let Some(inner) = current {
            let message = inner.to_string();
            if messages.last() != Some(&message) {
                messages.push(message);
            }
            current = inner.source();
        }
        messages
    }
}
