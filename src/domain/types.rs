use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of an article (mirrors Postgres enum `article_status`).
///
/// `Deleted` is a soft marker: rows are never physically removed, and default
/// listings exclude them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "article_status", rename_all = "snake_case")]
pub enum ArticleStatus {
    Draft,
    Published,
    Deleted,
}

impl ArticleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
            ArticleStatus::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown article status `{0}`")]
pub struct UnknownStatus(pub String);

impl TryFrom<&str> for ArticleStatus {
    type Error = UnknownStatus;

    /// Accepts the snake_case names as well as the single-letter codes used by
    /// older clients (`D`, `P`, `X`).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "draft" | "D" => Ok(ArticleStatus::Draft),
            "published" | "P" => Ok(ArticleStatus::Published),
            "deleted" | "X" => Ok(ArticleStatus::Deleted),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
