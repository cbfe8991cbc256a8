//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::listing::{ListingQuery, Pagination};
use crate::domain::entities::{ArticleRecord, Topic, User};
use crate::domain::types::ArticleStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateArticleParams {
    /// Id drawn beforehand with [`ArticlesWriteRepo::reserve_article_id`].
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub image: Option<String>,
    pub image_caption: Option<String>,
    pub status: ArticleStatus,
    pub publish_date: Option<OffsetDateTime>,
    pub writer_id: i64,
    pub topic_ids: Vec<i64>,
}

/// Field replacement for an existing article. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateArticleParams {
    pub id: i64,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub image_caption: Option<String>,
    pub editor_id: Option<i64>,
    pub updated_at: Option<OffsetDateTime>,
}

#[async_trait]
pub trait ArticlesRepo: Send + Sync {
    /// Page of articles matching `query`. `status: None` excludes deleted rows.
    async fn list_articles(
        &self,
        query: &ListingQuery,
        page: Pagination,
    ) -> Result<Vec<ArticleRecord>, RepoError>;

    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError>;

    /// Lowest-id article that is not deleted.
    async fn find_first(&self) -> Result<Option<ArticleRecord>, RepoError>;

    /// Highest-id article that is not deleted.
    async fn find_last(&self) -> Result<Option<ArticleRecord>, RepoError>;

    async fn title_exists(&self, title: &str, exclude_id: Option<i64>) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ArticlesWriteRepo: Send + Sync {
    async fn reserve_article_id(&self) -> Result<i64, RepoError>;

    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError>;

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError>;

    async fn publish_article(
        &self,
        id: i64,
        editor_id: i64,
        published_at: OffsetDateTime,
    ) -> Result<ArticleRecord, RepoError>;

    async fn soft_delete_article(&self, id: i64) -> Result<ArticleRecord, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<User>, RepoError>;
}

#[async_trait]
pub trait TopicsRepo: Send + Sync {
    async fn find_topic(&self, id: i64) -> Result<Option<Topic>, RepoError>;

    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Topic>, RepoError>;
}
