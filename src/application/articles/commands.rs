use time::OffsetDateTime;
use tracing::info;

use crate::application::repos::{CreateArticleParams, UpdateArticleParams};
use crate::domain::entities::Article;
use crate::domain::slug::{SlugError, derive_slug};
use crate::domain::types::ArticleStatus;

use super::service::ListingService;
use super::types::{
    ArticleError, CreateArticleCommand, UpdateArticleCommand, is_inline_image, non_empty,
};

impl ListingService {
    pub async fn create(&self, command: CreateArticleCommand) -> Result<Article, ArticleError> {
        const OP: &str = "create";

        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(ArticleError::validation(OP, "title is required"));
        }
        if command.writer_id <= 0 {
            return Err(ArticleError::validation(OP, "writer id is required"));
        }
        let status = command.status.unwrap_or(ArticleStatus::Draft);
        if status == ArticleStatus::Deleted {
            return Err(ArticleError::validation(
                OP,
                "articles cannot be created deleted",
            ));
        }
        let slug = resolve_slug(OP, &title, command.slug)?;

        if self
            .reader
            .title_exists(&title, None)
            .await
            .map_err(|source| ArticleError::repo(OP, None, source))?
        {
            return Err(ArticleError::DuplicateTitle { op: OP, title });
        }

        for &topic_id in &command.topic_ids {
            let found = self
                .topics
                .find_topic(topic_id)
                .await
                .map_err(|source| ArticleError::repo(OP, None, source))?;
            if found.is_none() {
                return Err(ArticleError::NotFound {
                    op: OP,
                    entity: "topic",
                    id: topic_id,
                });
            }
        }

        let id = self
            .writer
            .reserve_article_id()
            .await
            .map_err(|source| ArticleError::repo(OP, None, source))?;

        let image = match non_empty(command.image) {
            Some(image) if is_inline_image(&image) => {
                Some(self.ingest_image(OP, &image, id, command.writer_id).await?)
            }
            other => other,
        };

        let params = CreateArticleParams {
            id,
            title,
            slug,
            content: command.content,
            image,
            image_caption: non_empty(command.image_caption),
            status,
            publish_date: (status == ArticleStatus::Published).then(OffsetDateTime::now_utc),
            writer_id: command.writer_id,
            topic_ids: command.topic_ids,
        };
        let record = self
            .writer
            .create_article(params)
            .await
            .map_err(|source| ArticleError::repo(OP, Some(id), source))?;

        self.invalidate_listings(OP, id).await;
        info!(article_id = id, "article created");
        self.hydrate(OP, record).await
    }

    /// Replace the supplied fields. Empty text keeps the stored value and
    /// the editor is always replaced.
    pub async fn update(
        &self,
        id: i64,
        command: UpdateArticleCommand,
    ) -> Result<Article, ArticleError> {
        const OP: &str = "update";

        if command.editor_id <= 0 {
            return Err(ArticleError::validation(OP, "editor id is required"));
        }
        let current = self
            .reader
            .find_article(id)
            .await
            .map_err(|source| ArticleError::repo(OP, Some(id), source))?
            .ok_or(ArticleError::NotFound {
                op: OP,
                entity: "article",
                id,
            })?;

        let mut params = UpdateArticleParams {
            id,
            content: non_empty(command.content),
            image_caption: non_empty(command.image_caption),
            editor_id: Some(command.editor_id),
            updated_at: Some(OffsetDateTime::now_utc()),
            ..UpdateArticleParams::default()
        };

        if let Some(title) = non_empty(command.title).map(|title| title.trim().to_string()) {
            if self
                .reader
                .title_exists(&title, Some(id))
                .await
                .map_err(|source| ArticleError::repo(OP, Some(id), source))?
            {
                return Err(ArticleError::DuplicateTitle { op: OP, title });
            }
            params.slug = Some(resolve_slug(OP, &title, command.slug)?);
            params.title = Some(title);
        }

        if let Some(image) = command.image.filter(|image| is_inline_image(image)) {
            let owner = current.writer_ref().unwrap_or(command.editor_id);
            params.image = Some(self.ingest_image(OP, &image, id, owner).await?);
        }

        let record = self
            .writer
            .update_article(params)
            .await
            .map_err(|source| ArticleError::repo(OP, Some(id), source))?;

        self.invalidate_listings(OP, id).await;
        info!(article_id = id, "article updated");
        self.hydrate(OP, record).await
    }

    pub async fn publish(&self, id: i64, editor_id: i64) -> Result<Article, ArticleError> {
        const OP: &str = "publish";

        if editor_id <= 0 {
            return Err(ArticleError::validation(OP, "editor id is required"));
        }
        let record = self
            .writer
            .publish_article(id, editor_id, OffsetDateTime::now_utc())
            .await
            .map_err(|source| ArticleError::repo(OP, Some(id), source))?;

        self.invalidate_listings(OP, id).await;
        info!(article_id = id, editor_id, "article published");
        self.hydrate(OP, record).await
    }

    /// Mark the article deleted. The row is kept.
    pub async fn soft_delete(&self, id: i64) -> Result<Article, ArticleError> {
        const OP: &str = "soft_delete";

        let record = self
            .writer
            .soft_delete_article(id)
            .await
            .map_err(|source| ArticleError::repo(OP, Some(id), source))?;

        self.invalidate_listings(OP, id).await;
        info!(article_id = id, "article soft-deleted");
        self.hydrate(OP, record).await
    }

    async fn ingest_image(
        &self,
        op: &'static str,
        data_uri: &str,
        article_id: i64,
        owner_id: i64,
    ) -> Result<String, ArticleError> {
        let pipeline = self
            .images
            .as_ref()
            .ok_or_else(|| ArticleError::validation(op, "inline images are not accepted"))?;
        let variants = pipeline
            .ingest(data_uri, article_id, owner_id)
            .await
            .map_err(|source| ArticleError::Image {
                op,
                id: article_id,
                source,
            })?;
        variants.shared().map(str::to_string).ok_or_else(|| {
            ArticleError::validation(op, "image ingestion produced no shared derivative")
        })
    }
}

fn resolve_slug(
    op: &'static str,
    title: &str,
    supplied: Option<String>,
) -> Result<String, ArticleError> {
    if let Some(slug) = non_empty(supplied) {
        return Ok(slug.trim().to_string());
    }
    derive_slug(title).map_err(|err| match err {
        SlugError::EmptyInput | SlugError::Unrepresentable { .. } => {
            ArticleError::validation(op, format!("cannot derive a slug: {err}"))
        }
    })
}
