use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::listing::{ListingQuery, Pagination};
use crate::application::repos::{
    ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, RepoError, UpdateArticleParams,
};
use crate::domain::entities::ArticleRecord;
use crate::domain::types::ArticleStatus;

use super::PostgresRepositories;
use super::util::{contains_pattern, map_sqlx_error};

const ARTICLE_COLUMNS: &str = "a.id, a.title, a.slug, a.content, a.image, a.image_caption, \
     a.status, a.publish_date, a.writer_id, a.editor_id, a.created_at, a.updated_at";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    slug: String,
    content: String,
    image: Option<String>,
    image_caption: Option<String>,
    status: ArticleStatus,
    publish_date: Option<OffsetDateTime>,
    writer_id: Option<i64>,
    editor_id: Option<i64>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ArticleRow> for ArticleRecord {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            image: row.image,
            image_caption: row.image_caption,
            status: row.status,
            publish_date: row.publish_date,
            writer_id: row.writer_id,
            editor_id: row.editor_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresRepositories {
    fn apply_listing_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, query: &'q ListingQuery) {
        match query.status {
            Some(status) => {
                qb.push(" AND a.status = ");
                qb.push_bind(status);
            }
            None => {
                qb.push(" AND a.status <> ");
                qb.push_bind(ArticleStatus::Deleted);
            }
        }

        if let Some(search) = query.search.as_deref().filter(|value| !value.is_empty()) {
            let pattern = contains_pattern(search);
            qb.push(" AND (a.title ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR a.content ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR t.title ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }

        if let Some(topic) = query.topic {
            qb.push(" AND art.topic_id = ");
            qb.push_bind(topic);
        }
    }

    async fn find_edge(&self, ascending: bool) -> Result<Option<ArticleRecord>, RepoError> {
        let direction = if ascending { "ASC" } else { "DESC" };
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a \
             WHERE a.status <> $1 ORDER BY a.id {direction} LIMIT 1"
        );
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(ArticleStatus::Deleted)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(ArticleRecord::from))
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ArticlesRepo for PostgresRepositories {
    async fn list_articles(
        &self,
        query: &ListingQuery,
        page: Pagination,
    ) -> Result<Vec<ArticleRecord>, RepoError> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(ARTICLE_COLUMNS);
        qb.push(
            " FROM articles a \
             LEFT JOIN article_topics art ON art.article_id = a.id \
             LEFT JOIN topics t ON t.id = art.topic_id \
             WHERE 1=1 ",
        );

        Self::apply_listing_filter(&mut qb, query);

        let field = query.sort_field();
        let order = query.sort_order();
        qb.push(" GROUP BY a.id ORDER BY ");
        qb.push(field.column());
        qb.push(" ");
        qb.push(order.keyword());
        if field.column() != "a.id" {
            qb.push(", a.id ");
            qb.push(order.keyword());
        }

        qb.push(" LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = qb
            .build_query_as::<ArticleRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ArticleRecord::from).collect())
    }

    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.id = $1");
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(ArticleRecord::from))
            .map_err(map_sqlx_error)
    }

    async fn find_first(&self) -> Result<Option<ArticleRecord>, RepoError> {
        self.find_edge(true).await
    }

    async fn find_last(&self) -> Result<Option<ArticleRecord>, RepoError> {
        self.find_edge(false).await
    }

    async fn title_exists(&self, title: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM articles \
             WHERE title = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(title)
        .bind(exclude_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ArticlesWriteRepo for PostgresRepositories {
    async fn reserve_article_id(&self) -> Result<i64, RepoError> {
        sqlx::query_scalar::<_, i64>("SELECT nextval(pg_get_serial_sequence('articles', 'id'))")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let sql = format!(
            "INSERT INTO articles AS a \
             (id, title, slug, content, image, image_caption, status, publish_date, writer_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(params.id)
            .bind(&params.title)
            .bind(&params.slug)
            .bind(&params.content)
            .bind(params.image.as_deref())
            .bind(params.image_caption.as_deref())
            .bind(params.status)
            .bind(params.publish_date)
            .bind(params.writer_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if !params.topic_ids.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> =
                QueryBuilder::new("INSERT INTO article_topics (article_id, topic_id) ");
            qb.push_values(params.topic_ids.iter(), |mut values, topic_id| {
                values.push_bind(params.id).push_bind(*topic_id);
            });
            qb.push(" ON CONFLICT DO NOTHING");
            qb.build()
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "UPDATE articles AS a SET \
             title = COALESCE($2, a.title), \
             slug = COALESCE($3, a.slug), \
             content = COALESCE($4, a.content), \
             image = COALESCE($5, a.image), \
             image_caption = COALESCE($6, a.image_caption), \
             editor_id = COALESCE($7, a.editor_id), \
             updated_at = COALESCE($8, now()) \
             WHERE a.id = $1 \
             RETURNING {ARTICLE_COLUMNS}"
        );
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(params.id)
            .bind(params.title.as_deref())
            .bind(params.slug.as_deref())
            .bind(params.content.as_deref())
            .bind(params.image.as_deref())
            .bind(params.image_caption.as_deref())
            .bind(params.editor_id)
            .bind(params.updated_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .map(ArticleRecord::from)
            .ok_or(RepoError::NotFound)
    }

    async fn publish_article(
        &self,
        id: i64,
        editor_id: i64,
        published_at: OffsetDateTime,
    ) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "UPDATE articles AS a SET status = $2, editor_id = $3, \
             publish_date = $4, updated_at = $4 \
             WHERE a.id = $1 RETURNING {ARTICLE_COLUMNS}"
        );
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .bind(ArticleStatus::Published)
            .bind(editor_id)
            .bind(published_at)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .map(ArticleRecord::from)
            .ok_or(RepoError::NotFound)
    }

    async fn soft_delete_article(&self, id: i64) -> Result<ArticleRecord, RepoError> {
        let sql = format!(
            "UPDATE articles AS a SET status = $2, updated_at = now() \
             WHERE a.id = $1 RETURNING {ARTICLE_COLUMNS}"
        );
        sqlx::query_as::<_, ArticleRow>(&sql)
            .bind(id)
            .bind(ArticleStatus::Deleted)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .map(ArticleRecord::from)
            .ok_or(RepoError::NotFound)
    }
}
