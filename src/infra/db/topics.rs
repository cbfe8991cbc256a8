use async_trait::async_trait;

use crate::application::repos::{RepoError, TopicsRepo};
use crate::domain::entities::Topic;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct TopicRow {
    id: i64,
    title: String,
    slug: String,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
        }
    }
}

#[async_trait]
impl TopicsRepo for PostgresRepositories {
    async fn find_topic(&self, id: i64) -> Result<Option<Topic>, RepoError> {
        sqlx::query_as::<_, TopicRow>("SELECT id, title, slug FROM topics WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map(|row| row.map(Topic::from))
            .map_err(map_sqlx_error)
    }

    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Topic>, RepoError> {
        let rows = sqlx::query_as::<_, TopicRow>(
            "SELECT t.id, t.title, t.slug FROM topics t \
             INNER JOIN article_topics art ON art.topic_id = t.id \
             WHERE art.article_id = $1 ORDER BY t.id",
        )
        .bind(article_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Topic::from).collect())
    }
}
