use metrics::counter;
use tracing::{debug, error, warn};

use crate::application::listing::ListingQuery;
use crate::domain::entities::{Article, ArticleRecord, User};

use super::service::ListingService;
use super::types::ArticleError;

impl ListingService {
    /// Cache-aside listing. A cache failure degrades to a store read.
    pub async fn list(&self, query: &ListingQuery) -> Result<Vec<Article>, ArticleError> {
        let key = self.keys.build_key(query);

        if let Some(articles) = self.cached_listing(&key).await {
            return Ok(articles);
        }

        let generation = self.listing_generation();
        let page = query.pagination(self.keys.limits());
        let records = self
            .reader
            .list_articles(query, page)
            .await
            .map_err(|source| ArticleError::repo("list", None, source))?;

        let mut articles = Vec::with_capacity(records.len());
        for record in records {
            articles.push(self.hydrate("list", record).await?);
        }

        self.store_listing(&key, &articles, generation).await;
        Ok(articles)
    }

    pub async fn get(&self, id: i64) -> Result<Article, ArticleError> {
        let record = self
            .reader
            .find_article(id)
            .await
            .map_err(|source| ArticleError::repo("get", Some(id), source))?
            .ok_or(ArticleError::NotFound {
                op: "get",
                entity: "article",
                id,
            })?;
        self.hydrate("get", record).await
    }

    /// Oldest article that is not deleted, if any.
    pub async fn find_first(&self) -> Result<Option<Article>, ArticleError> {
        let record = self
            .reader
            .find_first()
            .await
            .map_err(|source| ArticleError::repo("find_first", None, source))?;
        match record {
            Some(record) => self.hydrate("find_first", record).await.map(Some),
            None => Ok(None),
        }
    }

    /// Newest article that is not deleted, if any.
    pub async fn find_last(&self) -> Result<Option<Article>, ArticleError> {
        let record = self
            .reader
            .find_last()
            .await
            .map_err(|source| ArticleError::repo("find_last", None, source))?;
        match record {
            Some(record) => self.hydrate("find_last", record).await.map(Some),
            None => Ok(None),
        }
    }

    /// Resolve writer, editor and topics. Users come back without secrets.
    pub(crate) async fn hydrate(
        &self,
        op: &'static str,
        record: ArticleRecord,
    ) -> Result<Article, ArticleError> {
        let writer = self.resolve_user(op, record.writer_ref()).await?;
        let editor = self.resolve_user(op, record.editor_ref()).await?;
        let topics = self
            .topics
            .list_for_article(record.id)
            .await
            .map_err(|source| ArticleError::repo(op, Some(record.id), source))?;
        Ok(Article::from_record(record, writer, editor, topics))
    }

    async fn resolve_user(
        &self,
        op: &'static str,
        id: Option<i64>,
    ) -> Result<Option<User>, ArticleError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let user = self
            .users
            .find_user(id)
            .await
            .map_err(|source| ArticleError::Repo {
                op,
                id: None,
                source,
            })?
            .ok_or(ArticleError::NotFound {
                op,
                entity: "user",
                id,
            })?;
        Ok(Some(user.without_secret()))
    }

    async fn cached_listing(&self, key: &str) -> Option<Vec<Article>> {
        match self.cache.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str::<Vec<Article>>(&payload) {
                Ok(articles) => {
                    counter!("newsdesk_listing_cache_hit_total").increment(1);
                    debug!(key, "listing cache hit");
                    Some(articles)
                }
                Err(err) => {
                    counter!("newsdesk_listing_cache_error_total", "op" => "decode").increment(1);
                    warn!(key, error = %err, "discarding undecodable cached listing");
                    None
                }
            },
            Ok(None) => {
                counter!("newsdesk_listing_cache_miss_total").increment(1);
                debug!(key, "listing cache miss");
                None
            }
            Err(err) => {
                counter!("newsdesk_listing_cache_error_total", "op" => "get").increment(1);
                warn!(key, error = %err, "listing cache read failed");
                None
            }
        }
    }

    /// Cache a listing read under `generation`. A result that a mutation may
    /// have outdated is dropped, and one that raced a sweep is swept again.
    async fn store_listing(&self, key: &str, articles: &[Article], generation: u64) {
        if self.listing_generation() != generation {
            debug!(key, "listing outdated by a concurrent mutation; not cached");
            return;
        }
        let payload = match serde_json::to_string(articles) {
            Ok(payload) => payload,
            Err(err) => {
                counter!("newsdesk_listing_cache_error_total", "op" => "encode").increment(1);
                error!(key, error = %err, "failed to encode listing for cache");
                return;
            }
        };
        if let Err(err) = self.cache.put(key, &payload).await {
            counter!("newsdesk_listing_cache_error_total", "op" => "put").increment(1);
            error!(key, error = %err, "failed to store listing in cache");
            return;
        }
        if self.listing_generation() != generation {
            debug!(key, "mutation landed while caching listing; sweeping again");
            self.sweep_listings("list").await;
        }
    }
}
