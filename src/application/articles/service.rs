use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::counter;
use tracing::{debug, error};

use crate::application::ingest::IngestionPipeline;
use crate::application::repos::{ArticlesRepo, ArticlesWriteRepo, TopicsRepo, UsersRepo};
use crate::cache::{KeyBuilder, ListingCache};

#[derive(Clone)]
pub struct ListingService {
    pub(crate) reader: Arc<dyn ArticlesRepo>,
    pub(crate) writer: Arc<dyn ArticlesWriteRepo>,
    pub(crate) users: Arc<dyn UsersRepo>,
    pub(crate) topics: Arc<dyn TopicsRepo>,
    pub(crate) cache: Arc<dyn ListingCache>,
    pub(crate) keys: KeyBuilder,
    pub(crate) images: Option<IngestionPipeline>,
    /// Bumped before every sweep; a listing read under an older value is
    /// never left in the cache.
    generation: Arc<AtomicU64>,
}

impl ListingService {
    pub fn new(
        reader: Arc<dyn ArticlesRepo>,
        writer: Arc<dyn ArticlesWriteRepo>,
        users: Arc<dyn UsersRepo>,
        topics: Arc<dyn TopicsRepo>,
        cache: Arc<dyn ListingCache>,
        keys: KeyBuilder,
    ) -> Self {
        Self {
            reader,
            writer,
            users,
            topics,
            cache,
            keys,
            images: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Accept inline `data:image` values on create and update.
    pub fn with_ingestion(mut self, pipeline: IngestionPipeline) -> Self {
        self.images = Some(pipeline);
        self
    }

    pub(crate) fn listing_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop every cached listing. Failures are logged, never returned.
    pub(crate) async fn invalidate_listings(&self, op: &'static str, article_id: i64) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!(op, article_id, "sweeping listing cache after mutation");
        self.sweep_listings(op).await;
    }

    pub(crate) async fn sweep_listings(&self, op: &'static str) {
        let namespace = self.keys.namespace();
        match self.cache.invalidate_prefix(namespace).await {
            Ok(removed) => {
                counter!("newsdesk_listing_cache_invalidate_total").increment(1);
                debug!(op, prefix = namespace, removed, "listing cache invalidated");
            }
            Err(err) => {
                counter!("newsdesk_listing_cache_error_total", "op" => "invalidate").increment(1);
                error!(
                    op,
                    prefix = namespace,
                    error = %err,
                    "failed to invalidate listing cache"
                );
            }
        }
    }
}
