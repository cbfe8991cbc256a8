//! In-memory collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat, RgbaImage};
use time::{Duration, OffsetDateTime};
use tokio::sync::Notify;

use newsdesk::application::articles::ListingService;
use newsdesk::application::ingest::{IngestionPipeline, ObjectPublisher, StorageError};
use newsdesk::application::listing::{ListingQuery, Pagination, SortField, SortOrder};
use newsdesk::application::repos::{
    ArticlesRepo, ArticlesWriteRepo, CreateArticleParams, RepoError, TopicsRepo,
    UpdateArticleParams, UsersRepo,
};
use newsdesk::cache::{CacheError, KeyBuilder, ListingCache, MemoryListingCache};
use newsdesk::domain::entities::{ArticleRecord, Topic, User};
use newsdesk::domain::types::ArticleStatus;
use newsdesk::media::EncodedImage;

pub const SECRET: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA";

pub fn user(id: i64, username: &str) -> User {
    User {
        id,
        name: username.to_uppercase(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: Some(SECRET.to_string()),
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

pub fn topic(id: i64, title: &str) -> Topic {
    Topic {
        id,
        title: title.to_string(),
        slug: title.to_lowercase().replace(' ', "-"),
    }
}

#[derive(Default)]
struct State {
    articles: BTreeMap<i64, ArticleRecord>,
    links: Vec<(i64, i64)>,
    users: HashMap<i64, User>,
    topics: BTreeMap<i64, Topic>,
    next_id: i64,
}

/// Article, user and topic store backed by plain collections.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    list_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, user: User) {
        self.state.lock().unwrap().users.insert(user.id, user);
    }

    pub fn add_topic(&self, topic: Topic) {
        self.state.lock().unwrap().topics.insert(topic.id, topic);
    }

    /// Insert an article directly, bypassing the service.
    pub fn seed(
        &self,
        title: &str,
        status: ArticleStatus,
        writer_id: Option<i64>,
        topic_ids: &[i64],
    ) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let stamp = OffsetDateTime::UNIX_EPOCH + Duration::seconds(id);
        state.articles.insert(
            id,
            ArticleRecord {
                id,
                title: title.to_string(),
                slug: title.to_lowercase().replace(' ', "-"),
                content: format!("{title} body"),
                image: None,
                image_caption: None,
                status,
                publish_date: (status == ArticleStatus::Published).then_some(stamp),
                writer_id,
                editor_id: None,
                created_at: stamp,
                updated_at: stamp,
            },
        );
        for topic_id in topic_ids {
            state.links.push((id, *topic_id));
        }
        id
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn article(&self, id: i64) -> Option<ArticleRecord> {
        self.state.lock().unwrap().articles.get(&id).cloned()
    }

    pub fn article_count(&self) -> usize {
        self.state.lock().unwrap().articles.len()
    }

    pub fn topics_of(&self, id: i64) -> Vec<i64> {
        self.state
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|(article, _)| *article == id)
            .map(|(_, topic)| *topic)
            .collect()
    }
}

fn matches(state: &State, record: &ArticleRecord, query: &ListingQuery) -> bool {
    let status_ok = match query.status {
        Some(status) => record.status == status,
        None => record.status != ArticleStatus::Deleted,
    };
    let linked: Vec<i64> = state
        .links
        .iter()
        .filter(|(article, _)| *article == record.id)
        .map(|(_, topic)| *topic)
        .collect();
    let search_ok = query.search.as_deref().is_none_or(|needle| {
        let needle = needle.to_lowercase();
        record.title.to_lowercase().contains(&needle)
            || record.content.to_lowercase().contains(&needle)
            || linked.iter().any(|topic| {
                state
                    .topics
                    .get(topic)
                    .is_some_and(|topic| topic.title.to_lowercase().contains(&needle))
            })
    });
    let topic_ok = query.topic.is_none_or(|topic| linked.contains(&topic));
    status_ok && search_ok && topic_ok
}

#[async_trait]
impl ArticlesRepo for InMemoryStore {
    async fn list_articles(
        &self,
        query: &ListingQuery,
        page: Pagination,
    ) -> Result<Vec<ArticleRecord>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        let mut rows: Vec<ArticleRecord> = state
            .articles
            .values()
            .filter(|record| matches(&state, record, query))
            .cloned()
            .collect();

        rows.sort_by(|a, b| match query.sort_field() {
            SortField::Title => a.title.cmp(&b.title).then(a.id.cmp(&b.id)),
            _ => a.id.cmp(&b.id),
        });
        if query.sort_order() == SortOrder::Desc {
            rows.reverse();
        }

        Ok(rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn find_article(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        Ok(self.article(id))
    }

    async fn find_first(&self) -> Result<Option<ArticleRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .articles
            .values()
            .find(|record| record.status != ArticleStatus::Deleted)
            .cloned())
    }

    async fn find_last(&self) -> Result<Option<ArticleRecord>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .articles
            .values()
            .rev()
            .find(|record| record.status != ArticleStatus::Deleted)
            .cloned())
    }

    async fn title_exists(&self, title: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .articles
            .values()
            .any(|record| record.title == title && Some(record.id) != exclude_id))
    }
}

#[async_trait]
impl ArticlesWriteRepo for InMemoryStore {
    async fn reserve_article_id(&self) -> Result<i64, RepoError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        Ok(state.next_id)
    }

    async fn create_article(
        &self,
        params: CreateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let now = OffsetDateTime::now_utc();
        let record = ArticleRecord {
            id: params.id,
            title: params.title,
            slug: params.slug,
            content: params.content,
            image: params.image,
            image_caption: params.image_caption,
            status: params.status,
            publish_date: params.publish_date,
            writer_id: Some(params.writer_id),
            editor_id: None,
            created_at: now,
            updated_at: now,
        };
        state.articles.insert(record.id, record.clone());
        for topic_id in params.topic_ids {
            state.links.push((record.id, topic_id));
        }
        Ok(record)
    }

    async fn update_article(
        &self,
        params: UpdateArticleParams,
    ) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .articles
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        if let Some(title) = params.title {
            record.title = title;
        }
        if let Some(slug) = params.slug {
            record.slug = slug;
        }
        if let Some(content) = params.content {
            record.content = content;
        }
        if let Some(image) = params.image {
            record.image = Some(image);
        }
        if let Some(caption) = params.image_caption {
            record.image_caption = Some(caption);
        }
        if let Some(editor) = params.editor_id {
            record.editor_id = Some(editor);
        }
        record.updated_at = params.updated_at.unwrap_or_else(OffsetDateTime::now_utc);
        Ok(record.clone())
    }

    async fn publish_article(
        &self,
        id: i64,
        editor_id: i64,
        published_at: OffsetDateTime,
    ) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let record = state.articles.get_mut(&id).ok_or(RepoError::NotFound)?;
        record.status = ArticleStatus::Published;
        record.editor_id = Some(editor_id);
        record.publish_date = Some(published_at);
        record.updated_at = published_at;
        Ok(record.clone())
    }

    async fn soft_delete_article(&self, id: i64) -> Result<ArticleRecord, RepoError> {
        let mut state = self.state.lock().unwrap();
        let record = state.articles.get_mut(&id).ok_or(RepoError::NotFound)?;
        record.status = ArticleStatus::Deleted;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn find_user(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.state.lock().unwrap().users.get(&id).cloned())
    }
}

#[async_trait]
impl TopicsRepo for InMemoryStore {
    async fn find_topic(&self, id: i64) -> Result<Option<Topic>, RepoError> {
        Ok(self.state.lock().unwrap().topics.get(&id).cloned())
    }

    async fn list_for_article(&self, article_id: i64) -> Result<Vec<Topic>, RepoError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .links
            .iter()
            .filter(|(article, _)| *article == article_id)
            .filter_map(|(_, topic)| state.topics.get(topic).cloned())
            .collect())
    }
}

/// Memory cache whose operations can be switched to fail.
pub struct FlakyCache {
    inner: MemoryListingCache,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub fail_sweeps: AtomicBool,
    pub sweeps: AtomicUsize,
}

impl FlakyCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryListingCache::new(NonZeroUsize::new(64).unwrap()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_sweeps: AtomicBool::new(false),
            sweeps: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl ListingCache for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Connection("read refused".into()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, payload: &str) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("write refused".into()));
        }
        self.inner.put(key, payload).await
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        if self.fail_sweeps.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("sweep refused".into()));
        }
        self.inner.invalidate_prefix(prefix).await
    }
}

/// Memory cache whose first `put` parks until the test releases it.
pub struct GatedCache {
    inner: MemoryListingCache,
    armed: AtomicBool,
    pub reached_put: Notify,
    pub release_put: Notify,
}

impl GatedCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryListingCache::new(NonZeroUsize::new(64).unwrap()),
            armed: AtomicBool::new(true),
            reached_put: Notify::new(),
            release_put: Notify::new(),
        })
    }
}

#[async_trait]
impl ListingCache for GatedCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, payload: &str) -> Result<(), CacheError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached_put.notify_one();
            self.release_put.notified().await;
        }
        self.inner.put(key, payload).await
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        self.inner.invalidate_prefix(prefix).await
    }
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub path: String,
    pub owner_id: i64,
    pub image: EncodedImage,
}

/// Publisher that keeps every upload in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    uploads: Mutex<Vec<Upload>>,
    pub fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectPublisher for RecordingPublisher {
    async fn upload(
        &self,
        image: &EncodedImage,
        path: &str,
        owner_id: i64,
    ) -> Result<String, StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("bucket unavailable".into()));
        }
        self.uploads.lock().unwrap().push(Upload {
            path: path.to_string(),
            owner_id,
            image: image.clone(),
        });
        Ok(format!("https://cdn.example.com/images/{path}"))
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<FlakyCache>,
    pub publisher: Arc<RecordingPublisher>,
    pub service: ListingService,
}

pub fn service_over(store: &Arc<InMemoryStore>, cache: Arc<dyn ListingCache>) -> ListingService {
    ListingService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        cache,
        KeyBuilder::default(),
    )
}

pub fn harness() -> Harness {
    let store = InMemoryStore::new();
    let cache = FlakyCache::new();
    let publisher = RecordingPublisher::new();
    let service = service_over(&store, cache.clone())
        .with_ingestion(IngestionPipeline::new(publisher.clone()));
    Harness {
        store,
        cache,
        publisher,
        service,
    }
}

pub fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(pixels).to_rgb8()),
        _ => DynamicImage::ImageRgba8(pixels),
    };
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), format)
        .unwrap();
    buffer
}

pub fn data_uri(subtype: &str, bytes: &[u8]) -> String {
    format!("data:image/{subtype};base64,{}", STANDARD.encode(bytes))
}

pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(bytes).unwrap();
    (image.width(), image.height())
}
