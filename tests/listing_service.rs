mod support;

use std::sync::atomic::Ordering;

use image::ImageFormat;
use newsdesk::application::articles::{ArticleError, CreateArticleCommand, UpdateArticleCommand};
use newsdesk::application::listing::ListingQuery;
use newsdesk::domain::types::ArticleStatus;

use support::{
    GatedCache, Harness, InMemoryStore, SECRET, data_uri, encode, harness, service_over, topic,
    user,
};

fn query(params: &[(&str, &str)]) -> ListingQuery {
    ListingQuery::from_params(params.iter().copied()).expect("valid listing query")
}

fn create_command(title: &str) -> CreateArticleCommand {
    CreateArticleCommand {
        title: title.to_string(),
        slug: None,
        content: format!("{title} body"),
        image: None,
        image_caption: None,
        status: None,
        writer_id: 1,
        topic_ids: Vec::new(),
    }
}

fn seeded() -> Harness {
    let h = harness();
    h.store.add_user(user(1, "rina"));
    h.store.add_user(user(2, "bayu"));
    h.store.add_topic(topic(10, "Politik"));
    h.store.add_topic(topic(11, "Cuaca"));
    h.store
        .seed("Sidang kabinet", ArticleStatus::Published, Some(1), &[10]);
    h.store.seed("Hujan deras", ArticleStatus::Draft, Some(1), &[11]);
    h.store.seed("Berita lama", ArticleStatus::Deleted, Some(2), &[]);
    h
}

fn titles(articles: &[newsdesk::domain::entities::Article]) -> Vec<&str> {
    articles.iter().map(|article| article.title.as_str()).collect()
}

#[tokio::test]
async fn repeated_listing_is_served_from_cache() {
    let h = seeded();
    let q = query(&[("status", "published")]);

    let first = h.service.list(&q).await.expect("first listing");
    let second = h.service.list(&q).await.expect("second listing");

    assert_eq!(h.store.list_calls(), 1);
    assert_eq!(titles(&first), titles(&second));
    assert_eq!(h.cache.len(), 1);
}

#[tokio::test]
async fn unset_status_hides_deleted_articles() {
    let h = seeded();

    let default = h.service.list(&query(&[])).await.expect("listing");
    assert_eq!(titles(&default), vec!["Hujan deras", "Sidang kabinet"]);

    let deleted = h
        .service
        .list(&query(&[("status", "deleted")]))
        .await
        .expect("deleted listing");
    assert_eq!(titles(&deleted), vec!["Berita lama"]);
}

#[tokio::test]
async fn filters_and_pages_are_cached_separately() {
    let h = seeded();

    let politics = h
        .service
        .list(&query(&[("topic", "10")]))
        .await
        .expect("topic listing");
    let weather = h
        .service
        .list(&query(&[("search", "cuaca")]))
        .await
        .expect("search listing");
    let second_page = h
        .service
        .list(&query(&[("limit", "1"), ("page", "2")]))
        .await
        .expect("second page");

    assert_eq!(titles(&politics), vec!["Sidang kabinet"]);
    assert_eq!(titles(&weather), vec!["Hujan deras"]);
    assert_eq!(titles(&second_page), vec!["Sidang kabinet"]);
    assert_eq!(h.store.list_calls(), 3);
    assert_eq!(h.cache.len(), 3);
}

#[tokio::test]
async fn every_mutation_forces_the_next_listing_to_recompute() {
    let h = seeded();
    let q = query(&[]);
    h.service.list(&q).await.expect("warm");
    assert_eq!(h.store.list_calls(), 1);

    let created = h
        .service
        .create(create_command("Pasar saham"))
        .await
        .expect("create");
    let listed = h.service.list(&q).await.expect("after create");
    assert_eq!(h.store.list_calls(), 2);
    assert_eq!(listed.first().map(|a| a.id), Some(created.id));

    h.service
        .update(
            created.id,
            UpdateArticleCommand {
                title: Some("Pasar saham menguat".into()),
                editor_id: 2,
                ..UpdateArticleCommand::default()
            },
        )
        .await
        .expect("update");
    let listed = h.service.list(&q).await.expect("after update");
    assert_eq!(h.store.list_calls(), 3);
    assert_eq!(listed[0].title, "Pasar saham menguat");

    h.service.publish(created.id, 2).await.expect("publish");
    let listed = h.service.list(&q).await.expect("after publish");
    assert_eq!(h.store.list_calls(), 4);
    assert_eq!(listed[0].status, ArticleStatus::Published);

    h.service.soft_delete(created.id).await.expect("soft delete");
    let listed = h.service.list(&q).await.expect("after delete");
    assert_eq!(h.store.list_calls(), 5);
    assert!(listed.iter().all(|article| article.id != created.id));

    assert_eq!(h.cache.sweeps.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn users_never_carry_their_secret() {
    let h = seeded();
    let first = h.service.find_first().await.expect("first").expect("some");
    let last = h.service.find_last().await.expect("last").expect("some");
    let fetched = h.service.get(first.id).await.expect("get");
    let listed = h.service.list(&query(&[])).await.expect("list");

    let mut articles = vec![first, last, fetched];
    articles.extend(listed);
    for article in &articles {
        let writer = article.writer.as_ref().expect("writer resolved");
        assert!(writer.password.is_none());
        let json = serde_json::to_string(article).expect("serialize");
        assert!(!json.contains(SECRET));
    }
}

#[tokio::test]
async fn first_and_last_skip_deleted_articles() {
    let h = seeded();
    let first = h.service.find_first().await.expect("first").expect("some");
    let last = h.service.find_last().await.expect("last").expect("some");
    assert_eq!(first.title, "Sidang kabinet");
    assert_eq!(last.title, "Hujan deras");

    let empty = harness();
    assert!(empty.service.find_first().await.expect("first").is_none());
    assert!(empty.service.find_last().await.expect("last").is_none());
}

#[tokio::test]
async fn article_without_writer_hydrates_with_none() {
    let h = seeded();
    let id = h.store.seed("Tanpa penulis", ArticleStatus::Draft, Some(0), &[]);

    let article = h.service.get(id).await.expect("get");
    assert!(article.writer.is_none());
    assert!(article.editor.is_none());
    assert!(article.topics.is_empty());
}

#[tokio::test]
async fn missing_article_is_not_found() {
    let h = seeded();
    let err = h.service.get(404).await.unwrap_err();
    assert!(matches!(
        err,
        ArticleError::NotFound {
            entity: "article",
            id: 404,
            ..
        }
    ));

    let err = h.service.publish(404, 2).await.unwrap_err();
    assert!(matches!(err, ArticleError::NotFound { op: "publish", .. }));
}

#[tokio::test]
async fn cache_failures_fall_back_to_the_store() {
    let h = seeded();
    h.cache.fail_reads.store(true, Ordering::SeqCst);
    h.cache.fail_writes.store(true, Ordering::SeqCst);
    h.cache.fail_sweeps.store(true, Ordering::SeqCst);

    let q = query(&[]);
    let first = h.service.list(&q).await.expect("listing despite cache");
    let second = h.service.list(&q).await.expect("listing despite cache");
    assert_eq!(titles(&first), titles(&second));
    assert_eq!(h.store.list_calls(), 2);

    let created = h
        .service
        .create(create_command("Gempa susulan"))
        .await
        .expect("mutation succeeds when the sweep fails");
    assert!(h.store.article(created.id).is_some());
}

#[tokio::test]
async fn create_defaults_to_draft_and_derives_slug() {
    let h = seeded();
    let mut command = create_command("Harga Beras Naik Lagi");
    command.topic_ids = vec![10, 11];

    let article = h.service.create(command).await.expect("create");

    assert_eq!(article.status, ArticleStatus::Draft);
    assert_eq!(article.slug, "harga-beras-naik-lagi");
    assert!(article.publish_date.is_none());
    assert_eq!(article.writer.as_ref().map(|w| w.id), Some(1));
    assert_eq!(h.store.topics_of(article.id), vec![10, 11]);
    assert_eq!(article.topics.len(), 2);
}

#[tokio::test]
async fn create_published_sets_publish_date() {
    let h = seeded();
    let mut command = create_command("Rilis langsung");
    command.status = Some(ArticleStatus::Published);

    let article = h.service.create(command).await.expect("create");
    assert!(article.publish_date.is_some());
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let h = seeded();

    let err = h.service.create(create_command("   ")).await.unwrap_err();
    assert!(err.is_validation());

    let err = h
        .service
        .create(create_command("Sidang kabinet"))
        .await
        .unwrap_err();
    assert!(matches!(err, ArticleError::DuplicateTitle { .. }));

    let mut command = create_command("Topik hilang");
    command.topic_ids = vec![99];
    let err = h.service.create(command).await.unwrap_err();
    assert!(matches!(
        err,
        ArticleError::NotFound {
            entity: "topic",
            id: 99,
            ..
        }
    ));

    let mut command = create_command("Sudah dihapus");
    command.status = Some(ArticleStatus::Deleted);
    assert!(h.service.create(command).await.unwrap_err().is_validation());

    assert_eq!(h.store.article_count(), 3);
    assert_eq!(h.cache.sweeps.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn create_ingests_inline_image() {
    let h = seeded();
    let mut command = create_command("Foto banjir");
    command.image = Some(data_uri("png", &encode(900, 300, ImageFormat::Png)));

    let article = h.service.create(command).await.expect("create");

    let image = article.image.expect("stored image url");
    assert!(image.starts_with("https://cdn.example.com/images/shared/"));
    assert!(image.ends_with(".png"));

    let uploads = h.publisher.uploads();
    let folders: Vec<&str> = uploads
        .iter()
        .map(|upload| upload.path.split('/').next().unwrap_or_default())
        .collect();
    assert_eq!(folders, vec!["shared", "shared_800", "shared_480", "shared_thumb", "shared_320"]);
    assert!(uploads.iter().all(|upload| upload.owner_id == 1));
}

#[tokio::test]
async fn create_with_broken_image_stores_nothing() {
    let h = seeded();
    let mut command = create_command("Foto rusak");
    command.image = Some("data:image/png;base64,not-an-image".to_string());

    let err = h.service.create(command).await.unwrap_err();

    assert!(matches!(err, ArticleError::Image { op: "create", .. }));
    assert!(err.is_validation());
    assert!(h.publisher.uploads().is_empty());
    assert_eq!(h.store.article_count(), 3);
}

#[tokio::test]
async fn stored_image_reference_is_kept_verbatim() {
    let h = seeded();
    let mut command = create_command("Foto arsip");
    command.image = Some("https://cdn.example.com/images/shared/archive.jpg".to_string());

    let article = h.service.create(command).await.expect("create");

    assert_eq!(
        article.image.as_deref(),
        Some("https://cdn.example.com/images/shared/archive.jpg")
    );
    assert!(h.publisher.uploads().is_empty());
}

#[tokio::test]
async fn update_keeps_fields_left_empty() {
    let h = seeded();
    let original = h.service.get(1).await.expect("get");

    let updated = h
        .service
        .update(
            1,
            UpdateArticleCommand {
                content: Some(String::new()),
                image_caption: Some("Suasana sidang".into()),
                editor_id: 2,
                ..UpdateArticleCommand::default()
            },
        )
        .await
        .expect("update");

    assert_eq!(updated.title, original.title);
    assert_eq!(updated.content, original.content);
    assert_eq!(updated.image_caption.as_deref(), Some("Suasana sidang"));
    assert_eq!(updated.editor.as_ref().map(|e| e.id), Some(2));
}

#[tokio::test]
async fn update_rejects_title_taken_by_another_article() {
    let h = seeded();

    let err = h
        .service
        .update(
            1,
            UpdateArticleCommand {
                title: Some("Hujan deras".into()),
                editor_id: 2,
                ..UpdateArticleCommand::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ArticleError::DuplicateTitle { op: "update", .. }));

    let same = h
        .service
        .update(
            1,
            UpdateArticleCommand {
                title: Some("Sidang kabinet".into()),
                editor_id: 2,
                ..UpdateArticleCommand::default()
            },
        )
        .await
        .expect("an article may keep its own title");
    assert_eq!(same.slug, "sidang-kabinet");
}

#[tokio::test]
async fn update_image_is_owned_by_the_writer() {
    let h = seeded();

    let updated = h
        .service
        .update(
            2,
            UpdateArticleCommand {
                image: Some(data_uri("png", &encode(400, 200, ImageFormat::Png))),
                editor_id: 2,
                ..UpdateArticleCommand::default()
            },
        )
        .await
        .expect("update");

    assert!(updated.image.is_some());
    let uploads = h.publisher.uploads();
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|upload| upload.owner_id == 1));
}

#[tokio::test]
async fn publish_and_delete_keep_the_row() {
    let h = seeded();

    let published = h.service.publish(2, 2).await.expect("publish");
    assert_eq!(published.status, ArticleStatus::Published);
    assert!(published.publish_date.is_some());
    assert_eq!(published.editor.as_ref().map(|e| e.id), Some(2));

    let deleted = h.service.soft_delete(2).await.expect("soft delete");
    assert_eq!(deleted.status, ArticleStatus::Deleted);
    assert_eq!(
        h.store.article(2).map(|record| record.status),
        Some(ArticleStatus::Deleted)
    );
}

#[tokio::test]
async fn listing_finishing_after_a_mutation_is_not_served_stale() {
    let store = InMemoryStore::new();
    store.add_user(user(1, "rina"));
    let id = store.seed("Sidang kabinet", ArticleStatus::Published, Some(1), &[]);
    let cache = GatedCache::new();
    let service = service_over(&store, cache.clone());

    let in_flight = {
        let service = service.clone();
        tokio::spawn(async move { service.list(&query(&[])).await })
    };
    cache.reached_put.notified().await;

    service.soft_delete(id).await.expect("soft delete");
    cache.release_put.notify_one();
    let stale = in_flight.await.expect("listing task").expect("listing");
    assert_eq!(titles(&stale), vec!["Sidang kabinet"]);

    let fresh = service.list(&query(&[])).await.expect("listing after delete");
    assert!(fresh.is_empty());
    assert_eq!(store.list_calls(), 2);
}
