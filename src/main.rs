use std::{path::Path, process, sync::Arc};

use newsdesk::{
    application::{
        articles::{CreateArticleCommand, ListingService, UpdateArticleCommand},
        error::AppError,
        ingest::{IngestionPipeline, ObjectPublisher},
        listing::ListingQuery,
        repos::{ArticlesRepo, ArticlesWriteRepo, TopicsRepo, UsersRepo},
    },
    cache::KeyBuilder,
    config::{self, Command, Settings, StorageBackend},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        storage::{FilesystemPublisher, S3Publisher, S3PublisherConfig},
        telemetry,
    },
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let messages = error.messages();
    let client_error = error.is_client_error();
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?messages, client_error, "command failed");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?messages, client_error, "command failed");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command {
        Command::Migrate => run_migrate(&settings).await,
        Command::List(args) => {
            let query = ListingQuery::from_params(args.params())?;
            let service = build_listing_service(&settings).await?;
            print_json(&service.list(&query).await?)
        }
        Command::Show { id } => {
            let service = build_listing_service(&settings).await?;
            print_json(&service.get(id).await?)
        }
        Command::First => {
            let service = build_listing_service(&settings).await?;
            let article = service.find_first().await?;
            print_json(&article.ok_or_else(|| AppError::not_found("first article"))?)
        }
        Command::Last => {
            let service = build_listing_service(&settings).await?;
            let article = service.find_last().await?;
            print_json(&article.ok_or_else(|| AppError::not_found("last article"))?)
        }
        Command::Create { file } => {
            let command: CreateArticleCommand = read_json(&file).await?;
            let service = build_listing_service(&settings).await?;
            print_json(&service.create(command).await?)
        }
        Command::Update { id, file } => {
            let command: UpdateArticleCommand = read_json(&file).await?;
            let service = build_listing_service(&settings).await?;
            print_json(&service.update(id, command).await?)
        }
        Command::Publish { id, editor } => {
            let service = build_listing_service(&settings).await?;
            print_json(&service.publish(id, editor).await?)
        }
        Command::Delete { id } => {
            let service = build_listing_service(&settings).await?;
            print_json(&service.soft_delete(id).await?)
        }
        Command::Ingest {
            file,
            article_id,
            owner_id,
        } => {
            let data_uri = tokio::fs::read_to_string(&file)
                .await
                .map_err(|source| InfraError::input(&file, source))?;
            let pipeline = IngestionPipeline::new(build_publisher(&settings).await?);
            print_json(&pipeline.ingest(data_uri.trim(), article_id, owner_id).await?)
        }
    }
}

async fn run_migrate(settings: &Settings) -> Result<(), AppError> {
    let repositories = init_repositories(settings).await?;
    PostgresRepositories::run_migrations(repositories.pool())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;
    info!(target = "newsdesk::migrate", "migrations applied");
    Ok(())
}

async fn init_repositories(settings: &Settings) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| InfraError::database(err.to_string()))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn build_listing_service(settings: &Settings) -> Result<ListingService, AppError> {
    let repositories = init_repositories(settings).await?;
    let reader: Arc<dyn ArticlesRepo> = repositories.clone();
    let writer: Arc<dyn ArticlesWriteRepo> = repositories.clone();
    let users: Arc<dyn UsersRepo> = repositories.clone();
    let topics: Arc<dyn TopicsRepo> = repositories;

    let cache = settings.cache.build()?;
    let keys = KeyBuilder::new(settings.cache.namespace.clone(), settings.listing);

    let service = ListingService::new(reader, writer, users, topics, cache, keys);
    if settings.storage.public_base_url.is_none() {
        info!("storage.public_base_url is not set; inline images will be rejected");
        return Ok(service);
    }
    let pipeline = IngestionPipeline::new(build_publisher(settings).await?);
    Ok(service.with_ingestion(pipeline))
}

async fn build_publisher(settings: &Settings) -> Result<Arc<dyn ObjectPublisher>, AppError> {
    let layout = settings.storage.layout()?;
    let publisher: Arc<dyn ObjectPublisher> = match &settings.storage.backend {
        StorageBackend::Filesystem { directory } => Arc::new(
            FilesystemPublisher::new(directory.clone(), layout).map_err(|source| {
                InfraError::MediaDirectory {
                    directory: directory.clone(),
                    source,
                }
            })?,
        ),
        StorageBackend::S3 {
            bucket,
            region,
            endpoint_url,
        } => {
            let config = S3PublisherConfig {
                bucket: bucket.clone(),
                region: region.clone(),
                endpoint_url: endpoint_url.clone(),
            };
            Arc::new(S3Publisher::new(config, layout).await)
        }
    };
    Ok(publisher)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| InfraError::input(path, source))?;
    serde_json::from_slice(&raw).map_err(|err| {
        AppError::validation(format!("{} is not a valid command: {err}", path.display()))
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(InfraError::from)?;
    println!("{rendered}");
    Ok(())
}
