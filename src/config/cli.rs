use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the newsdesk binary.
#[derive(Debug, Parser)]
#[command(name = "newsdesk", version, about = "News article repository tools")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "NEWSDESK_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// List articles through the listing cache.
    List(ListArgs),
    /// Show one article by id.
    Show {
        id: i64,
    },
    /// Show the oldest article that is not deleted.
    First,
    /// Show the newest article that is not deleted.
    Last,
    /// Create an article from a JSON command file.
    Create {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Update an article from a JSON command file.
    Update {
        id: i64,
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Publish an article.
    Publish {
        id: i64,
        /// Id of the publishing editor.
        #[arg(long)]
        editor: i64,
    },
    /// Soft-delete an article.
    Delete {
        id: i64,
    },
    /// Ingest a data-URI image file and print the published derivatives.
    Ingest {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(long = "article-id")]
        article_id: i64,
        #[arg(long = "owner-id")]
        owner_id: i64,
    },
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    /// `draft`, `published` or `deleted`; unset lists everything but deleted.
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub topic: Option<String>,
    #[arg(long = "sort-by")]
    pub sort_by: Option<String>,
    #[arg(long)]
    pub order: Option<String>,
    #[arg(long)]
    pub page: Option<String>,
    #[arg(long)]
    pub limit: Option<String>,
}

impl ListArgs {
    /// Supplied filters as name/value pairs.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        [
            ("status", self.status.as_deref()),
            ("search", self.search.as_deref()),
            ("topic", self.topic.as_deref()),
            ("sortBy", self.sort_by.as_deref()),
            ("order", self.order.as_deref()),
            ("page", self.page.as_deref()),
            ("limit", self.limit.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect()
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the log level (`trace`, `debug`, `info`, ...).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        global = true,
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the cache backend (`memory`, `redis`, `disabled`).
    #[arg(long = "cache-backend", value_name = "BACKEND", global = true)]
    pub cache_backend: Option<String>,

    /// Override the filesystem storage directory.
    #[arg(
        long = "storage-directory",
        value_name = "PATH",
        global = true,
        value_hint = ValueHint::DirPath
    )]
    pub storage_directory: Option<PathBuf>,
}
