//! Article reads behind the listing cache, and the mutations that sweep it.

mod commands;
mod queries;
mod service;
pub mod types;

pub use service::ListingService;
pub use types::{ArticleError, CreateArticleCommand, UpdateArticleCommand};
