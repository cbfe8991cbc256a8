//! Article repository for a news platform: cached listings over Postgres and
//! ingestion of inline images into resized, published derivatives.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod media;
