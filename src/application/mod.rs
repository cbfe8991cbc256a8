//! Application services and the ports they depend on.

pub mod articles;
pub mod error;
pub mod ingest;
pub mod listing;
pub mod repos;
