//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod storage;
pub mod telemetry;
