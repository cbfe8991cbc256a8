//! Image ingestion building blocks.
//!
//! | Step | Module |
//! |---|---|
//! | Parse data URI, read header width | [`classify`] |
//! | Decide derivative widths | [`plan`] |
//! | Decode, resize (Lanczos3), re-encode | [`transform`] |
//!
//! Publishing the results lives behind
//! [`ObjectPublisher`](crate::application::ingest::ObjectPublisher).

pub mod classify;
pub mod plan;
pub mod transform;
mod types;

pub use classify::classify;
pub use plan::{Variant, VariantPlan, plan_variants};
pub use transform::ImageTransformer;
pub use types::{EncodedImage, ImageError, ImageKind, ImagePayload};
