//! Object publishers for ingested image derivatives.

mod filesystem;
mod s3;

pub use filesystem::FilesystemPublisher;
pub use s3::{S3Publisher, S3PublisherConfig};

/// Where objects live relative to the public base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    public_base_url: String,
    key_prefix: String,
}

impl StorageLayout {
    pub fn new(public_base_url: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        let key_prefix = key_prefix.into().trim_matches('/').to_string();
        Self {
            public_base_url,
            key_prefix,
        }
    }

    /// Storage key for a `<folder>/<file>` path.
    pub fn object_key(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if self.key_prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.key_prefix, path)
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, self.object_key(path))
    }
}
