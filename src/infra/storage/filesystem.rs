use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

use crate::application::ingest::{ObjectPublisher, StorageError};
use crate::media::EncodedImage;

use super::StorageLayout;

/// Publishes derivatives below a local directory served at the layout's base URL.
#[derive(Debug)]
pub struct FilesystemPublisher {
    root: PathBuf,
    layout: StorageLayout,
}

impl FilesystemPublisher {
    /// Root storage at `root`, creating it if necessary.
    pub fn new(root: PathBuf, layout: StorageLayout) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, layout })
    }

    /// Absolute location of a published `<folder>/<file>` path.
    pub fn absolute_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let key = self.layout.object_key(path);
        let relative = Path::new(&key);
        if relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            })
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectPublisher for FilesystemPublisher {
    async fn upload(
        &self,
        image: &EncodedImage,
        path: &str,
        owner_id: i64,
    ) -> Result<String, StorageError> {
        let absolute = self.absolute_path(path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        file.write_all(&image.bytes).await?;
        file.flush().await?;

        let checksum = hex::encode(Sha256::digest(&image.bytes));
        debug!(
            path,
            owner_id,
            size = image.bytes.len(),
            checksum = %checksum,
            "derivative written"
        );
        Ok(self.layout.public_url(path))
    }
}
