//! Filesystem blob store.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::chat::backend::document::StoreFuture;
use crate::chat::blob::blob_store::BlobStore;
use crate::chat::core::config::BlobConfig;
use crate::chat::core::errors::{BlobError, ChatError, ChatResult};

/// [`BlobStore`] writing each blob to `root/<path>`.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: Option<Url>,
}

impl FsBlobStore {
    /// Build a store from config.
    ///
    /// # Errors
    /// Returns an error if the public base URL is invalid.
    pub fn new(config: &BlobConfig) -> ChatResult<Self> {
        let public_base_url = config
            .public_base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|err| ChatError::InvalidConfig(format!("blob.public_base_url: {err}")))?;
        Ok(Self {
            root: config.root.clone(),
            public_base_url,
        })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(path);
        let plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if path.is_empty() || !plain {
            return Err(BlobError::Url(format!("blob path {path:?} is not relative")));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, path: &str, bytes: Vec<u8>) -> StoreFuture<'_, Result<(), BlobError>> {
        let path = path.to_string();
        Box::pin(async move {
            let target = self.resolve(&path)?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, bytes).await?;
            Ok(())
        })
    }

    fn download_url(&self, path: &str) -> StoreFuture<'_, Result<Url, BlobError>> {
        let path = path.to_string();
        Box::pin(async move {
            let target = self.resolve(&path)?;
            let absolute = tokio::fs::canonicalize(&target).await?;

            match &self.public_base_url {
                Some(base) => base
                    .join(&path)
                    .map_err(|err| BlobError::Url(err.to_string())),
                None => Url::from_file_path(&absolute)
                    .map_err(|()| BlobError::Url(format!("{} is not absolute", absolute.display()))),
            }
        })
    }
}
