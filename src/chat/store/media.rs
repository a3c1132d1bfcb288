//! Profile picture upload.

use tracing::{info, warn};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{image_path, profile_picture_file_name};
use crate::chat::store::core::{ChatStore, require_email};

impl ChatStore {
    /// Store `bytes` under `images/{file_name}` and return its download URL.
    ///
    /// # Errors
    /// - `UploadFailed` if the bytes cannot be stored.
    /// - `DownloadUrlUnavailable` if they were stored but no URL resolves;
    ///   the blob stays in place unreferenced.
    pub async fn upload_profile_picture(&self, bytes: Vec<u8>, file_name: &str) -> ChatResult<Url> {
        let path = image_path(file_name);
        let size = bytes.len();

        if let Err(source) = self.blobs.put(&path, bytes).await {
            warn!(path = %path, error = %source, "upload failed");
            return Err(ChatError::UploadFailed { path, source });
        }

        match self.blobs.download_url(&path).await {
            Ok(url) => {
                info!(path = %path, size, url = %url, "profile picture uploaded");
                Ok(url)
            }
            Err(source) => {
                warn!(path = %path, error = %source, "uploaded blob has no download url");
                Err(ChatError::DownloadUrlUnavailable { path, source })
            }
        }
    }

    /// Upload the profile picture of `email` under its conventional file name.
    ///
    /// # Errors
    /// Same as [`Self::upload_profile_picture`], plus `InvalidEmail`.
    pub async fn upload_user_profile_picture(&self, email: &str, bytes: Vec<u8>) -> ChatResult<Url> {
        require_email(email)?;
        self.upload_profile_picture(bytes, &profile_picture_file_name(email))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::store::core::test_support::memory_store;

    #[tokio::test]
    async fn upload_returns_url_under_images() {
        let (store, _, blobs) = memory_store();
        let url = store
            .upload_user_profile_picture("alice@x.com", vec![0x89, 0x50])
            .await
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://cdn.example.com/images/alice-x-com_profile_picture.png"
        );
        assert_eq!(
            blobs.bytes("images/alice-x-com_profile_picture.png"),
            Some(vec![0x89, 0x50])
        );
    }

    #[tokio::test]
    async fn store_failure_is_upload_failed() {
        let (store, _, blobs) = memory_store();
        blobs.set_fail_puts(true);
        let err = store
            .upload_profile_picture(vec![1], "a.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::UploadFailed { ref path, .. } if path == "images/a.png"));
        assert_eq!(blobs.bytes("images/a.png"), None);
    }

    #[tokio::test]
    async fn url_failure_leaves_unreferenced_blob() {
        let (store, _, blobs) = memory_store();
        blobs.set_fail_urls(true);
        let err = store
            .upload_profile_picture(vec![1], "a.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::DownloadUrlUnavailable { .. }));
        assert_eq!(blobs.bytes("images/a.png"), Some(vec![1]));
    }
}
