use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// 50 MB upload limit
pub const MAX_UPLOAD_SIZE: usize = 50 * 1024 * 1024;

/// Upload destinations under the media root.
#[derive(Debug, Clone, Copy)]
pub enum MediaKind {
    ProfilePicture,
    CoverPicture,
    PostPicture,
    PostVideo,
    Thumbnail,
}

impl MediaKind {
    fn dir(self) -> &'static str {
        match self {
            MediaKind::ProfilePicture => "profile_pictures",
            MediaKind::CoverPicture => "cover_pictures",
            MediaKind::PostPicture => "post_pictures",
            MediaKind::PostVideo => "post_videos",
            MediaKind::Thumbnail => "thumbnails",
        }
    }
}

/// Stores uploaded blobs on local disk. Paths handed out are relative to
/// the root and served under `/media`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to `{root}/{kind}/{uuid}` and return the relative path.
    pub async fn save(&self, kind: MediaKind, bytes: &[u8]) -> ApiResult<String> {
        if bytes.is_empty() {
            return Err(ApiError::validation("Upload body is empty"));
        }
        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(ApiError::PayloadTooLarge(MAX_UPLOAD_SIZE));
        }

        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;

        let relative = format!("{}/{}", kind.dir(), Uuid::new_v4());
        let mut file = tokio::fs::File::create(self.root.join(&relative)).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        debug!("Stored {} bytes at {}", bytes.len(), relative);
        Ok(relative)
    }

    /// Best-effort removal of a stored file.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            warn!("Refusing to remove media outside root: {}", relative);
            return;
        };
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove media {}: {}", path.display(), e);
        }
    }

    /// Pass `result` through, removing the freshly saved `relative` file
    /// when recording it failed.
    pub async fn discard_on_error<T>(&self, relative: &str, result: ApiResult<T>) -> ApiResult<T> {
        if result.is_err() {
            self.remove(relative).await;
        }
        result
    }

    pub async fn remove_all(&self, paths: &[String]) {
        for path in paths {
            self.remove(path).await;
        }
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative);
        if rel.components().all(|c| matches!(c, Component::Normal(_))) {
            Some(self.root.join(rel))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let path = store.save(MediaKind::PostPicture, b"png").await.unwrap();
        assert!(path.starts_with("post_pictures/"));
        assert_eq!(tokio::fs::read(dir.path().join(&path)).await.unwrap(), b"png");

        store.remove(&path).await;
        assert!(!dir.path().join(&path).exists());
    }

    #[tokio::test]
    async fn empty_and_oversized_uploads_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        assert!(matches!(
            store.save(MediaKind::PostVideo, b"").await,
            Err(ApiError::Validation(_))
        ));
        let big = vec![0u8; MAX_UPLOAD_SIZE + 1];
        assert!(matches!(
            store.save(MediaKind::PostVideo, &big).await,
            Err(ApiError::PayloadTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn failed_records_discard_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let kept = store.save(MediaKind::Thumbnail, b"jpg").await.unwrap();
        assert_eq!(store.discard_on_error(&kept, Ok(7)).await.unwrap(), 7);
        assert!(dir.path().join(&kept).exists());

        let dropped = store.save(MediaKind::Thumbnail, b"jpg").await.unwrap();
        let result: ApiResult<()> = Err(ApiError::not_found("Post not found"));
        assert!(store.discard_on_error(&dropped, result).await.is_err());
        assert!(!dir.path().join(&dropped).exists());
    }

    #[test]
    fn traversal_is_not_resolved() {
        let store = MediaStore::new("/srv/media");
        assert!(store.resolve("../etc/passwd").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("post_pictures/abc").is_some());
    }
}
