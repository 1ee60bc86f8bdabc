use chrono::Utc;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use super::models::DEFAULT_AVATAR;
use crate::shared::AppError;

pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Sub-directory of the public directory served under `/images`
pub const IMAGES_DIR: &str = "images";
/// Sub-directory of the images directory holding uploaded avatars
pub const AVATAR_DIR: &str = "Customer";

const ALLOWED: &[(&str, &[&str])] = &[
    ("jpeg", &["image/jpeg"]),
    ("jpg", &["image/jpeg", "image/jpg"]),
    ("png", &["image/png"]),
    ("gif", &["image/gif"]),
    ("webp", &["image/webp"]),
];

/// An avatar file received from a multipart upload
#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AvatarUpload {
    /// Checks extension, MIME type and size. Returns the normalised extension.
    pub fn validate(&self) -> Result<&'static str, AppError> {
        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let content_type = self.content_type.to_lowercase();

        let (ext, _) = ALLOWED
            .iter()
            .find(|(ext, mimes)| *ext == extension && mimes.contains(&content_type.as_str()))
            .ok_or_else(|| {
                AppError::Validation(
                    "Only image files are allowed (jpeg, jpg, png, gif, webp)".to_string(),
                )
            })?;

        if self.bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if self.bytes.len() > MAX_AVATAR_BYTES {
            return Err(AppError::Validation("Avatar must not exceed 5MB".to_string()));
        }

        Ok(*ext)
    }
}

/// Local-disk store for client avatars under `<public>/images/Customer`
#[derive(Debug, Clone)]
pub struct AvatarStore {
    images: PathBuf,
    dir: PathBuf,
}

impl AvatarStore {
    pub fn new(public_dir: impl AsRef<Path>) -> Self {
        let images = public_dir.as_ref().join(IMAGES_DIR);
        Self {
            dir: images.join(AVATAR_DIR),
            images,
        }
    }

    /// Root of the statically served images
    pub fn images_dir(&self) -> &Path {
        &self.images
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Validates and writes the upload; returns the stored file name
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.bytes.len()))]
    pub async fn save(&self, upload: &AvatarUpload) -> Result<String, AppError> {
        let extension = upload.validate()?;
        let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
        let file_name = format!(
            "avatar-{}-{}.{}",
            Utc::now().timestamp_millis(),
            suffix,
            extension
        );

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            warn!(error = %e, dir = %self.dir.display(), "Failed to create avatar directory");
            AppError::Internal
        })?;
        tokio::fs::write(self.path_for(&file_name), &upload.bytes)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to write avatar file");
                AppError::Internal
            })?;

        debug!(stored = %file_name, "Avatar stored");
        Ok(file_name)
    }

    /// Deletes a stored avatar. The shared default image and missing files are ignored.
    #[instrument(skip(self))]
    pub async fn remove(&self, file_name: &str) {
        if file_name.is_empty() || file_name == DEFAULT_AVATAR || file_name.contains(['/', '\\']) {
            return;
        }

        match tokio::fs::remove_file(self.path_for(file_name)).await {
            Ok(()) => debug!("Avatar removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(error = %e, "Failed to remove avatar file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn upload(name: &str, mime: &str, size: usize) -> AvatarUpload {
        AvatarUpload {
            file_name: name.to_string(),
            content_type: mime.to_string(),
            bytes: vec![7; size],
        }
    }

    #[rstest]
    #[case("me.png", "image/png", Some("png"))]
    #[case("ME.JPG", "image/jpeg", Some("jpg"))]
    #[case("me.webp", "image/webp", Some("webp"))]
    #[case("me.png", "text/plain", None)]
    #[case("me.exe", "image/png", None)]
    #[case("noext", "image/png", None)]
    fn test_validate_type(#[case] name: &str, #[case] mime: &str, #[case] expected: Option<&str>) {
        let result = upload(name, mime, 10).validate();
        match expected {
            Some(ext) => assert_eq!(result.unwrap(), ext),
            None => assert!(matches!(result, Err(AppError::Validation(_)))),
        }
    }

    #[test]
    fn test_validate_size_limit() {
        assert!(upload("a.gif", "image/gif", MAX_AVATAR_BYTES).validate().is_ok());
        assert!(matches!(
            upload("a.gif", "image/gif", MAX_AVATAR_BYTES + 1).validate(),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let root = std::env::temp_dir().join(format!("gymhub-avatar-{}", uuid::Uuid::new_v4()));
        let store = AvatarStore::new(&root);

        let name = store.save(&upload("me.png", "image/png", 32)).await.unwrap();
        assert!(name.starts_with("avatar-"));
        assert!(name.ends_with(".png"));
        assert!(store.path_for(&name).exists());

        store.remove(&name).await;
        assert!(!store.path_for(&name).exists());

        // Removing again or removing the default is a no-op
        store.remove(&name).await;
        store.remove(DEFAULT_AVATAR).await;

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
