//! Multipart post submissions and image storage under the media root.

use std::path::{Path, PathBuf};

use actix_multipart::{Field, Multipart};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use blogicum_shared::dto::PostForm;

use crate::config::AppConfig;
use crate::middleware::error::{AppError, AppResult};

/// Directory under the media root holding post images.
pub const IMAGE_DIR: &str = "posts_images";

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Text fields are small; anything bigger is not a form we rendered.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// A post form as submitted, plus the image it carried.
#[derive(Debug, Default)]
pub struct PostSubmission {
    pub form: PostForm,
    pub image: Option<StoredImage>,
    /// Why the uploaded file was refused, reported on the `image` field.
    pub image_error: Option<String>,
}

impl PostSubmission {
    /// Removes the stored upload after a rejected submission.
    pub async fn discard_image(&mut self) {
        if let Some(image) = self.image.take() {
            image.discard().await;
        }
    }
}

/// An uploaded image already written under the media root.
#[derive(Debug)]
pub struct StoredImage {
    /// Path relative to the media root, as stored on the post.
    pub relative: String,
    path: PathBuf,
}

impl StoredImage {
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!(path = %self.path.display(), "Failed to remove upload: {}", e);
        }
    }
}

enum Upload {
    Stored(StoredImage),
    Rejected(String),
}

/// Lowercased extension of `filename` when it is an accepted image type.
pub fn image_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub async fn read_post_submission(
    mut payload: Multipart,
    config: &AppConfig,
) -> AppResult<PostSubmission> {
    let mut submission = PostSubmission::default();

    if let Err(e) = read_parts(&mut payload, &mut submission, config).await {
        submission.discard_image().await;
        return Err(e);
    }

    Ok(submission)
}

async fn read_parts(
    payload: &mut Multipart,
    submission: &mut PostSubmission,
    config: &AppConfig,
) -> AppResult<()> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;
        let name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();

        if name != "image" {
            let value = read_text(&mut field).await?;
            submission.form.set_field(&name, value);
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .unwrap_or_default()
            .to_string();
        if filename.is_empty() {
            // Browsers send an empty part when no file was chosen.
            drain(&mut field).await?;
            continue;
        }

        let Some(ext) = image_extension(&filename) else {
            drain(&mut field).await?;
            submission.image_error = Some(format!(
                "Upload a valid image. Allowed extensions are: {}.",
                ALLOWED_EXTENSIONS.join(", ")
            ));
            continue;
        };

        match store_image(&mut field, &ext, config).await? {
            Upload::Stored(image) => {
                submission.discard_image().await;
                submission.image = Some(image);
            }
            Upload::Rejected(reason) => submission.image_error = Some(reason),
        }
    }

    Ok(())
}

async fn store_image(field: &mut Field, ext: &str, config: &AppConfig) -> AppResult<Upload> {
    let dir = config.media_dir.join(IMAGE_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("Cannot create {}: {}", dir.display(), e)))?;

    let file_name = format!("{}.{}", Uuid::new_v4(), ext);
    let path = dir.join(&file_name);
    let mut file = tokio::fs::File::create(&path)
        .await
        .map_err(|e| AppError::Internal(format!("Cannot create {}: {}", path.display(), e)))?;

    let mut written = 0usize;
    while let Some(chunk) = field.next().await {
        let data = match chunk {
            Ok(data) => data,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(AppError::BadRequest(format!("Upload interrupted: {}", e)));
            }
        };
        written += data.len();
        if written > config.max_upload_bytes {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            drain(field).await?;
            return Ok(Upload::Rejected(format!(
                "File is too large. Maximum size is {} bytes.",
                config.max_upload_bytes
            )));
        }
        file.write_all(&data)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot write {}: {}", path.display(), e)))?;
    }
    file.flush()
        .await
        .map_err(|e| AppError::Internal(format!("Cannot write {}: {}", path.display(), e)))?;

    if written == 0 {
        let _ = tokio::fs::remove_file(&path).await;
        return Ok(Upload::Rejected("The submitted file is empty.".to_string()));
    }

    tracing::debug!(file = %file_name, bytes = written, "Image stored");
    Ok(Upload::Stored(StoredImage {
        relative: format!("{}/{}", IMAGE_DIR, file_name),
        path,
    }))
}

async fn read_text(field: &mut Field) -> AppResult<String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let data = chunk.map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;
        if bytes.len() + data.len() > MAX_TEXT_FIELD_BYTES {
            return Err(AppError::BadRequest("Form field too large".to_string()));
        }
        bytes.extend_from_slice(&data);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn drain(field: &mut Field) -> AppResult<()> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension_allow_list() {
        assert_eq!(image_extension("cat.PNG").as_deref(), Some("png"));
        assert_eq!(image_extension("photo.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(image_extension("anim.webp").as_deref(), Some("webp"));
        assert_eq!(image_extension("script.svg"), None);
        assert_eq!(image_extension("archive.tar.gz"), None);
        assert_eq!(image_extension("noext"), None);
    }
}
