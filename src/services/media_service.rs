// src/services/media_service.rs

use std::path::Path;

use futures::future::{join_all, try_join_all};

use crate::error::ApiError;
use crate::media::{MediaStore, UploadedFile};

/// Photos accepted per request.
pub const MAX_FILES: usize = 10;
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
const IMAGE_TYPES: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

/// Both the MIME type and the filename extension must name an allowed image type.
pub fn check_image(filename: &str, content_type: Option<&str>) -> Result<(), ApiError> {
    let mime_ok = content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|essence| essence.trim().to_ascii_lowercase().strip_prefix("image/").map(str::to_owned))
        .is_some_and(|subtype| IMAGE_TYPES.contains(&subtype.as_str()));

    let ext_ok = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_TYPES.contains(&e.to_ascii_lowercase().as_str()));

    if mime_ok && ext_ok {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "Only image files are allowed ({}): '{}' rejected",
            IMAGE_TYPES.join(", "),
            filename
        )))
    }
}

pub fn check_size(filename: &str, size: usize) -> Result<(), ApiError> {
    if size > MAX_FILE_BYTES {
        return Err(ApiError::validation(format!(
            "File too large: '{}' exceeds the {} MB limit",
            filename,
            MAX_FILE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

pub fn check_count(count: usize, max: usize) -> Result<(), ApiError> {
    if count > max {
        return Err(ApiError::validation(format!("Too many files: at most {} allowed", max)));
    }
    Ok(())
}

/// Uploads every file concurrently. URLs come back in input order; the first
/// failure fails the whole batch.
pub async fn upload_all(media: &dyn MediaStore, files: &[UploadedFile]) -> Result<Vec<String>, ApiError> {
    let urls = try_join_all(files.iter().map(|f| media.upload(f))).await?;
    log::info!("Uploaded {} image(s)", urls.len());
    Ok(urls)
}

/// Removes images from the media host. Failures are logged and skipped.
pub async fn remove_all(media: &dyn MediaStore, urls: &[String]) {
    let results = join_all(urls.iter().map(|u| media.destroy(u))).await;
    for (url, result) in urls.iter().zip(results) {
        if let Err(e) = result {
            log::warn!("Could not delete image {}: {}", url, e);
        }
    }
}
