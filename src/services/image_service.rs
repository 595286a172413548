use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
const PRODUCT_IMAGE_DIR: &str = "products";

/// Public URL prefix that `upload_dir` is served under.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Returns the lowercased extension if the file name and size are acceptable.
pub fn validate_image(file_name: &str, len: usize) -> AppResult<String> {
    if len == 0 {
        return Err(AppError::BadRequest("Image file is required".into()));
    }
    if len > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(format!(
            "Image exceeds the {} MiB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));

    extension.ok_or_else(|| AppError::BadRequest("Invalid image file".into()))
}

/// Writes a product image under `upload_dir` and returns its public URL.
pub async fn save_product_image(
    upload_dir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> AppResult<String> {
    let extension = validate_image(file_name, bytes.len())?;

    let dir: PathBuf = upload_dir.join(PRODUCT_IMAGE_DIR);
    fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
    fs::write(dir.join(&stored_name), bytes)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    tracing::debug!(file = %stored_name, size = bytes.len(), "product image stored");
    Ok(format!("{UPLOADS_URL_PREFIX}/{PRODUCT_IMAGE_DIR}/{stored_name}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_extensions_case_insensitively() {
        assert_eq!(validate_image("photo.JPG", 10).unwrap(), "jpg");
        assert_eq!(validate_image("render.webp", 10).unwrap(), "webp");
    }

    #[test]
    fn rejects_unknown_extension_and_missing_extension() {
        assert!(validate_image("script.exe", 10).is_err());
        assert!(validate_image("noext", 10).is_err());
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        assert!(validate_image("a.png", 0).is_err());
        assert!(validate_image("a.png", MAX_IMAGE_BYTES).is_ok());
        assert!(validate_image("a.png", MAX_IMAGE_BYTES + 1).is_err());
    }

    #[tokio::test]
    async fn saved_image_lands_under_products_dir() {
        let root = std::env::temp_dir().join(format!("storefront-upload-{}", Uuid::new_v4()));
        let url = save_product_image(&root, "mug.png", b"\x89PNG").await.unwrap();

        assert!(url.starts_with("/uploads/products/"));
        assert!(url.ends_with(".png"));
        let stored = url.trim_start_matches("/uploads/");
        assert!(root.join(stored).exists());

        let _ = std::fs::remove_dir_all(&root);
    }
}
