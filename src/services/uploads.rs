use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use uuid::Uuid;

/// Subdirectory of the static root holding recipe images.
pub const RECIPE_IMAGE_DIR: &str = "recipes";

pub struct UploadService;

impl UploadService {
    /// Store the `file` field of a multipart form as a recipe image.
    /// Returns the path relative to the static root, e.g. `recipes/<uuid>.jpg`.
    pub async fn save_recipe_image(upload_dir: &str, mut multipart: Multipart) -> anyhow::Result<String> {
        let mut file_data: Option<(Vec<u8>, String, String)> = None;

        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some("file") {
                continue;
            }
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?.to_vec();
            file_data = Some((bytes, filename, content_type));
        }

        let (bytes, filename, content_type) =
            file_data.ok_or_else(|| anyhow::anyhow!("No file field in upload"))?;
        if bytes.is_empty() {
            anyhow::bail!("Uploaded file is empty");
        }
        let ext = image_extension(&filename, &content_type)?;

        let dir = PathBuf::from(upload_dir).join(RECIPE_IMAGE_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let storage_name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&storage_name), &bytes).await?;

        tracing::info!("Stored recipe image {} ({} bytes)", storage_name, bytes.len());
        Ok(format!("{RECIPE_IMAGE_DIR}/{storage_name}"))
    }
}

/// Raster formats accepted for recipe photos, with the extension each is stored under.
const RASTER_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

/// Extension to store an image under. The content type must be one of
/// [`RASTER_TYPES`]; a filename extension is kept when it names the same type.
fn image_extension(filename: &str, content_type: &str) -> anyhow::Result<String> {
    let declared = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let Some(&(mime, default_ext)) = RASTER_TYPES.iter().find(|(m, _)| *m == declared) else {
        anyhow::bail!("Only PNG, JPEG, GIF or WebP images are accepted (got {content_type})");
    };

    let from_name = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| {
            mime_guess::from_ext(ext)
                .first()
                .is_some_and(|m| m.essence_str() == mime)
        });
    Ok(from_name.unwrap_or_else(|| default_ext.to_string()))
}
