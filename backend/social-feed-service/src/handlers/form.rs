use crate::error::{ServiceError, ServiceResult};
use crate::services::FileUpload;
use actix_multipart::Multipart;
use futures::StreamExt;
use std::collections::HashMap;

/// Upper bound on a whole multipart body, above the largest bucket limit.
pub const MAX_FORM_BYTES: usize = 60 * 1024 * 1024;

/// Text fields plus at most one file part named `file`.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub file: Option<FileUpload>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Drain a multipart payload into memory.
pub async fn read_form(mut payload: Multipart, max_bytes: usize) -> ServiceResult<FormData> {
    let mut form = FormData::default();
    let mut total_bytes: usize = 0;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            tracing::warn!("malformed multipart body: {}", e);
            ServiceError::Validation("Malformed form data".to_string())
        })?;

        let (name, file_name) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => (String::new(), None),
        };
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::warn!(field = %name, "error reading form field: {}", e);
                ServiceError::Validation("Malformed form data".to_string())
            })?;
            total_bytes += chunk.len();
            if total_bytes > max_bytes {
                return Err(ServiceError::Validation(format!(
                    "Upload exceeds the {}MB request limit",
                    max_bytes / (1024 * 1024)
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if name == "file" {
            let file_name = file_name.unwrap_or_default();
            let content_type = content_type
                .or_else(|| {
                    guess_content_type(&file_name).map(|m| m.essence_str().to_string())
                })
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.essence_str().to_string());
            form.file = Some(FileUpload {
                file_name,
                content_type,
                bytes,
            });
        } else if !name.is_empty() {
            let value = String::from_utf8(bytes).map_err(|_| {
                ServiceError::Validation(format!("Field '{}' must be text", name))
            })?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

/// Minimal extension lookup for parts sent without a content type.
fn guess_content_type(file_name: &str) -> Option<mime::Mime> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    let guessed = match ext.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "webp" => "image/webp".parse().ok()?,
        "mp4" => "video/mp4".parse().ok()?,
        "mov" => "video/quicktime".parse().ok()?,
        "webm" => "video/webm".parse().ok()?,
        _ => return None,
    };
    Some(guessed)
}
