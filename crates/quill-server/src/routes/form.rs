use std::collections::HashMap;

use axum::extract::Multipart;
use quill::normalize::UploadedResource;

use crate::error::ApiError;

/// A multipart form read fully into memory
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<UploadedResource>>,
}

impl FormData {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let media_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?;
                    // browsers send an empty part for an untouched file input
                    if filename.is_empty() && data.is_empty() {
                        continue;
                    }
                    tracing::debug!(field = %name, file = %filename, size = data.len(), "received file");
                    form.files.entry(name).or_default().push(UploadedResource {
                        data,
                        media_type,
                        filename: Some(filename).filter(|f| !f.is_empty()),
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The value of a text field, empty when absent
    pub fn text_or_empty(&self, name: &str) -> &str {
        self.text(name).unwrap_or_default()
    }

    pub fn flag(&self, name: &str) -> Result<bool, ApiError> {
        let Some(value) = self.text(name) else {
            return Ok(false);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            _ => Err(ApiError::BadRequest(format!(
                "{} must be a boolean, got '{}'",
                name, value
            ))),
        }
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadedResource> {
        self.files.remove(name).unwrap_or_default()
    }
}
