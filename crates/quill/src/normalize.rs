//! Turns an uploaded file into something the conversation can carry.
//!
//! Normalization never fails a request: every problem with an individual
//! attachment becomes an [`NormalizedContent::ExtractionFailed`] or
//! [`NormalizedContent::Unsupported`] value whose text is shown to the model in
//! place of the file contents.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::models::content::ImageContent;
use crate::models::message::Message;
use crate::prompts::OCR_INSTRUCTION;
use crate::providers::base::{ModelSettings, Provider};

/// A file received at the request boundary
#[derive(Debug, Clone)]
pub struct UploadedResource {
    pub data: Bytes,
    pub media_type: Option<String>,
    pub filename: Option<String>,
}

impl UploadedResource {
    pub fn new<B: Into<Bytes>>(data: B, media_type: Option<&str>, filename: Option<&str>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.map(String::from),
            filename: filename.map(String::from),
        }
    }

    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("unnamed")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedContent {
    /// Text extracted from a text file, a PDF, or an image via OCR
    PlainText(String),
    /// An image kept as-is for a vision-capable conversational model
    InlineImage(ImageContent),
    /// Extraction was attempted and failed; carries a diagnostic
    ExtractionFailed(String),
    /// The media type is not one we know how to read
    Unsupported(String),
}

impl NormalizedContent {
    /// What goes into the transcript for this attachment; `None` for inline images
    pub fn transcript_text(&self) -> Option<&str> {
        match self {
            NormalizedContent::PlainText(text)
            | NormalizedContent::ExtractionFailed(text)
            | NormalizedContent::Unsupported(text) => Some(text),
            NormalizedContent::InlineImage(_) => None,
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            NormalizedContent::PlainText(_) | NormalizedContent::InlineImage(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MediaKind {
    Pdf,
    Text,
    Image(String),
    Other(String),
}

fn classify(media_type: Option<&str>) -> MediaKind {
    let Some(raw) = media_type.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return MediaKind::Other("none".to_string());
    };
    let Ok(parsed) = raw.parse::<mime::Mime>() else {
        return MediaKind::Other(raw.to_string());
    };

    // application/pdf, application/x-pdf
    if parsed.subtype().as_str().contains("pdf") {
        MediaKind::Pdf
    } else if parsed.type_() == mime::TEXT {
        MediaKind::Text
    } else if parsed.type_() == mime::IMAGE {
        MediaKind::Image(parsed.essence_str().to_string())
    } else {
        MediaKind::Other(raw.to_string())
    }
}

/// Which image handling a call site uses. Configuration picks one per endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ImageMode {
    /// Send the image itself to the conversational model
    #[default]
    PassThrough,
    /// Transcribe the image with the vision model and send the text
    EagerOcr,
}

/// Vision model used for eager OCR
#[derive(Clone)]
pub struct OcrEngine {
    provider: Arc<dyn Provider>,
    settings: ModelSettings,
}

impl OcrEngine {
    pub fn new(provider: Arc<dyn Provider>, settings: ModelSettings) -> Self {
        Self { provider, settings }
    }

    pub async fn extract(&self, image: &ImageContent) -> Result<String> {
        let message = Message::user()
            .with_text(OCR_INSTRUCTION)
            .with_content(image.clone().into());

        tracing::info!(model = %self.settings.model, "sending image OCR request");
        let (reply, _usage) = self
            .provider
            .complete("", &[message], &self.settings)
            .await?;
        tracing::info!("received OCR response");
        Ok(reply.text())
    }
}

#[derive(Clone)]
pub enum ImagePolicy {
    PassThrough,
    EagerOcr(OcrEngine),
}

impl ImagePolicy {
    pub fn from_mode(mode: ImageMode, ocr: OcrEngine) -> Self {
        match mode {
            ImageMode::PassThrough => ImagePolicy::PassThrough,
            ImageMode::EagerOcr => ImagePolicy::EagerOcr(ocr),
        }
    }

    pub fn mode(&self) -> ImageMode {
        match self {
            ImagePolicy::PassThrough => ImageMode::PassThrough,
            ImagePolicy::EagerOcr(_) => ImageMode::EagerOcr,
        }
    }
}

#[derive(Clone)]
pub struct Normalizer {
    image_policy: ImagePolicy,
}

impl Normalizer {
    pub fn new(image_policy: ImagePolicy) -> Self {
        Self { image_policy }
    }

    pub fn image_mode(&self) -> ImageMode {
        self.image_policy.mode()
    }

    pub async fn normalize(&self, resource: &UploadedResource) -> NormalizedContent {
        match classify(resource.media_type.as_deref()) {
            MediaKind::Pdf => match extract_pdf_text(resource.data.clone()).await {
                Ok(text) => NormalizedContent::PlainText(text),
                Err(e) => {
                    tracing::error!(file = resource.display_name(), "Error extracting PDF text: {}", e);
                    NormalizedContent::ExtractionFailed(format!("Error extracting PDF text: {}", e))
                }
            },
            MediaKind::Text => match std::str::from_utf8(&resource.data) {
                Ok(text) => NormalizedContent::PlainText(text.to_string()),
                Err(e) => {
                    tracing::error!(file = resource.display_name(), "Error decoding text file: {}", e);
                    NormalizedContent::ExtractionFailed(format!("Error decoding text file: {}", e))
                }
            },
            MediaKind::Image(mime_type) => {
                let image = ImageContent::from_bytes(&resource.data, mime_type);
                match &self.image_policy {
                    ImagePolicy::PassThrough => NormalizedContent::InlineImage(image),
                    ImagePolicy::EagerOcr(engine) => match engine.extract(&image).await {
                        Ok(text) => NormalizedContent::PlainText(text),
                        Err(e) => {
                            tracing::error!(file = resource.display_name(), "image OCR failed: {}", e);
                            NormalizedContent::ExtractionFailed(format!(
                                "Error from AI service: {}",
                                e
                            ))
                        }
                    },
                }
            }
            MediaKind::Other(media_type) => {
                tracing::warn!(
                    file = resource.display_name(),
                    media_type = %media_type,
                    "unsupported file type received"
                );
                NormalizedContent::Unsupported(format!("Unsupported file type: {}", media_type))
            }
        }
    }
}

/// Concatenate the text of every page in page order.
///
/// Parsing is CPU-bound, so it runs on the blocking pool.
pub async fn extract_pdf_text(data: Bytes) -> Result<String> {
    tokio::task::spawn_blocking(move || -> Result<String> {
        let document = lopdf::Document::load_mem(&data)?;
        let mut text = String::new();
        // get_pages is keyed by 1-based page number, so iteration is page order
        for page_number in document.get_pages().keys() {
            text.push_str(&document.extract_text(&[*page_number])?);
        }
        Ok(text)
    })
    .await
    .map_err(|e| anyhow!("PDF extraction task failed: {}", e))?
}
