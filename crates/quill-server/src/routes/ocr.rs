use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use quill::normalize::NormalizedContent;
use serde_json::{json, Value};

use super::form::FormData;
use crate::error::ApiError;
use crate::state::AppState;

async fn ocr(State(state): State<AppState>, multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let mut form = FormData::from_multipart(multipart).await?;
    let Some(file) = form.take_files("file").into_iter().next() else {
        return Err(ApiError::BadRequest("file is required".to_string()));
    };
    tracing::info!(file = file.display_name(), "OCR request");

    match state.ocr.normalize(&file).await {
        NormalizedContent::PlainText(text) => Ok(Json(json!({ "text": text }))),
        NormalizedContent::ExtractionFailed(reason) | NormalizedContent::Unsupported(reason) => {
            Err(ApiError::BadRequest(reason))
        }
        NormalizedContent::InlineImage(_) => Err(ApiError::BadRequest(
            "Image was not transcribed".to_string(),
        )),
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new().route("/ocr", post(ocr)).with_state(state)
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{app, post_form, Part};
    use axum::http::StatusCode;
    use quill::prompts::OCR_INSTRUCTION;
    use quill::providers::mock::MockProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_ocr_image() {
        let provider = MockProvider::with_replies(["\\frac{a}{b}"]);
        let (status, body) = post_form(
            app(&provider),
            "/api/v1/ocr",
            &[Part::File {
                field: "file",
                filename: "formula.png",
                media_type: "image/png",
                data: b"abc",
            }],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"text": "\\frac{a}{b}"}));

        let call = &provider.calls()[0];
        assert_eq!(call.settings.model, "qwen-vl-ocr-latest");
        assert_eq!(call.settings.max_tokens, Some(2048));
        assert_eq!(call.messages[0].content[0].as_text(), Some(OCR_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_ocr_text_file_needs_no_model() {
        let provider = MockProvider::default();
        let (status, body) = post_form(
            app(&provider),
            "/api/v1/ocr",
            &[Part::File {
                field: "file",
                filename: "notes.txt",
                media_type: "text/plain",
                data: b"E = mc^2",
            }],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"text": "E = mc^2"}));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ocr_failure_is_bad_request() {
        let provider = MockProvider::failing("model overloaded");
        let (status, body) = post_form(
            app(&provider),
            "/api/v1/ocr",
            &[Part::File {
                field: "file",
                filename: "formula.png",
                media_type: "image/png",
                data: b"abc",
            }],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Error from AI service: model overloaded");
    }

    #[tokio::test]
    async fn test_ocr_unsupported() {
        let provider = MockProvider::default();
        let (status, body) = post_form(
            app(&provider),
            "/api/v1/ocr",
            &[Part::File {
                field: "file",
                filename: "archive.zip",
                media_type: "application/zip",
                data: b"PK",
            }],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unsupported file type: application/zip");
    }

    #[tokio::test]
    async fn test_ocr_missing_file() {
        let provider = MockProvider::default();
        let (status, body) =
            post_form(app(&provider), "/api/v1/ocr", &[Part::Text("prompt", "hi")]).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "file is required");
    }
}
