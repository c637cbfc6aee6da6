use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use quill::{conversation::ConverseOptions, interpret::InterpretedResult};

use super::form::FormData;
use crate::error::ApiError;
use crate::state::AppState;

async fn chat(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InterpretedResult>, ApiError> {
    let mut form = FormData::from_multipart(multipart).await?;
    let is_first_turn = form.flag("is_first_message")?;
    let files = form.take_files("files");
    tracing::info!(files = files.len(), is_first_turn, "chat request");

    let result = state
        .conversation
        .converse(
            &state.chat_profile,
            form.text("prompt"),
            &files,
            ConverseOptions { is_first_turn },
        )
        .await?;
    Ok(Json(result))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .with_state(state)
}
