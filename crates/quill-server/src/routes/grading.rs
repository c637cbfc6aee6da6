use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use quill::grading::{self, GradingContext};
use quill::interpret::InterpretedResult;
use serde_json::{json, Value};

use super::form::FormData;
use crate::error::ApiError;
use crate::state::AppState;

fn grading_context(form: &FormData) -> GradingContext {
    GradingContext::new(
        form.text_or_empty("problem_text"),
        form.text_or_empty("solution_text"),
        form.text_or_empty("correction_text"),
    )
}

async fn grade(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InterpretedResult>, ApiError> {
    let form = FormData::from_multipart(multipart).await?;
    tracing::info!("grading request");

    let result = grading::grade(
        &state.conversation,
        &state.grading_profile,
        form.text_or_empty("problem_text"),
        form.text_or_empty("solution_text"),
    )
    .await?;
    Ok(Json(result))
}

async fn start_grading_chat(multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let form = FormData::from_multipart(multipart).await?;
    let system_prompt = grading::follow_up_system_prompt(&grading_context(&form))?;
    Ok(Json(json!({ "system_prompt": system_prompt })))
}

async fn grading_follow_up(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InterpretedResult>, ApiError> {
    let form = FormData::from_multipart(multipart).await?;
    tracing::info!("grading follow-up request");

    let result = grading::follow_up(
        &state.conversation,
        &state.follow_up_profile,
        &grading_context(&form),
        form.text_or_empty("question"),
    )
    .await?;
    Ok(Json(result))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/grade", post(grade))
        .route("/start_grading_chat", post(start_grading_chat))
        .route("/grading_follow_up", post(grading_follow_up))
        .with_state(state)
}
