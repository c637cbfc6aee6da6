// Export route modules
pub mod chat;
pub mod form;
pub mod grading;
pub mod health;
pub mod ocr;

use axum::Router;

use crate::state::AppState;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    let api = Router::new()
        .merge(chat::routes(state.clone()))
        .merge(ocr::routes(state.clone()))
        .merge(grading::routes(state))
        .merge(health::routes());

    Router::new().nest("/api/v1", api)
}
