use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};

use webhook_cell::router::webhook_routes;
use webhook_cell::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Agenza booking assistant is running!" }))
        .merge(webhook_routes(state))
}
