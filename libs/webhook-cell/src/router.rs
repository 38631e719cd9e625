use std::sync::Arc;

use axum::{
    routing::get,
    Router,
};

use crate::handlers;
use crate::models::AppState;

pub fn webhook_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/webhook",
            get(handlers::verify_webhook).post(handlers::receive_message),
        )
        .with_state(state)
}
