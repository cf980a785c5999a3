pub mod middleware;
pub mod play_task;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

// Re-export the main handlers to make them easily accessible
// to the binary that will build the web server router.
pub use middleware::require_user;
pub use rest::{
    accept_challenge_handler, create_challenge_handler, get_challenge_handler,
    get_progress_handler, list_challenges_handler, start_challenge_handler,
};
pub use ws_handler::ws_handler;

/// Every route that needs a caller identity. Layers such as CORS are added by the binary.
pub fn api_router(app_state: Arc<state::AppState>) -> Router {
    Router::new()
        .route("/solo/progress", get(get_progress_handler))
        .route(
            "/challenges",
            post(create_challenge_handler).get(list_challenges_handler),
        )
        .route("/challenges/{id}", get(get_challenge_handler))
        .route("/challenges/{id}/accept", post(accept_challenge_handler))
        .route("/challenges/{id}/start", post(start_challenge_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn(require_user))
        .with_state(app_state)
}
