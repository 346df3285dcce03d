use axum::{
    Json, Router, middleware,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, connections, messages};

/// REST surface. The gateway route and outer layers (CORS, tracing) are
/// added by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    // `{id}` is a user id for /send and a connection id for the actions.
    let protected_routes = Router::new()
        .route("/connections/{id}/send", post(connections::send_request))
        .route("/connections/{id}/accept", put(connections::accept))
        .route("/connections/{id}/reject", put(connections::reject))
        .route("/connections/{id}/remove", delete(connections::remove))
        .route("/connections/status/{user_id}", get(connections::status))
        .route("/connections/my-connections", get(connections::my_connections))
        .route("/connections/pending-requests", get(connections::pending_requests))
        .route("/connections/sent-requests", get(connections::sent_requests))
        .route("/connections/stats", get(connections::stats))
        .route("/connections/stats/{user_id}", get(connections::stats_for_user))
        .route("/messages/send", post(messages::send_message))
        .route("/messages/history", get(messages::history))
        .route("/messages/conversation/{user_id}", get(messages::conversation))
        .route("/messages/threads", get(messages::threads))
        .route("/messages/unread-count", get(messages::unread_summary))
        .route("/messages/mark-read", post(messages::mark_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "ok": true }))
}
