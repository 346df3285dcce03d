use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use linkup_types::api::{
    ActionResponse, ConnectionRequestResponse, ConnectionsResponse, PendingRequestsResponse,
    RemoveResponse, SentRequestsResponse, StatsResponse, StatusResponse,
};
use linkup_types::models::Removal;

use crate::error::ApiError;
use crate::middleware::Caller;
use crate::state::{AppState, blocking};

type IdPath = WithRejection<Path<i64>, ApiError>;

/// POST /connections/{user_id}/send
pub async fn send_request(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Path(recipient), _): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    debug!(caller = caller.id, role = %caller.role, recipient, "Connection request");
    let connection_id =
        blocking(&state, move |db| db.request_connection(caller.id, recipient)).await?;

    Ok((
        StatusCode::CREATED,
        Json(ConnectionRequestResponse {
            success: true,
            message: "Connection request sent".into(),
            connection_id,
        }),
    ))
}

/// GET /connections/status/{user_id}
pub async fn status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Path(other), _): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let status = blocking(&state, move |db| db.connection_status(caller.id, other)).await?;
    Ok(Json(StatusResponse {
        success: true,
        status,
    }))
}

/// PUT /connections/{connection_id}/accept
pub async fn accept(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Path(connection_id), _): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |db| db.accept_connection(connection_id, caller.id)).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Connection accepted".into(),
    }))
}

/// PUT /connections/{connection_id}/reject
pub async fn reject(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Path(connection_id), _): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |db| db.reject_connection(connection_id, caller.id)).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Connection request rejected".into(),
    }))
}

/// DELETE /connections/{connection_id}/remove
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Path(connection_id), _): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let removal = blocking(&state, move |db| db.remove_connection(connection_id, caller.id)).await?;
    let message = match removal {
        Removal::Cancelled => "Connection request cancelled",
        Removal::Disconnected => "Connection removed",
    };
    Ok(Json(RemoveResponse {
        success: true,
        message: message.into(),
        removal,
    }))
}

/// GET /connections/my-connections
pub async fn my_connections(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let connections = blocking(&state, move |db| db.list_connections(caller.id)).await?;
    Ok(Json(ConnectionsResponse {
        success: true,
        connections,
    }))
}

/// GET /connections/pending-requests
pub async fn pending_requests(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let pending_requests = blocking(&state, move |db| db.pending_requests(caller.id)).await?;
    Ok(Json(PendingRequestsResponse {
        success: true,
        pending_requests,
    }))
}

/// GET /connections/sent-requests
pub async fn sent_requests(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let sent_requests = blocking(&state, move |db| db.sent_requests(caller.id)).await?;
    Ok(Json(SentRequestsResponse {
        success: true,
        sent_requests,
    }))
}

/// GET /connections/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = blocking(&state, move |db| db.connection_stats(caller.id)).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

/// GET /connections/stats/{user_id}
pub async fn stats_for_user(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): IdPath,
) -> Result<impl IntoResponse, ApiError> {
    let stats = blocking(&state, move |db| db.connection_stats(user_id)).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}
