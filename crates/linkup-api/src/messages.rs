use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use linkup_db::messages::NewMessage;
use linkup_types::api::{
    ConversationQuery, HistoryQuery, HistoryResponse, MarkReadRequest, MarkReadResponse,
    SendMessageRequest, SendMessageResponse, ThreadsResponse, UnreadSummaryResponse,
};
use linkup_types::events::GatewayEvent;
use linkup_types::pager::Limit;

use crate::error::ApiError;
use crate::middleware::Caller;
use crate::state::{AppState, blocking};

/// POST /messages/send
///
/// The push to the receiver happens after the message is committed and
/// cannot fail the request; an offline receiver just picks it up from
/// history later.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    debug!(caller = caller.id, role = %caller.role, receiver = req.receiver_id, "Send message");
    let new_message = NewMessage {
        sender_id: caller.id,
        receiver_id: req.receiver_id,
        content: req.content,
        file_url: req.file_url,
        message_type: req.message_type,
    };
    let message = blocking(&state, move |db| db.send_message(new_message)).await?;

    let delivered = state
        .dispatcher
        .send_to_user(
            message.receiver_id,
            GatewayEvent::MessageNew {
                from: message.sender_id,
                to: message.receiver_id,
                message: message.clone(),
            },
        )
        .await;
    if delivered == 0 {
        debug!(receiver = message.receiver_id, "Receiver offline, message:new not pushed");
    }

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            success: true,
            message,
        }),
    ))
}

/// GET /messages/history?userId=&limit=&cursor=
pub async fn history(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Query(query), _): WithRejection<Query<HistoryQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = Limit::clamp(query.limit);
    let page = blocking(&state, move |db| {
        db.message_history(caller.id, query.user_id, limit, query.cursor)
    })
    .await?;

    Ok(Json(HistoryResponse {
        success: true,
        page,
    }))
}

/// GET /messages/conversation/{user_id}?limit=&before=
pub async fn conversation(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Path(other), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Query(query), _): WithRejection<Query<ConversationQuery>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = Limit::clamp(query.limit);
    let page = blocking(&state, move |db| {
        db.message_history(caller.id, other, limit, query.before)
    })
    .await?;

    Ok(Json(HistoryResponse {
        success: true,
        page,
    }))
}

/// GET /messages/threads
pub async fn threads(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let threads = blocking(&state, move |db| db.threads(caller.id)).await?;
    Ok(Json(ThreadsResponse {
        success: true,
        threads,
    }))
}

/// GET /messages/unread-count
pub async fn unread_summary(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = blocking(&state, move |db| db.unread_summary(caller.id)).await?;
    Ok(Json(UnreadSummaryResponse {
        success: true,
        summary,
    }))
}

/// POST /messages/mark-read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    WithRejection(Json(req), _): WithRejection<Json<MarkReadRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let updated_count = blocking(&state, move |db| db.mark_read(caller.id, req.user_id)).await?;
    Ok(Json(MarkReadResponse {
        success: true,
        updated_count,
    }))
}
