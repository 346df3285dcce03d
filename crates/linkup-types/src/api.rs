use serde::{Deserialize, Serialize};

use crate::models::{
    ConnectionStats, Message, PairStatus, PartnerConnection, Removal, Role, ThreadSummary,
    UnreadEntry,
};
use crate::pager::Page;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub user_id: i64,
    pub name: String,
    pub role: Role,
    pub token: String,
}

// -- Generic envelopes --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

// -- Connections --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequestResponse {
    pub success: bool,
    pub message: String,
    pub connection_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub success: bool,
    pub message: String,
    pub removal: Removal,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub status: PairStatus,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub success: bool,
    pub connections: Vec<PartnerConnection>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequestsResponse {
    pub success: bool,
    pub pending_requests: Vec<PartnerConnection>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentRequestsResponse {
    pub success: bool,
    pub sent_requests: Vec<PartnerConnection>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: ConnectionStats,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: i64,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub message_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: Message,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: i64,
    pub limit: Option<i64>,
    pub cursor: Option<i64>,
}

/// Query for the path-addressed conversation route; `before` plays the
/// role of `cursor`.
#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub limit: Option<i64>,
    pub before: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub page: Page<Message>,
}

#[derive(Debug, Serialize)]
pub struct ThreadsResponse {
    pub success: bool,
    pub threads: Vec<ThreadSummary>,
}

#[derive(Debug, Serialize)]
pub struct UnreadSummaryResponse {
    pub success: bool,
    pub summary: Vec<UnreadEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MarkReadRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub success: bool,
    pub updated_count: usize,
}
