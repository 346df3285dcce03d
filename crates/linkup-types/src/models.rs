use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Alumni,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Alumni => "alumni",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "alumni" => Ok(Self::Alumni),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Persisted connection state. A rejected or cancelled request is deleted,
/// so there is deliberately no third variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Pending,
    Accepted,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

impl FromStr for ConnectionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            other => Err(format!("unknown connection status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub connection_id: i64,
    pub user_a: i64,
    pub user_b: i64,
    pub requester_id: i64,
    pub recipient_id: i64,
    pub status: ConnectionState,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Connection {
    /// Direction of a pending request as seen by `user_id`.
    pub fn direction_for(&self, user_id: i64) -> Option<Direction> {
        match self.status {
            ConnectionState::Pending if self.requester_id == user_id => Some(Direction::Outgoing),
            ConnectionState::Pending => Some(Direction::Incoming),
            ConnectionState::Accepted => None,
        }
    }

    pub fn involves(&self, user_id: i64) -> bool {
        self.requester_id == user_id || self.recipient_id == user_id
    }
}

/// Relationship between two users as seen from one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PairStatus {
    None,
    #[serde(rename_all = "camelCase")]
    Pending {
        connection_id: i64,
        direction: Direction,
        created_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Accepted {
        connection_id: i64,
        created_at: DateTime<Utc>,
        accepted_at: Option<DateTime<Utc>>,
    },
}

impl PairStatus {
    pub fn from_connection(conn: Option<&Connection>, viewer: i64) -> Self {
        match conn {
            None => Self::None,
            Some(c) => match c.status {
                ConnectionState::Pending => Self::Pending {
                    connection_id: c.connection_id,
                    direction: c.direction_for(viewer).unwrap_or(Direction::Incoming),
                    created_at: c.created_at,
                },
                ConnectionState::Accepted => Self::Accepted {
                    connection_id: c.connection_id,
                    created_at: c.created_at,
                    accepted_at: c.accepted_at,
                },
            },
        }
    }
}

/// Public slice of a user shown next to connections and threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProfile {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerConnection {
    pub connection_id: i64,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub user: PartnerProfile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub total_connections: i64,
    pub pending_requests: i64,
}

/// Outcome of a successful remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Removal {
    /// A pending request withdrawn by its requester.
    Cancelled,
    /// An accepted connection dropped by either side.
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub file_url: Option<String>,
    pub message_type: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub user_id: i64,
    pub name: String,
    pub role: Role,
    pub last_message: Option<String>,
    pub last_message_type: Option<String>,
    pub last_at: Option<DateTime<Utc>>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadEntry {
    pub partner_id: i64,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pending(requester: i64, recipient: i64) -> Connection {
        Connection {
            connection_id: 1,
            user_a: requester.min(recipient),
            user_b: requester.max(recipient),
            requester_id: requester,
            recipient_id: recipient,
            status: ConnectionState::Pending,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            accepted_at: None,
        }
    }

    #[test]
    fn direction_depends_on_viewer() {
        let conn = pending(5, 9);
        assert_eq!(conn.direction_for(5), Some(Direction::Outgoing));
        assert_eq!(conn.direction_for(9), Some(Direction::Incoming));
    }

    #[test]
    fn accepted_has_no_direction() {
        let mut conn = pending(5, 9);
        conn.status = ConnectionState::Accepted;
        assert_eq!(conn.direction_for(5), None);
    }

    #[test]
    fn pair_status_serializes_with_tag() {
        let none = serde_json::to_value(PairStatus::None).unwrap();
        assert_eq!(none, serde_json::json!({ "status": "none" }));

        let conn = pending(5, 9);
        let view = serde_json::to_value(PairStatus::from_connection(Some(&conn), 9)).unwrap();
        assert_eq!(view["status"], "pending");
        assert_eq!(view["connectionId"], 1);
        assert_eq!(view["direction"], "incoming");
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Student, Role::Alumni, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("professor".parse::<Role>().is_err());
    }
}
