//! Database row types. These map directly to SQLite rows and are kept
//! distinct from the linkup-types models so the DB layer stays independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Row;
use tracing::warn;

use linkup_types::models::{Connection, ConnectionState, Message, PartnerProfile, Role, User};

use crate::{StoreError, StoreResult};

pub(crate) const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

pub(crate) const CONNECTION_COLUMNS: &str =
    "id, user_a, user_b, requester_id, recipient_id, status, created_at, accepted_at";

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, content, file_url, message_type, is_read, created_at";

pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn role(&self) -> StoreResult<Role> {
        parse_role(&self.role)
    }

    pub fn into_user(self) -> StoreResult<User> {
        Ok(User {
            user_id: self.id,
            role: self.role()?,
            created_at: parse_timestamp(&self.created_at)?,
            name: self.name,
            email: self.email,
        })
    }
}

pub struct ConnectionRow {
    pub id: i64,
    pub user_a: i64,
    pub user_b: i64,
    pub requester_id: i64,
    pub recipient_id: i64,
    pub status: String,
    pub created_at: String,
    pub accepted_at: Option<String>,
}

impl ConnectionRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_a: row.get(1)?,
            user_b: row.get(2)?,
            requester_id: row.get(3)?,
            recipient_id: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
            accepted_at: row.get(7)?,
        })
    }

    pub fn into_connection(self) -> StoreResult<Connection> {
        let status: ConnectionState = self.status.parse().map_err(|e: String| {
            StoreError::Unavailable(format!("corrupt status on connection {}: {}", self.id, e))
        })?;

        Ok(Connection {
            connection_id: self.id,
            user_a: self.user_a,
            user_b: self.user_b,
            requester_id: self.requester_id,
            recipient_id: self.recipient_id,
            status,
            created_at: parse_timestamp(&self.created_at)?,
            accepted_at: self.accepted_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: String,
    pub file_url: Option<String>,
    pub message_type: String,
    pub is_read: bool,
    pub created_at: String,
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sender_id: row.get(1)?,
            receiver_id: row.get(2)?,
            content: row.get(3)?,
            file_url: row.get(4)?,
            message_type: row.get(5)?,
            is_read: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    pub fn into_message(self) -> StoreResult<Message> {
        Ok(Message {
            message_id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            created_at: parse_timestamp(&self.created_at)?,
            content: self.content,
            file_url: self.file_url,
            message_type: self.message_type,
            is_read: self.is_read,
        })
    }
}

/// Reads `(id, name, email, role)` starting at column `offset`.
pub(crate) fn partner_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<(i64, String, String, String)> {
    Ok((
        row.get(offset)?,
        row.get(offset + 1)?,
        row.get(offset + 2)?,
        row.get(offset + 3)?,
    ))
}

pub(crate) fn into_partner(raw: (i64, String, String, String)) -> StoreResult<PartnerProfile> {
    let (user_id, name, email, role) = raw;
    Ok(PartnerProfile {
        user_id,
        name,
        email,
        role: parse_role(&role)?,
    })
}

pub(crate) fn parse_role(raw: &str) -> StoreResult<Role> {
    raw.parse()
        .map_err(|e: String| StoreError::Unavailable(format!("corrupt role: {}", e)))
}

/// Timestamps are written as RFC 3339 with milliseconds. Rows written by
/// older tooling may use SQLite's `datetime('now')` format instead; anything
/// else is treated as store corruption.
pub(crate) fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .map_err(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            StoreError::Unavailable(format!("corrupt timestamp '{}'", raw))
        })
}
