use rusqlite::OptionalExtension;
use tracing::{debug, info, warn};

use linkup_types::models::Message;
use linkup_types::pager::{Limit, Page};

use crate::guard::query_is_accepted;
use crate::models::{MESSAGE_COLUMNS, MessageRow};
use crate::{Database, StoreError, StoreResult};

pub const MAX_CONTENT_CHARS: usize = 4000;
pub const MAX_MESSAGE_TYPE_CHARS: usize = 32;
pub const DEFAULT_MESSAGE_TYPE: &str = "text";

const NOT_CONNECTED: &str = "You are not connected with this user";

/// A message as submitted by its sender, before validation.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub message_type: Option<String>,
}

struct ValidMessage {
    content: String,
    file_url: Option<String>,
    message_type: String,
}

impl NewMessage {
    fn validate(self) -> StoreResult<ValidMessage> {
        if self.receiver_id <= 0 {
            return Err(StoreError::Validation(format!(
                "Invalid receiverId: expected a positive integer, got {}",
                self.receiver_id
            )));
        }

        let content = self.content.unwrap_or_default();
        let file_url = self
            .file_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        if content.trim().is_empty() && file_url.is_none() {
            return Err(StoreError::Validation("Content or fileUrl is required".into()));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(StoreError::Validation(format!(
                "Content exceeds {} characters",
                MAX_CONTENT_CHARS
            )));
        }

        let message_type = match self.message_type {
            None => DEFAULT_MESSAGE_TYPE.to_string(),
            Some(t) => {
                let t = t.trim();
                if t.is_empty() {
                    DEFAULT_MESSAGE_TYPE.to_string()
                } else if t.chars().count() > MAX_MESSAGE_TYPE_CHARS {
                    return Err(StoreError::Validation(format!(
                        "messageType exceeds {} characters",
                        MAX_MESSAGE_TYPE_CHARS
                    )));
                } else {
                    t.to_string()
                }
            }
        };

        Ok(ValidMessage {
            content,
            file_url,
            message_type,
        })
    }
}

impl Database {
    /// Store a message. The connection check and the insert run under the
    /// writer lock, so a connection removed concurrently cannot slip a
    /// message in after the check.
    pub fn send_message(&self, msg: NewMessage) -> StoreResult<Message> {
        let sender = msg.sender_id;
        let receiver = msg.receiver_id;
        let valid = msg.validate()?;

        self.with_conn_mut(|conn| {
            if !query_is_accepted(conn, sender, receiver)? {
                warn!(sender, receiver, "Send refused: not connected");
                return Err(StoreError::Forbidden(NOT_CONNECTED.into()));
            }

            let sql = format!(
                "INSERT INTO messages (sender_id, receiver_id, content, file_url, message_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING {}",
                MESSAGE_COLUMNS
            );
            let row = conn.query_row(
                &sql,
                rusqlite::params![
                    sender,
                    receiver,
                    valid.content,
                    valid.file_url,
                    valid.message_type
                ],
                MessageRow::from_row,
            )?;

            info!(message_id = row.id, sender, receiver, "Message stored");
            row.into_message()
        })
    }

    /// One page of the conversation between `me` and `other`, oldest first.
    ///
    /// `cursor` is the `next_cursor` of the previous page; only messages with
    /// a smaller id are returned.
    pub fn message_history(
        &self,
        me: i64,
        other: i64,
        limit: Limit,
        cursor: Option<i64>,
    ) -> StoreResult<Page<Message>> {
        if let Some(c) = cursor {
            if c <= 0 {
                return Err(StoreError::Validation(format!(
                    "Invalid cursor: expected a positive integer, got {}",
                    c
                )));
            }
        }

        self.with_conn(|conn| {
            if !query_is_accepted(conn, me, other)? {
                return Err(StoreError::Forbidden(NOT_CONNECTED.into()));
            }

            let sql = format!(
                "SELECT {} FROM messages
                 WHERE ((sender_id = ?1 AND receiver_id = ?2)
                     OR (sender_id = ?2 AND receiver_id = ?1))
                   AND id < ?3
                 ORDER BY id DESC
                 LIMIT ?4",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![me, other, cursor.unwrap_or(i64::MAX), limit.get()],
                    MessageRow::from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            debug!(me, other, ?cursor, fetched = rows.len(), "History page");
            let messages = rows
                .into_iter()
                .map(MessageRow::into_message)
                .collect::<StoreResult<Vec<Message>>>()?;
            Ok(Page::from_newest_first(messages, limit, |m: &Message| m.message_id))
        })
    }

    /// Mark everything `other` sent to `me` as read. Returns how many rows
    /// flipped, so a repeat call reports 0.
    pub fn mark_read(&self, me: i64, other: i64) -> StoreResult<usize> {
        if other <= 0 {
            return Err(StoreError::Validation(format!(
                "Invalid userId: expected a positive integer, got {}",
                other
            )));
        }

        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE receiver_id = ?1 AND sender_id = ?2 AND is_read = 0",
                (me, other),
            )?;
            debug!(me, other, updated, "Marked messages read");
            Ok(updated)
        })
    }

    pub fn get_message(&self, message_id: i64) -> StoreResult<Option<Message>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
            let row = conn
                .query_row(&sql, [message_id], MessageRow::from_row)
                .optional()?;
            row.map(MessageRow::into_message).transpose()
        })
    }
}
