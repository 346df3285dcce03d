use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, connections, messages)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'student'
                                CHECK (role IN ('student', 'alumni', 'admin')),
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            -- One row per unordered pair: (user_a, user_b) is always ordered.
            CREATE TABLE connections (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_a          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                user_b          INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                requester_id    INTEGER NOT NULL,
                recipient_id    INTEGER NOT NULL,
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'accepted')),
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                accepted_at     TEXT,
                CHECK (user_a < user_b),
                CHECK (requester_id <> recipient_id),
                CHECK (requester_id IN (user_a, user_b) AND recipient_id IN (user_a, user_b)),
                UNIQUE (user_a, user_b)
            );

            CREATE INDEX idx_connections_requester ON connections(requester_id, status);
            CREATE INDEX idx_connections_recipient ON connections(recipient_id, status);

            -- AUTOINCREMENT keeps ids strictly increasing; they double as history cursors.
            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                sender_id       INTEGER NOT NULL REFERENCES users(id),
                receiver_id     INTEGER NOT NULL REFERENCES users(id),
                content         TEXT NOT NULL DEFAULT '',
                file_url        TEXT,
                message_type    TEXT NOT NULL DEFAULT 'text',
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_messages_pair ON messages(sender_id, receiver_id, id);
            CREATE INDEX idx_messages_unread ON messages(receiver_id, is_read, sender_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
