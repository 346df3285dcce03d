//! Messaging authorization: two users may talk only while their connection
//! is accepted.

use rusqlite::{Connection, OptionalExtension};

use linkup_types::pair::canonicalize;

use crate::{Database, StoreResult};

impl Database {
    /// True iff the pair has an accepted connection. A pair that cannot be
    /// canonicalized (self or invalid ids) is never accepted.
    pub fn is_accepted(&self, a: i64, b: i64) -> StoreResult<bool> {
        self.with_conn(|conn| query_is_accepted(conn, a, b))
    }
}

pub(crate) fn query_is_accepted(conn: &Connection, a: i64, b: i64) -> StoreResult<bool> {
    let Ok(pair) = canonicalize(a, b) else {
        return Ok(false);
    };

    let found = conn
        .query_row(
            "SELECT 1 FROM connections
             WHERE user_a = ?1 AND user_b = ?2 AND status = 'accepted'
             LIMIT 1",
            (pair.user_a(), pair.user_b()),
            |_| Ok(()),
        )
        .optional()?;

    Ok(found.is_some())
}
