//! Connection state machine: `None -> Pending -> Accepted`, with
//! `Pending -> None` on reject or cancel and `Accepted -> None` on removal.
//!
//! Each transition is a single conditional statement against the writer, so
//! racing callers get exactly one winner. The loser sees `NotFound` (or
//! `Conflict` for duplicate requests) rather than a partially applied change.

use rusqlite::{Connection as SqlConnection, OptionalExtension};
use tracing::{debug, info, warn};

use linkup_types::models::{
    Connection, ConnectionState, ConnectionStats, PairStatus, PartnerConnection, Removal,
};
use linkup_types::pair::{CanonicalPair, canonicalize};

use crate::models::{
    CONNECTION_COLUMNS, ConnectionRow, into_partner, parse_timestamp, partner_from_row,
};
use crate::users::query_user_exists;
use crate::{Database, StoreError, StoreResult};

const NOT_RECIPIENT: &str = "Connection request not found or you are not the recipient";

impl Database {
    /// Create a pending request from `requester` to `recipient`.
    ///
    /// Relies on the `UNIQUE(user_a, user_b)` index: the insert is a no-op if
    /// any record already exists for the pair, whichever side created it.
    pub fn request_connection(&self, requester: i64, recipient: i64) -> StoreResult<i64> {
        let pair = canonicalize(requester, recipient)?;

        self.with_conn_mut(|conn| {
            if !query_user_exists(conn, recipient)? {
                return Err(StoreError::NotFound("User not found".into()));
            }
            if !query_user_exists(conn, requester)? {
                return Err(StoreError::NotFound("Requesting user not found".into()));
            }

            let inserted = conn.execute(
                "INSERT INTO connections (user_a, user_b, requester_id, recipient_id, status)
                 VALUES (?1, ?2, ?3, ?4, 'pending')
                 ON CONFLICT(user_a, user_b) DO NOTHING",
                (pair.user_a(), pair.user_b(), requester, recipient),
            )?;

            if inserted == 0 {
                let existing = query_connection_by_pair(conn, &pair)?;
                let reason = match existing.map(|c| c.status) {
                    Some(ConnectionState::Pending) => "Connection request is already pending",
                    Some(ConnectionState::Accepted) => "You are already connected",
                    // Removed between the insert and this read.
                    None => "Connection changed concurrently, try again",
                };
                debug!(requester, recipient, "Duplicate connection request: {}", reason);
                return Err(StoreError::Conflict(reason.into()));
            }

            let id = conn.last_insert_rowid();
            info!(connection_id = id, requester, recipient, "Connection requested");
            Ok(id)
        })
    }

    /// Accept a pending request. Only the recipient may accept; anything else
    /// is reported as not found.
    pub fn accept_connection(&self, connection_id: i64, acting_user: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE connections
                 SET status = 'accepted', accepted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND recipient_id = ?2 AND status = 'pending'",
                (connection_id, acting_user),
            )?;

            if updated == 0 {
                warn!(connection_id, acting_user, "Accept refused");
                return Err(StoreError::NotFound(NOT_RECIPIENT.into()));
            }

            info!(connection_id, acting_user, "Connection accepted");
            Ok(())
        })
    }

    /// Reject a pending request by deleting it, which allows a later
    /// re-request. Same masking as [`Database::accept_connection`].
    pub fn reject_connection(&self, connection_id: i64, acting_user: i64) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM connections
                 WHERE id = ?1 AND recipient_id = ?2 AND status = 'pending'",
                (connection_id, acting_user),
            )?;

            if deleted == 0 {
                warn!(connection_id, acting_user, "Reject refused");
                return Err(StoreError::NotFound(NOT_RECIPIENT.into()));
            }

            info!(connection_id, acting_user, "Connection rejected");
            Ok(())
        })
    }

    /// Cancel a pending request (requester only) or drop an accepted
    /// connection (either side). Message history is left untouched.
    pub fn remove_connection(&self, connection_id: i64, acting_user: i64) -> StoreResult<Removal> {
        self.with_conn_mut(|conn| {
            let current = query_connection_by_id(conn, connection_id)?
                .ok_or_else(|| StoreError::NotFound("Connection not found".into()))?;

            let (allowed, removal) = match current.status {
                ConnectionState::Pending => {
                    (current.requester_id == acting_user, Removal::Cancelled)
                }
                ConnectionState::Accepted => (current.involves(acting_user), Removal::Disconnected),
            };

            if !allowed {
                warn!(connection_id, acting_user, status = current.status.as_str(), "Remove refused");
                let reason = match current.status {
                    ConnectionState::Pending => "Only the requester can cancel a pending request",
                    ConnectionState::Accepted => "Not authorized to remove this connection",
                };
                return Err(StoreError::Forbidden(reason.into()));
            }

            let deleted = conn.execute(
                "DELETE FROM connections WHERE id = ?1 AND status = ?2",
                (connection_id, current.status.as_str()),
            )?;
            if deleted == 0 {
                return Err(StoreError::NotFound("Connection not found".into()));
            }

            info!(connection_id, acting_user, ?removal, "Connection removed");
            Ok(removal)
        })
    }

    pub fn get_connection(&self, connection_id: i64) -> StoreResult<Option<Connection>> {
        self.with_conn(|conn| query_connection_by_id(conn, connection_id))
    }

    /// Relationship between `user_id` and `other_id` as seen by `user_id`.
    pub fn connection_status(&self, user_id: i64, other_id: i64) -> StoreResult<PairStatus> {
        let pair = canonicalize(user_id, other_id)?;
        let existing = self.with_conn(|conn| query_connection_by_pair(conn, &pair))?;
        Ok(PairStatus::from_connection(existing.as_ref(), user_id))
    }

    /// Accepted and pending counts touching `user_id` on either side.
    pub fn connection_stats(&self, user_id: i64) -> StoreResult<ConnectionStats> {
        self.with_conn(|conn| {
            if !query_user_exists(conn, user_id)? {
                return Err(StoreError::NotFound("User not found".into()));
            }

            let (total_connections, pending_requests) = conn.query_row(
                "SELECT
                    COALESCE(SUM(status = 'accepted'), 0),
                    COALESCE(SUM(status = 'pending'), 0)
                 FROM connections
                 WHERE user_a = ?1 OR user_b = ?1",
                [user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            Ok(ConnectionStats {
                total_connections,
                pending_requests,
            })
        })
    }

    /// Accepted connections of `user_id`, newest first.
    pub fn list_connections(&self, user_id: i64) -> StoreResult<Vec<PartnerConnection>> {
        self.with_conn(|conn| {
            query_partner_connections(
                conn,
                "SELECT c.id, c.created_at, c.accepted_at, u.id, u.name, u.email, u.role
                 FROM connections c
                 JOIN users u ON u.id = CASE WHEN c.user_a = ?1 THEN c.user_b ELSE c.user_a END
                 WHERE (c.user_a = ?1 OR c.user_b = ?1) AND c.status = 'accepted'
                 ORDER BY c.created_at DESC, c.id DESC",
                user_id,
            )
        })
    }

    /// Pending requests addressed to `user_id`, showing each requester.
    pub fn pending_requests(&self, user_id: i64) -> StoreResult<Vec<PartnerConnection>> {
        self.with_conn(|conn| {
            query_partner_connections(
                conn,
                "SELECT c.id, c.created_at, c.accepted_at, u.id, u.name, u.email, u.role
                 FROM connections c
                 JOIN users u ON u.id = c.requester_id
                 WHERE c.recipient_id = ?1 AND c.status = 'pending'
                 ORDER BY c.created_at DESC, c.id DESC",
                user_id,
            )
        })
    }

    /// Pending requests sent by `user_id`, showing each recipient.
    pub fn sent_requests(&self, user_id: i64) -> StoreResult<Vec<PartnerConnection>> {
        self.with_conn(|conn| {
            query_partner_connections(
                conn,
                "SELECT c.id, c.created_at, c.accepted_at, u.id, u.name, u.email, u.role
                 FROM connections c
                 JOIN users u ON u.id = c.recipient_id
                 WHERE c.requester_id = ?1 AND c.status = 'pending'
                 ORDER BY c.created_at DESC, c.id DESC",
                user_id,
            )
        })
    }
}

pub(crate) fn query_connection_by_pair(
    conn: &SqlConnection,
    pair: &CanonicalPair,
) -> StoreResult<Option<Connection>> {
    let sql = format!(
        "SELECT {} FROM connections WHERE user_a = ?1 AND user_b = ?2",
        CONNECTION_COLUMNS
    );
    conn.query_row(&sql, (pair.user_a(), pair.user_b()), ConnectionRow::from_row)
        .optional()?
        .map(ConnectionRow::into_connection)
        .transpose()
}

fn query_connection_by_id(conn: &SqlConnection, id: i64) -> StoreResult<Option<Connection>> {
    let sql = format!("SELECT {} FROM connections WHERE id = ?1", CONNECTION_COLUMNS);
    conn.query_row(&sql, [id], ConnectionRow::from_row)
        .optional()?
        .map(ConnectionRow::into_connection)
        .transpose()
}

fn query_partner_connections(
    conn: &SqlConnection,
    sql: &str,
    user_id: i64,
) -> StoreResult<Vec<PartnerConnection>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                partner_from_row(row, 3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(connection_id, created_at, accepted_at, partner)| {
            Ok(PartnerConnection {
                connection_id,
                created_at: parse_timestamp(&created_at)?,
                accepted_at: accepted_at.as_deref().map(parse_timestamp).transpose()?,
                user: into_partner(partner)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_db, user};
    use linkup_types::models::Direction;

    #[test]
    fn request_accept_flow() {
        let (_dir, db) = test_db();
        let requester = user(&db, "Andi");
        let recipient = user(&db, "Bima");

        let id = db.request_connection(requester, recipient).unwrap();
        let conn = db.get_connection(id).unwrap().unwrap();
        assert_eq!(conn.status, ConnectionState::Pending);
        assert_eq!(conn.requester_id, requester);
        assert_eq!(conn.recipient_id, recipient);
        assert!(conn.user_a < conn.user_b);
        assert!(conn.accepted_at.is_none());

        // The requester cannot accept their own request.
        let err = db.accept_connection(id, requester).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        db.accept_connection(id, recipient).unwrap();
        let conn = db.get_connection(id).unwrap().unwrap();
        assert_eq!(conn.status, ConnectionState::Accepted);
        assert!(conn.accepted_at.is_some());
    }

    #[test]
    fn self_request_is_rejected() {
        let (_dir, db) = test_db();
        let me = user(&db, "Citra");
        let err = db.request_connection(me, me).unwrap_err();
        assert!(matches!(err, StoreError::SelfConnection));
    }

    #[test]
    fn request_to_missing_user_is_not_found() {
        let (_dir, db) = test_db();
        let me = user(&db, "Dani");
        let err = db.request_connection(me, me + 50).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn duplicate_request_conflicts_in_either_direction() {
        let (_dir, db) = test_db();
        let a = user(&db, "Eka");
        let b = user(&db, "Fajar");

        let id = db.request_connection(a, b).unwrap();
        assert!(matches!(
            db.request_connection(a, b).unwrap_err(),
            StoreError::Conflict(_)
        ));
        let err = db.request_connection(b, a).unwrap_err();
        match err {
            StoreError::Conflict(msg) => assert!(msg.contains("pending")),
            other => panic!("expected conflict, got {:?}", other),
        }

        db.accept_connection(id, b).unwrap();
        match db.request_connection(b, a).unwrap_err() {
            StoreError::Conflict(msg) => assert!(msg.contains("already connected")),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn accept_twice_is_not_found() {
        let (_dir, db) = test_db();
        let a = user(&db, "Gita");
        let b = user(&db, "Hadi");
        let id = db.request_connection(a, b).unwrap();

        db.accept_connection(id, b).unwrap();
        assert!(matches!(
            db.accept_connection(id, b).unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            db.reject_connection(id, b).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn missing_and_foreign_connections_look_the_same() {
        let (_dir, db) = test_db();
        let a = user(&db, "Indra");
        let b = user(&db, "Joko");
        let outsider = user(&db, "Kiki");
        let id = db.request_connection(a, b).unwrap();

        let foreign = db.accept_connection(id, outsider).unwrap_err().to_string();
        let missing = db.accept_connection(id + 99, outsider).unwrap_err().to_string();
        assert_eq!(foreign, missing);
    }

    #[test]
    fn reject_deletes_and_allows_rerequest() {
        let (_dir, db) = test_db();
        let a = user(&db, "Lina");
        let b = user(&db, "Maya");
        let id = db.request_connection(a, b).unwrap();

        assert!(matches!(
            db.reject_connection(id, a).unwrap_err(),
            StoreError::NotFound(_)
        ));
        db.reject_connection(id, b).unwrap();
        assert!(db.get_connection(id).unwrap().is_none());
        assert_eq!(db.connection_status(a, b).unwrap(), PairStatus::None);

        // Either side may start over.
        let again = db.request_connection(b, a).unwrap();
        assert_ne!(again, id);
    }

    #[test]
    fn remove_pending_only_by_requester() {
        let (_dir, db) = test_db();
        let a = user(&db, "Nando");
        let b = user(&db, "Oki");
        let id = db.request_connection(a, b).unwrap();

        assert!(matches!(
            db.remove_connection(id, b).unwrap_err(),
            StoreError::Forbidden(_)
        ));
        assert_eq!(db.remove_connection(id, a).unwrap(), Removal::Cancelled);
        assert!(db.get_connection(id).unwrap().is_none());

        db.request_connection(a, b).unwrap();
    }

    #[test]
    fn remove_accepted_by_either_side() {
        let (_dir, db) = test_db();
        let a = user(&db, "Putri");
        let b = user(&db, "Rudi");
        let outsider = user(&db, "Sinta");

        let id = db.request_connection(a, b).unwrap();
        db.accept_connection(id, b).unwrap();
        assert!(matches!(
            db.remove_connection(id, outsider).unwrap_err(),
            StoreError::Forbidden(_)
        ));
        assert_eq!(db.remove_connection(id, b).unwrap(), Removal::Disconnected);

        let id = db.request_connection(b, a).unwrap();
        db.accept_connection(id, a).unwrap();
        assert_eq!(db.remove_connection(id, b).unwrap(), Removal::Disconnected);

        assert!(matches!(
            db.remove_connection(id, a).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn status_reports_direction() {
        let (_dir, db) = test_db();
        let a = user(&db, "Tari");
        let b = user(&db, "Umar");
        assert_eq!(db.connection_status(a, b).unwrap(), PairStatus::None);

        let id = db.request_connection(a, b).unwrap();
        match db.connection_status(a, b).unwrap() {
            PairStatus::Pending {
                connection_id,
                direction,
                ..
            } => {
                assert_eq!(connection_id, id);
                assert_eq!(direction, Direction::Outgoing);
            }
            other => panic!("unexpected status {:?}", other),
        }
        match db.connection_status(b, a).unwrap() {
            PairStatus::Pending { direction, .. } => assert_eq!(direction, Direction::Incoming),
            other => panic!("unexpected status {:?}", other),
        }

        db.accept_connection(id, b).unwrap();
        assert!(matches!(
            db.connection_status(b, a).unwrap(),
            PairStatus::Accepted { connection_id, .. } if connection_id == id
        ));
        assert!(matches!(
            db.connection_status(a, a).unwrap_err(),
            StoreError::SelfConnection
        ));
    }

    #[test]
    fn stats_count_both_sides() {
        let (_dir, db) = test_db();
        let me = user(&db, "Vina");
        let x = user(&db, "Wawan");
        let y = user(&db, "Yusuf");
        let z = user(&db, "Zaki");

        let accepted = db.request_connection(me, x).unwrap();
        db.accept_connection(accepted, x).unwrap();
        let incoming = db.request_connection(y, me).unwrap();
        db.accept_connection(incoming, me).unwrap();
        db.request_connection(z, me).unwrap();

        let stats = db.connection_stats(me).unwrap();
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.pending_requests, 1);

        assert_eq!(db.connection_stats(z).unwrap().pending_requests, 1);
        assert!(matches!(
            db.connection_stats(me + 100).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn listings_show_the_other_party() {
        let (_dir, db) = test_db();
        let me = user(&db, "Ayu");
        let friend = user(&db, "Bagus");
        let asker = user(&db, "Cahya");
        let target = user(&db, "Dimas");

        let id = db.request_connection(friend, me).unwrap();
        db.accept_connection(id, me).unwrap();
        db.request_connection(asker, me).unwrap();
        db.request_connection(me, target).unwrap();

        let connections = db.list_connections(me).unwrap();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].user.user_id, friend);
        assert!(connections[0].accepted_at.is_some());

        let pending = db.pending_requests(me).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].user.user_id, asker);

        let sent = db.sent_requests(me).unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user.name, "Dimas");

        assert!(db.pending_requests(target).unwrap()[0].user.user_id == me);
    }

    #[test]
    fn concurrent_requests_have_one_winner() {
        use std::sync::Arc;

        let (_dir, db) = test_db();
        let a = user(&db, "Eko");
        let b = user(&db, "Feri");
        let db = Arc::new(db);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        db.request_connection(a, b)
                    } else {
                        db.request_connection(b, a)
                    }
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Conflict(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 7);
    }

    #[test]
    fn concurrent_accept_and_reject_have_one_winner() {
        use std::sync::Arc;

        let (_dir, db) = test_db();
        let requester = user(&db, "Gilang");
        let recipient = user(&db, "Hana");
        let id = db.request_connection(requester, recipient).unwrap();
        let db = Arc::new(db);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        db.accept_connection(id, recipient).map(|_| "accept")
                    } else {
                        db.reject_connection(id, recipient).map(|_| "reject")
                    }
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<&str> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
        let not_found = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::NotFound(_))))
            .count();
        assert_eq!(winners.len(), 1);
        assert_eq!(not_found, 7);

        // The stored row agrees with whichever call won.
        match winners[0] {
            "accept" => assert!(db.is_accepted(requester, recipient).unwrap()),
            _ => assert!(db.get_connection(id).unwrap().is_none()),
        }
    }
}
