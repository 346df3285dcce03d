//! Inbox views derived from connections and messages.

use tracing::debug;

use linkup_types::models::{ThreadSummary, UnreadEntry};

use crate::models::{parse_role, parse_timestamp};
use crate::{Database, StoreResult};

impl Database {
    /// One summary per conversation partner of `me`.
    ///
    /// Partners are everyone `me` has exchanged a message with plus everyone
    /// with an accepted connection, so a fresh connection shows up before the
    /// first message. Pending-only users are not partners.
    pub fn threads(&self, me: i64) -> StoreResult<Vec<ThreadSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "WITH partners AS (
                    SELECT CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END AS partner_id
                    FROM messages
                    WHERE sender_id = ?1 OR receiver_id = ?1
                    UNION
                    SELECT CASE WHEN user_a = ?1 THEN user_b ELSE user_a END
                    FROM connections
                    WHERE (user_a = ?1 OR user_b = ?1) AND status = 'accepted'
                 ),
                 latest AS (
                    SELECT p.partner_id,
                           (SELECT MAX(m.id) FROM messages m
                            WHERE (m.sender_id = ?1 AND m.receiver_id = p.partner_id)
                               OR (m.sender_id = p.partner_id AND m.receiver_id = ?1)) AS last_id
                    FROM partners p
                 )
                 SELECT u.id, u.name, u.role, m.content, m.message_type, m.created_at,
                        (SELECT COUNT(*) FROM messages r
                         WHERE r.receiver_id = ?1 AND r.sender_id = u.id AND r.is_read = 0)
                 FROM latest l
                 JOIN users u ON u.id = l.partner_id
                 LEFT JOIN messages m ON m.id = l.last_id
                 ORDER BY m.created_at IS NULL, m.created_at DESC, u.name ASC",
            )?;

            let rows = stmt
                .query_map([me], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            debug!(me, threads = rows.len(), "Loaded threads");

            rows.into_iter()
                .map(|(user_id, name, role, last_message, last_type, last_at, unread)| {
                    Ok(ThreadSummary {
                        user_id,
                        name,
                        role: parse_role(&role)?,
                        last_message,
                        last_message_type: last_type,
                        last_at: last_at.as_deref().map(parse_timestamp).transpose()?,
                        unread_count: unread,
                    })
                })
                .collect()
        })
    }

    /// Unread counts addressed to `me`, one row per sender that has any.
    pub fn unread_summary(&self, me: i64) -> StoreResult<Vec<UnreadEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT sender_id, COUNT(*)
                 FROM messages
                 WHERE receiver_id = ?1 AND is_read = 0
                 GROUP BY sender_id
                 ORDER BY sender_id",
            )?;
            let entries = stmt
                .query_map([me], |row| {
                    Ok(UnreadEntry {
                        partner_id: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::messages::NewMessage;
    use crate::test_support::{test_db, user};
    use crate::{Database, StoreError};

    fn send(db: &Database, from: i64, to: i64, body: &str) {
        db.send_message(NewMessage {
            sender_id: from,
            receiver_id: to,
            content: Some(body.into()),
            ..Default::default()
        })
        .unwrap();
    }

    fn connect(db: &Database, a: i64, b: i64) -> i64 {
        let id = db.request_connection(a, b).unwrap();
        db.accept_connection(id, b).unwrap();
        id
    }

    #[test]
    fn includes_silent_accepted_and_excludes_pending() {
        let (_dir, db) = test_db();
        let me = user(&db, "Adit");
        let talker = user(&db, "Bunga");
        let silent = user(&db, "Cakra");
        let pending = user(&db, "Dina");

        connect(&db, me, talker);
        connect(&db, silent, me);
        db.request_connection(pending, me).unwrap();

        send(&db, talker, me, "sudah lihat lowongannya?");
        send(&db, talker, me, "deadline besok");

        let threads = db.threads(me).unwrap();
        let ids: Vec<i64> = threads.iter().map(|t| t.user_id).collect();
        assert_eq!(ids, vec![talker, silent]);

        assert_eq!(threads[0].last_message.as_deref(), Some("deadline besok"));
        assert_eq!(threads[0].last_message_type.as_deref(), Some("text"));
        assert_eq!(threads[0].unread_count, 2);
        assert!(threads[0].last_at.is_some());

        assert_eq!(threads[1].last_message, None);
        assert_eq!(threads[1].last_at, None);
        assert_eq!(threads[1].unread_count, 0);
    }

    #[test]
    fn keeps_partners_after_disconnect() {
        let (_dir, db) = test_db();
        let me = user(&db, "Eko");
        let old = user(&db, "Fina");

        let id = connect(&db, me, old);
        send(&db, me, old, "sampai jumpa");
        db.remove_connection(id, old).unwrap();

        let threads = db.threads(me).unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].user_id, old);
        assert_eq!(threads[0].last_message.as_deref(), Some("sampai jumpa"));
    }

    #[test]
    fn silent_partners_sorted_by_name() {
        let (_dir, db) = test_db();
        let me = user(&db, "Gani");
        let zed = user(&db, "Zulfa");
        let ana = user(&db, "Ana");
        let mid = user(&db, "Maman");

        connect(&db, me, zed);
        connect(&db, me, ana);
        connect(&db, me, mid);

        let names: Vec<String> = db.threads(me).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Ana", "Maman", "Zulfa"]);
    }

    #[test]
    fn most_recent_activity_first() {
        let (_dir, db) = test_db();
        let me = user(&db, "Hesti");
        let first = user(&db, "Ilham");
        let second = user(&db, "Jaya");

        connect(&db, me, first);
        connect(&db, me, second);
        send(&db, me, first, "pagi");
        send(&db, second, me, "siang");
        send(&db, first, me, "sore");

        let ids: Vec<i64> = db.threads(me).unwrap().iter().map(|t| t.user_id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[test]
    fn same_instant_ties_break_by_name() {
        let (_dir, db) = test_db();
        let me = user(&db, "Nadia");
        let ann = user(&db, "Ann");
        let zed = user(&db, "Zed");

        connect(&db, me, ann);
        connect(&db, me, zed);
        send(&db, ann, me, "halo");
        send(&db, zed, me, "halo juga");

        db.with_conn_mut(|conn| {
            conn.execute("UPDATE messages SET created_at = '2025-03-01T09:00:00.000Z'", [])?;
            Ok(())
        })
        .unwrap();

        let names: Vec<String> = db.threads(me).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Ann", "Zed"]);
    }

    #[test]
    fn corrupt_timestamp_fails_the_read() {
        let (_dir, db) = test_db();
        let me = user(&db, "Oki");
        let other = user(&db, "Putri");

        connect(&db, me, other);
        send(&db, other, me, "cek");
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE messages SET created_at = 'kemarin'", [])?;
            Ok(())
        })
        .unwrap();

        assert!(matches!(db.threads(me), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn unread_summary_groups_by_sender() {
        let (_dir, db) = test_db();
        let me = user(&db, "Kurnia");
        let a = user(&db, "Lutfi");
        let b = user(&db, "Mega");

        connect(&db, me, a);
        connect(&db, me, b);
        send(&db, a, me, "1");
        send(&db, a, me, "2");
        send(&db, b, me, "3");
        send(&db, me, b, "balas");

        let summary = db.unread_summary(me).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].partner_id, a);
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[1].partner_id, b);
        assert_eq!(summary[1].count, 1);

        db.mark_read(me, a).unwrap();
        let summary = db.unread_summary(me).unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].partner_id, b);
    }
}
