//! User directory. The messaging core only needs existence and role
//! lookups; registration and login use the rest.

use rusqlite::{Connection, OptionalExtension};

use linkup_types::models::Role;

use crate::models::{USER_COLUMNS, UserRow, parse_role};
use crate::{Database, StoreError, StoreResult};

impl Database {
    /// Insert a user and return the new id. A taken email is a `Conflict`.
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> StoreResult<i64> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (name, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(email) DO NOTHING",
                (name, email, password_hash, role.as_str()),
            )?;

            if inserted == 0 {
                return Err(StoreError::Conflict("Email is already registered".into()));
            }
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    pub fn get_user(&self, id: i64) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn user_exists(&self, id: i64) -> StoreResult<bool> {
        self.with_conn(|conn| query_user_exists(conn, id))
    }

    /// Role of `id`, or `None` when the user does not exist.
    pub fn get_user_role(&self, id: i64) -> StoreResult<Option<Role>> {
        self.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row("SELECT role FROM users WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            raw.as_deref().map(parse_role).transpose()
        })
    }
}

pub(crate) fn query_user_exists(conn: &Connection, id: i64) -> StoreResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn query_user<P: rusqlite::ToSql>(
    conn: &Connection,
    predicate: &str,
    value: P,
) -> StoreResult<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate);
    let row = conn
        .query_row(&sql, [value], UserRow::from_row)
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{test_db, user};
    use crate::StoreError;
    use linkup_types::models::Role;

    #[test]
    fn create_and_lookup() {
        let (_dir, db) = test_db();
        let id = user(&db, "Sari");

        let row = db.get_user(id).unwrap().unwrap();
        assert_eq!(row.name, "Sari");
        assert_eq!(row.role().unwrap(), Role::Student);

        let by_email = db.get_user_by_email("sari@kampus.test").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.into_user().unwrap().user_id, id);
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (_dir, db) = test_db();
        user(&db, "Budi");
        let err = db
            .create_user("Budi Lain", "budi@kampus.test", "hash", Role::Alumni)
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn exists_and_role() {
        let (_dir, db) = test_db();
        let id = db
            .create_user("Dewi", "dewi@kampus.test", "hash", Role::Alumni)
            .unwrap();

        assert!(db.user_exists(id).unwrap());
        assert!(!db.user_exists(id + 100).unwrap());
        assert_eq!(db.get_user_role(id).unwrap(), Some(Role::Alumni));
        assert_eq!(db.get_user_role(id + 100).unwrap(), None);
    }
}
