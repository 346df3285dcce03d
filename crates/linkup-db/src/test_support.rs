use linkup_types::models::Role;
use tempfile::TempDir;

use crate::Database;

/// Fresh database in a temp dir. Keep the `TempDir` alive for the test.
pub fn test_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("linkup-test.db")).unwrap();
    (dir, db)
}

/// Register a student named `name` with email `<lowercase name>@kampus.test`.
pub fn user(db: &Database, name: &str) -> i64 {
    let email = format!("{}@kampus.test", name.to_lowercase());
    db.create_user(name, &email, "hash", Role::Student).unwrap()
}

/// Two users with an accepted connection between them.
pub fn connected_pair(db: &Database, a: &str, b: &str) -> (i64, i64) {
    let first = user(db, a);
    let second = user(db, b);
    let id = db.request_connection(first, second).unwrap();
    db.accept_connection(id, second).unwrap();
    (first, second)
}
