use rusqlite::{Connection, Transaction};
use std::sync::{Mutex, MutexGuard, PoisonError};

const SCHEMA: &str = include_str!("schema.sql");

pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000; PRAGMA foreign_keys=ON;",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Db {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-query leaves the connection itself usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, rusqlite::Error>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self.lock();
        f(&conn)
    }

    /// Runs `f` inside a transaction. Nothing is committed unless `f` returns `Ok`.
    pub fn with_tx<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<rusqlite::Error>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    #[cfg(test)]
    pub fn seed_user(&self, username: &str) -> i64 {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password_hash) VALUES (?1, 'x$y')",
                [username],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .expect("seed user")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_rolls_back_on_error() {
        let db = Db::open_in_memory().unwrap();
        let owner = db.seed_user("rollback");

        let result: Result<(), rusqlite::Error> = db.with_tx(|tx| {
            tx.execute(
                "INSERT INTO battle_records (owner_id, battle_timestamp) VALUES (?1, ?2)",
                rusqlite::params![owner, "2025-11-20T17:36:00"],
            )?;
            Err(rusqlite::Error::InvalidQuery)
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM battle_records", [], |row| row.get(0))
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_detail_requires_record() {
        let db = Db::open_in_memory().unwrap();
        let owner = db.seed_user("orphan");
        let result = db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO battle_details (owner_id, battle_timestamp) VALUES (?1, ?2)",
                rusqlite::params![owner, "2025-11-20T17:36:00"],
            )
        });
        assert!(result.is_err());
    }
}
