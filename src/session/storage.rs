use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;

use super::{Session, SessionProvider};

/// Persists the signed-in session in SQLite.
///
/// Shares a database with [`Config`](crate::config::Config), so pass the same
/// path to both. At most one session is stored.
pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open or create the session table in the given database path.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open session database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS session (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                data TEXT NOT NULL
            )",
        )
        .context("failed to create session table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// The stored session, if any.
    pub fn get(&self) -> Result<Option<Session>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT data FROM session WHERE slot = 0")?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                let session = serde_json::from_str(&json).context("stored session is corrupt")?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Replace the stored session.
    pub fn set(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session)?;
        self.conn().execute(
            "INSERT INTO session (slot, data) VALUES (0, ?1)
             ON CONFLICT(slot) DO UPDATE SET data = excluded.data",
            [&json],
        )?;
        Ok(())
    }

    /// Remove the stored session. Clearing an empty store is not an error.
    pub fn clear(&self) -> Result<()> {
        self.conn().execute("DELETE FROM session", [])?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionProvider for SessionStore {
    async fn get_session(&self) -> Result<Option<Session>> {
        self.get()
    }
}
