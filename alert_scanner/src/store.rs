//! Append-only SQLite snapshot log.
//!
//! Every call opens its own connection, does its work, and drops it; the
//! store itself only remembers the file path. Rows are never updated or
//! deleted.
use std::path::{Path, PathBuf};

use alert_common::{AlertError, Result, Snapshot};
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use rusqlite::{params, Connection};
use serde::Serialize;

fn ensure_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS snapshots (
             id      INTEGER PRIMARY KEY AUTOINCREMENT,
             symbol  TEXT NOT NULL,
             ts      TEXT NOT NULL,
             payload TEXT NOT NULL
         );",
    )?;
    Ok(())
}

/// Handle on the snapshot log file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Open the log at `path`, creating the file and table if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        ensure_table(&store.connect()?)?;
        Ok(store)
    }

    /// Attach to a log that already exists, without creating anything.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.try_exists()? {
            return Err(AlertError::Format(format!(
                "no snapshot log at {}",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    /// Append one snapshot stamped with the current UTC time. Returns the row id.
    pub fn append<P: Serialize>(&self, symbol: &str, payload: &P) -> Result<i64> {
        self.append_at(symbol, Utc::now(), payload)
    }

    fn append_at<P: Serialize>(&self, symbol: &str, at: DateTime<Utc>, payload: &P) -> Result<i64> {
        let json = serde_json::to_string(payload)?;
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO snapshots (symbol, ts, payload) VALUES (?1, ?2, ?3)",
            params![symbol, at.to_rfc3339_opts(SecondsFormat::Micros, false), json],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Stored snapshot {} for {}", id, symbol);
        Ok(id)
    }

    /// All snapshots for `symbol`, oldest first.
    pub fn read_by_symbol(&self, symbol: &str) -> Result<Vec<Snapshot>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT id, symbol, ts, payload FROM snapshots WHERE symbol = ?1 ORDER BY id")?;
        let rows = stmt.query_map([symbol], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut snapshots = Vec::new();
        for row in rows {
            let (id, symbol, ts, payload) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&ts)
                .map_err(|e| AlertError::Format(format!("snapshot {id} has bad timestamp '{ts}': {e}")))?
                .with_timezone(&Utc);
            snapshots.push(Snapshot {
                id,
                symbol,
                timestamp,
                payload: serde_json::from_str(&payload)?,
            });
        }
        Ok(snapshots)
    }

    /// Total number of stored snapshots.
    pub fn count(&self) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
