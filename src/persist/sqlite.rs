//! SQLite-backed guest row store.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    core::store::GuestStore,
    guest::GuestRecord,
    op::{Op, StoredOp},
    types::{GuestId, OpSeq},
};

use super::{GuestSink, PersistResult};

/// SQLite implementation of [`crate::persist::GuestSink`] over a single
/// `guests` table.
pub struct SqliteGuestStore {
    conn: Connection,
}

impl SqliteGuestStore {
    /// Opens or creates a SQLite-backed store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite store.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Loads all persisted rows, ordered by `(surname, id)`.
    pub fn load_guests(&self) -> PersistResult<Vec<GuestRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, surname, photo_ref, event_name, checked_in \
             FROM guests ORDER BY surname ASC, id ASC",
        )?;

        let rows = stmt.query_map([], row_to_guest)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Rebuilds an in-memory [`GuestStore`] from the persisted rows.
    pub fn load_store(&self) -> PersistResult<GuestStore> {
        let rows = self.load_guests()?;
        Ok(GuestStore::from_rows(rows)?)
    }

    /// Reads a single row by id.
    pub fn get(&self, id: GuestId) -> PersistResult<Option<GuestRecord>> {
        let rec = self
            .conn
            .query_row(
                "SELECT id, name, surname, photo_ref, event_name, checked_in \
                 FROM guests WHERE id = ?1",
                params![id as i64],
                row_to_guest,
            )
            .optional()?;
        Ok(rec)
    }

    /// Number of persisted rows.
    pub fn count(&self) -> PersistResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM guests", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

impl GuestSink for SqliteGuestStore {
    fn apply_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        if ops.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        for stored in ops {
            match &stored.op {
                Op::Add { guest } => {
                    tx.execute(
                        "INSERT OR REPLACE INTO guests \
                         (id, name, surname, photo_ref, event_name, checked_in) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            guest.id as i64,
                            guest.name,
                            guest.surname,
                            guest.photo_ref,
                            guest.event_name,
                            guest.checked_in,
                        ],
                    )?;
                }
                Op::Update { guest } => {
                    tx.execute(
                        "UPDATE guests SET name = ?2, surname = ?3, photo_ref = ?4, \
                         event_name = ?5, checked_in = ?6 WHERE id = ?1",
                        params![
                            guest.id as i64,
                            guest.name,
                            guest.surname,
                            guest.photo_ref,
                            guest.event_name,
                            guest.checked_in,
                        ],
                    )?;
                }
                Op::Remove { id } => {
                    tx.execute("DELETE FROM guests WHERE id = ?1", params![*id as i64])?;
                }
                Op::SetCheckedIn { id, checked_in } => {
                    tx.execute(
                        "UPDATE guests SET checked_in = ?2 WHERE id = ?1",
                        params![*id as i64, checked_in],
                    )?;
                }
            }
        }
        tx.commit()?;

        Ok(ops.last().map(|o| o.seq).unwrap_or(0))
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}

fn row_to_guest(row: &Row<'_>) -> rusqlite::Result<GuestRecord> {
    let id: i64 = row.get(0)?;
    Ok(GuestRecord {
        id: id as GuestId,
        name: row.get(1)?,
        surname: row.get(2)?,
        photo_ref: row.get(3)?,
        event_name: row.get(4)?,
        checked_in: row.get(5)?,
    })
}
