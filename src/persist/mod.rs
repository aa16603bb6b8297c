/// SQLite row store.
pub mod sqlite;

use crate::{op::StoredOp, types::OpSeq};

/// Persistence failure.
#[derive(Debug)]
pub enum PersistError {
    /// Underlying SQLite error.
    Sqlite(rusqlite::Error),
    /// Any other sink failure.
    Message(String),
}

impl From<rusqlite::Error> for PersistError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<crate::core::store::StoreError> for PersistError {
    fn from(value: crate::core::store::StoreError) -> Self {
        Self::Message(format!("store error: {value:?}"))
    }
}

/// Convenience alias for persistence results.
pub type PersistResult<T> = Result<T, PersistError>;

/// Durable destination for row mutations.
///
/// Each op is applied as a single-row write; the sink guarantees nothing
/// across ops beyond last-write-wins per row.
pub trait GuestSink: Send {
    /// Applies a batch of ops, returning the highest sequence made durable.
    fn apply_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq>;
    /// Forces buffered writes to stable storage.
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
}
