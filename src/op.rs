//! Mutation operation model handed to the persistence sink.

use crate::{
    guest::GuestRecord,
    types::{GuestId, OpSeq},
};

/// Single row mutation produced by a successful store operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Insert a fully materialized guest row.
    Add {
        /// Inserted record.
        guest: GuestRecord,
    },
    /// Replace the row matching `guest.id`.
    Update {
        /// Replacement record.
        guest: GuestRecord,
    },
    /// Delete the row by id.
    Remove {
        /// Removed guest id.
        id: GuestId,
    },
    /// Overwrite the check-in flag of one row.
    SetCheckedIn {
        /// Guest id to mutate.
        id: GuestId,
        /// New flag value.
        checked_in: bool,
    },
}

/// Operation plus sequencing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOp {
    /// Monotonic operation sequence.
    pub seq: OpSeq,
    /// Operation timestamp in milliseconds.
    pub ts_ms: u64,
    /// Operation body.
    pub op: Op,
}

impl Op {
    /// Guest id the operation targets.
    pub fn guest_id(&self) -> GuestId {
        match self {
            Op::Add { guest } | Op::Update { guest } => guest.id,
            Op::Remove { id } | Op::SetCheckedIn { id, .. } => *id,
        }
    }
}
