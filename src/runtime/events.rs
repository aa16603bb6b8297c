//! Runtime event stream payloads.

use crate::types::{GuestId, OpSeq};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestEvent {
    /// A new guest was added.
    Added {
        /// Added guest id.
        id: GuestId,
    },
    /// An existing guest was updated.
    Updated {
        /// Updated guest id.
        id: GuestId,
    },
    /// A guest was removed.
    Removed {
        /// Removed guest id.
        id: GuestId,
    },
    /// A guest's check-in flag was flipped.
    CheckedIn {
        /// Toggled guest id.
        id: GuestId,
        /// New flag value.
        checked_in: bool,
    },
    /// Persistence has reached at least this op sequence.
    DurableUpTo {
        /// Highest sequence known durable.
        op_seq: OpSeq,
    },
}
