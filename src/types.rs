//! Shared primitive identifiers.

/// Monotonic guest identifier.
pub type GuestId = u64;
/// Monotonic operation sequence number.
pub type OpSeq = u64;
