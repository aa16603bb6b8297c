//! In-memory authoritative roster and index helpers.

/// Helper index aliases.
pub mod indices;
/// Authoritative guest store.
pub mod store;
