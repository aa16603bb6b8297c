//! Case-insensitive substring filter over the roster.

use crate::guest::GuestRecord;

/// Returns the guests whose name, surname, or event name contains `query`
/// as a case-insensitive substring.
///
/// A blank query (empty or whitespace-only) returns the input unchanged,
/// same order. Recomputation is synchronous; there is no debouncing.
pub fn filter_guests(guests: &[GuestRecord], query: &str) -> Vec<GuestRecord> {
    if query.trim().is_empty() {
        return guests.to_vec();
    }

    let needle = query.to_lowercase();
    guests
        .iter()
        .filter(|g| matches_query(g, &needle))
        .cloned()
        .collect()
}

fn matches_query(guest: &GuestRecord, needle_lower: &str) -> bool {
    guest.name.to_lowercase().contains(needle_lower)
        || guest.surname.to_lowercase().contains(needle_lower)
        || guest.event_name.to_lowercase().contains(needle_lower)
}
