//! Derived views over the roster: search filter and live subscriptions.

/// Substring search filter.
pub mod filter;
/// Watch-channel backed live views.
pub mod live;
