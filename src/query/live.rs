//! Push-based live views over the roster watch channel.

use tokio::sync::watch;

use crate::guest::GuestRecord;

use super::filter::filter_guests;

/// Live view of the full roster.
///
/// Wraps the `watch` receiver published by the runtime; the roster value is
/// replaced after every successful mutation, so [`Self::changed`] resolves
/// once per store change.
#[derive(Debug, Clone)]
pub struct LiveRoster {
    rx: watch::Receiver<Vec<GuestRecord>>,
}

impl LiveRoster {
    /// Wraps a roster watch receiver.
    pub fn new(rx: watch::Receiver<Vec<GuestRecord>>) -> Self {
        Self { rx }
    }

    /// Snapshot of the current roster, ordered by surname.
    pub fn current(&self) -> Vec<GuestRecord> {
        self.rx.borrow().clone()
    }

    /// Waits until the roster has been replaced since the last observation.
    ///
    /// Returns `Err` when the runtime has shut down.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.rx.changed().await
    }
}

/// Live roster combined with a mutable search string.
///
/// The filtered list is recomputed synchronously on every [`Self::current`]
/// call from the latest roster and search text; there is no caching or
/// debouncing, mirroring a search box driving a list view.
#[derive(Debug, Clone)]
pub struct FilteredRoster {
    roster: LiveRoster,
    search: String,
}

impl FilteredRoster {
    /// Wraps a live roster with an initially blank search.
    pub fn new(roster: LiveRoster) -> Self {
        Self {
            roster,
            search: String::new(),
        }
    }

    /// Replaces the search text.
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.search = text.into();
    }

    /// Current search text.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Filtered snapshot of the current roster.
    ///
    /// Blank search text yields the unfiltered roster, same order.
    pub fn current(&self) -> Vec<GuestRecord> {
        let roster = self.roster.rx.borrow();
        filter_guests(&roster, &self.search)
    }

    /// Waits for the next roster change.
    pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
        self.roster.changed().await
    }
}
