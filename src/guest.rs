//! Guest domain record and insert draft.

use crate::types::GuestId;

/// Fully materialized, authoritative guest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestRecord {
    /// Stable guest identifier.
    pub id: GuestId,
    /// First name.
    pub name: String,
    /// Surname, the roster sort key.
    pub surname: String,
    /// Filesystem path of the guest photo; empty when there is none.
    pub photo_ref: String,
    /// Event the guest is registered for.
    pub event_name: String,
    /// True once the guest has been checked in at the door.
    pub checked_in: bool,
}

/// Insert payload used to create a new [`GuestRecord`].
///
/// New guests always start with `checked_in == false`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuestDraft {
    /// First name.
    pub name: String,
    /// Surname.
    pub surname: String,
    /// Photo path; empty when there is none.
    pub photo_ref: String,
    /// Event the guest is registered for.
    pub event_name: String,
}

impl GuestRecord {
    /// Materializes a record from a draft and a store-assigned id.
    pub fn from_draft(id: GuestId, draft: GuestDraft) -> Self {
        Self {
            id,
            name: draft.name,
            surname: draft.surname,
            photo_ref: draft.photo_ref,
            event_name: draft.event_name,
            checked_in: false,
        }
    }

    /// Roster ordering key: surname ascending, id as tie-break.
    pub fn order_key(&self) -> (&str, GuestId) {
        (self.surname.as_str(), self.id)
    }
}
