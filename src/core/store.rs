use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;

use crate::{
    core::indices::VecIndex,
    guest::{GuestDraft, GuestRecord},
    op::{Op, StoredOp},
    types::{GuestId, OpSeq},
};

/// Errors returned by [`GuestStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record exists for the given id.
    MissingGuest(GuestId),
    /// A record with the given id already exists.
    AlreadyExists(GuestId),
}

/// Authoritative in-memory guest roster.
///
/// Records are kept ordered by `(surname, id)` ascending; every mutation
/// returns the [`StoredOp`] describing the row change so callers can forward
/// it to a persistence sink.
#[derive(Debug, Default)]
pub struct GuestStore {
    records: HashMap<GuestId, GuestRecord>,
    order: Vec<GuestId>,
    by_event: VecIndex<String>,
    pending_ops: Vec<StoredOp>,
    next_op_seq: OpSeq,
    next_guest_id: GuestId,
}

impl GuestStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            next_op_seq: 1,
            next_guest_id: 1,
            ..Self::default()
        }
    }

    /// Rebuilds a store from persisted rows.
    ///
    /// Row order does not matter; the roster is re-sorted and the next guest
    /// id resumes after the highest id seen.
    pub fn from_rows(rows: Vec<GuestRecord>) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for rec in rows {
            if store.records.contains_key(&rec.id) {
                return Err(StoreError::AlreadyExists(rec.id));
            }
            store.next_guest_id = store.next_guest_id.max(rec.id.saturating_add(1));
            let pos = store.insert_position(&rec.surname, rec.id);
            store.order.insert(pos, rec.id);
            store.index_event(&rec.event_name, rec.id);
            store.records.insert(rec.id, rec);
        }
        Ok(store)
    }

    /// Inserts a new guest, assigning the next id. `checked_in` starts false.
    pub fn add(&mut self, draft: GuestDraft) -> Result<(GuestId, StoredOp), StoreError> {
        let id = self.next_guest_id;
        self.next_guest_id += 1;

        let guest = GuestRecord::from_draft(id, draft);
        if self.records.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }

        let pos = self.insert_position(&guest.surname, id);
        self.order.insert(pos, id);
        self.index_event(&guest.event_name, id);
        self.records.insert(id, guest.clone());

        let stored = self.record_op(Op::Add { guest });
        Ok((id, stored))
    }

    /// Replaces the record matching `guest.id`, returning the previous one.
    ///
    /// The roster position and event index are fixed up when the surname or
    /// event changed.
    pub fn update(&mut self, guest: GuestRecord) -> Result<(StoredOp, GuestRecord), StoreError> {
        let id = guest.id;
        let prev = self
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::MissingGuest(id))?;

        if prev.surname != guest.surname {
            self.unlink_order(id);
            let pos = self.insert_position(&guest.surname, id);
            self.order.insert(pos, id);
        }

        if prev.event_name != guest.event_name {
            Self::remove_from_vec_index(self.by_event.entry(prev.event_name.clone()).or_default(), id);
            self.index_event(&guest.event_name, id);
        }

        self.records.insert(id, guest.clone());
        let stored = self.record_op(Op::Update { guest });
        Ok((stored, prev))
    }

    /// Removes a guest by id, returning the removed record.
    pub fn remove(&mut self, id: GuestId) -> Result<(StoredOp, GuestRecord), StoreError> {
        let removed = self.records.remove(&id).ok_or(StoreError::MissingGuest(id))?;
        self.unlink_order(id);
        Self::remove_from_vec_index(
            self.by_event.entry(removed.event_name.clone()).or_default(),
            id,
        );

        let stored = self.record_op(Op::Remove { id });
        Ok((stored, removed))
    }

    /// Flips the check-in flag of a guest, returning the new value.
    pub fn toggle_check_in(&mut self, id: GuestId) -> Result<(StoredOp, bool), StoreError> {
        let rec = self.records.get_mut(&id).ok_or(StoreError::MissingGuest(id))?;
        rec.checked_in = !rec.checked_in;
        let checked_in = rec.checked_in;

        let stored = self.record_op(Op::SetCheckedIn { id, checked_in });
        Ok((stored, checked_in))
    }

    /// Borrows a record by id.
    pub fn get(&self, id: GuestId) -> Option<&GuestRecord> {
        self.records.get(&id)
    }

    /// Clones a record by id.
    pub fn get_cloned(&self, id: GuestId) -> Option<GuestRecord> {
        self.get(id).cloned()
    }

    /// Full roster, ordered by `(surname, id)` ascending.
    pub fn all(&self) -> Vec<&GuestRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Cloned full roster in roster order.
    pub fn all_cloned(&self) -> Vec<GuestRecord> {
        self.all().into_iter().cloned().collect()
    }

    /// Guests registered for `event_name`, in insertion order.
    pub fn by_event(&self, event_name: &str) -> Vec<&GuestRecord> {
        self.by_event
            .get(event_name)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Cloned variant of [`Self::by_event`].
    pub fn by_event_cloned(&self, event_name: &str) -> Vec<GuestRecord> {
        self.by_event(event_name).into_iter().cloned().collect()
    }

    /// Roster ids in order.
    pub fn ordered_ids(&self) -> &[GuestId] {
        &self.order
    }

    /// Number of guests.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Takes all ops accumulated since the last drain.
    pub fn drain_pending_ops(&mut self) -> Vec<StoredOp> {
        std::mem::take(&mut self.pending_ops)
    }

    /// Number of ops accumulated since the last drain.
    pub fn pending_len(&self) -> usize {
        self.pending_ops.len()
    }

    /// Highest sequence number assigned so far.
    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    fn record_op(&mut self, op: Op) -> StoredOp {
        let seq = self.next_op_seq;
        self.next_op_seq += 1;
        let stored = StoredOp {
            seq,
            ts_ms: now_ms(),
            op,
        };
        self.pending_ops.push(stored.clone());
        stored
    }

    /// Roster slot for `(surname, id)` among the currently ordered ids.
    fn insert_position(&self, surname: &str, id: GuestId) -> usize {
        self.order.partition_point(|other| {
            let rec = &self.records[other];
            rec.order_key() < (surname, id)
        })
    }

    fn unlink_order(&mut self, id: GuestId) {
        if let Some(pos) = self.order.iter().position(|x| *x == id) {
            self.order.remove(pos);
        }
    }

    fn index_event(&mut self, event_name: &str, id: GuestId) {
        self.by_event
            .entry(event_name.to_string())
            .or_default()
            .push(id);
    }

    fn remove_from_vec_index(v: &mut Vec<GuestId>, id: GuestId) {
        if let Some(pos) = v.iter().position(|x| *x == id) {
            v.remove(pos);
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
