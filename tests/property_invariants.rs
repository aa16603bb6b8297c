use std::collections::BTreeSet;

use proptest::prelude::*;

use doorlist::{
    core::store::GuestStore,
    guest::GuestDraft,
    types::GuestId,
};

#[derive(Debug, Clone)]
enum Action {
    Add { name_idx: u8, surname_idx: u8, event_idx: u8 },
    Rename { target: u8, surname_idx: u8 },
    Move { target: u8, event_idx: u8 },
    Remove { target: u8 },
    Toggle { target: u8 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..16, 0u8..16, 0u8..6).prop_map(|(name_idx, surname_idx, event_idx)| Action::Add {
            name_idx,
            surname_idx,
            event_idx
        }),
        (0u8..32, 0u8..16).prop_map(|(target, surname_idx)| Action::Rename { target, surname_idx }),
        (0u8..32, 0u8..6).prop_map(|(target, event_idx)| Action::Move { target, event_idx }),
        (0u8..32).prop_map(|target| Action::Remove { target }),
        (0u8..32).prop_map(|target| Action::Toggle { target }),
    ]
}

fn draft_from(name_idx: u8, surname_idx: u8, event_idx: u8) -> GuestDraft {
    GuestDraft {
        name: format!("Name{name_idx}"),
        surname: format!("Surname{surname_idx:02}"),
        photo_ref: String::new(),
        event_name: format!("Event{event_idx}"),
    }
}

fn pick(store: &GuestStore, target: u8) -> Option<GuestId> {
    let ids = store.ordered_ids();
    if ids.is_empty() {
        None
    } else {
        Some(ids[usize::from(target) % ids.len()])
    }
}

fn full_scan_by_event(store: &GuestStore, event: &str) -> BTreeSet<GuestId> {
    store
        .ordered_ids()
        .iter()
        .copied()
        .filter(|id| store.get(*id).is_some_and(|g| g.event_name == event))
        .collect()
}

fn by_event_ids(store: &GuestStore, event: &str) -> BTreeSet<GuestId> {
    store.by_event(event).into_iter().map(|g| g.id).collect()
}

fn assert_roster_sorted(store: &GuestStore) -> Result<(), TestCaseError> {
    let keys: Vec<(String, GuestId)> = store
        .all()
        .iter()
        .map(|g| (g.surname.clone(), g.id))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    prop_assert_eq!(keys, sorted);

    let ids: BTreeSet<GuestId> = store.ordered_ids().iter().copied().collect();
    prop_assert_eq!(ids.len(), store.len());
    Ok(())
}

proptest! {
    #[test]
    fn random_sequences_preserve_order_ids_and_event_index(actions in prop::collection::vec(action_strategy(), 1..200)) {
        let mut store = GuestStore::new();
        let mut events = BTreeSet::<String>::new();
        let mut seen_ids = BTreeSet::<GuestId>::new();

        for action in actions {
            match action {
                Action::Add { name_idx, surname_idx, event_idx } => {
                    let draft = draft_from(name_idx, surname_idx, event_idx);
                    events.insert(draft.event_name.clone());
                    let (id, _) = store.add(draft).expect("add");
                    // Ids are never reused, even after removals.
                    prop_assert!(seen_ids.insert(id));
                }
                Action::Rename { target, surname_idx } => {
                    if let Some(id) = pick(&store, target) {
                        let mut guest = store.get_cloned(id).expect("record");
                        guest.surname = format!("Surname{surname_idx:02}");
                        let _ = store.update(guest);
                    }
                }
                Action::Move { target, event_idx } => {
                    if let Some(id) = pick(&store, target) {
                        let mut guest = store.get_cloned(id).expect("record");
                        guest.event_name = format!("Event{event_idx}");
                        events.insert(guest.event_name.clone());
                        let _ = store.update(guest);
                    }
                }
                Action::Remove { target } => {
                    if let Some(id) = pick(&store, target) {
                        let _ = store.remove(id);
                        prop_assert!(store.get(id).is_none());
                    }
                }
                Action::Toggle { target } => {
                    if let Some(id) = pick(&store, target) {
                        let before = store.get(id).expect("record").checked_in;
                        let (_, after) = store.toggle_check_in(id).expect("toggle");
                        prop_assert_eq!(after, !before);
                    }
                }
            }

            assert_roster_sorted(&store)?;
            for event in &events {
                prop_assert_eq!(by_event_ids(&store, event), full_scan_by_event(&store, event));
            }
        }
    }

    #[test]
    fn toggling_twice_is_identity(surname_idx in 0u8..16, toggles in 0usize..8) {
        let mut store = GuestStore::new();
        let (id, _) = store.add(draft_from(0, surname_idx, 0)).expect("add");

        for _ in 0..toggles * 2 {
            store.toggle_check_in(id).expect("toggle");
        }
        prop_assert!(!store.get(id).expect("record").checked_in);
    }
}
