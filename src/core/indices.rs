use hashbrown::HashMap;

use crate::types::GuestId;

/// Multi-value index from a key to the guests carrying it.
pub type VecIndex<K> = HashMap<K, Vec<GuestId>>;
