//! Specialized collection types

pub use slotmap::{new_key_type, Key, SlotMap};

/// Handle-based map using slot map for stable, generational references
///
/// A removed slot bumps its generation, so a handle kept past removal never
/// resolves to whatever gets inserted into the same slot later.
pub type HandleMap<K, T> = SlotMap<K, T>;
