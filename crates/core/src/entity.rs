//! Identity-bearing domain records.

/// A record whose identity outlives changes to its fields.
///
/// Products, cart items and orders are entities: two records with the same
/// fields but different ids are different things.
pub trait Entity {
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
