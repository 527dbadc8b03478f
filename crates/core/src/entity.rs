//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing revision of the entity's state.
    ///
    /// Starts at 1 when the entity is created and grows by exactly one per
    /// state transition. Storage uses it for version-checked replace.
    fn version(&self) -> u64;
}
