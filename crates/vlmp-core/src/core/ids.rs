use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    pub struct ModelKey;
}

/// A particle id in the id space of a single model, before its offset is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(pub usize);

/// A particle id in the id space of a whole assembled simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalId(pub usize);

/// The amount added to the local ids of a model to place them in the global id space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdOffset(pub usize);

impl LocalId {
    #[inline]
    pub fn to_global(self, offset: IdOffset) -> GlobalId {
        GlobalId(self.0 + offset.0)
    }
}

impl GlobalId {
    /// Maps a global id back into a model's local space, if it lies at or above the offset.
    #[inline]
    pub fn to_local(self, offset: IdOffset) -> Option<LocalId> {
        self.0.checked_sub(offset.0).map(LocalId)
    }
}

impl IdOffset {
    /// Advances the offset past a model holding `count` particles.
    pub fn advance(self, count: usize) -> Option<IdOffset> {
        self.0.checked_add(count).map(IdOffset)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for IdOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_to_global_and_back_roundtrips() {
        let offset = IdOffset(10);
        let global = LocalId(3).to_global(offset);
        assert_eq!(global, GlobalId(13));
        assert_eq!(global.to_local(offset), Some(LocalId(3)));
    }

    #[test]
    fn to_local_below_offset_is_none() {
        assert_eq!(GlobalId(2).to_local(IdOffset(5)), None);
    }

    #[test]
    fn advance_detects_overflow() {
        assert_eq!(IdOffset(4).advance(3), Some(IdOffset(7)));
        assert_eq!(IdOffset(usize::MAX).advance(1), None);
    }
}
