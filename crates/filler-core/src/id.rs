use serde::{Deserialize, Serialize};

/// Identifies a material (block or item kind). Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Stable identifier of a pattern strategy. `PatternId::NONE` (0) means
/// "no pattern" and is never assigned to a real pattern.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PatternId(pub u16);

impl PatternId {
    pub const NONE: PatternId = PatternId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_id_equality() {
        assert_eq!(MaterialId(3), MaterialId(3));
        assert_ne!(MaterialId(3), MaterialId(4));
    }

    #[test]
    fn pattern_id_default_is_none() {
        assert!(PatternId::default().is_none());
        assert!(!PatternId(7).is_none());
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(PatternId(1), "fill");
        map.insert(PatternId(2), "clear");
        assert_eq!(map[&PatternId(2)], "clear");
    }
}
