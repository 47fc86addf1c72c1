//! Node-local settings that do not affect consensus

use std::collections::BTreeMap;
use std::ops::BitOr;

use keeper_common::BlockId;
use serde::{Deserialize, Serialize};

/// Validation steps a node may skip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkipFlags(pub u32);

impl SkipFlags {
    pub const NOTHING: SkipFlags = SkipFlags(0);
    pub const SKIP_AUTHORITY_CHECK: SkipFlags = SkipFlags(1 << 0);
    pub const SKIP_UNDO_HISTORY_CHECK: SkipFlags = SkipFlags(1 << 1);

    pub fn contains(self, other: SkipFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SkipFlags {
    type Output = SkipFlags;

    fn bitor(self, rhs: SkipFlags) -> SkipFlags {
        SkipFlags(self.0 | rhs.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeProperties {
    pub skip_flags: SkipFlags,
}

/// Trusted block ids by number; blocks at or below the newest one are not
/// penalised for missed slots
pub type Checkpoints = BTreeMap<u32, BlockId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_combine() {
        let flags = SkipFlags::NOTHING | SkipFlags::SKIP_AUTHORITY_CHECK;
        assert!(flags.contains(SkipFlags::SKIP_AUTHORITY_CHECK));
        assert!(!flags.contains(SkipFlags::SKIP_UNDO_HISTORY_CHECK));
        assert!(flags.contains(SkipFlags::NOTHING));
    }
}
