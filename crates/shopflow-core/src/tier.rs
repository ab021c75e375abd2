//! Accessibility tier escalation.
//!
//! When the user reports that a requested physical check is out of reach,
//! the session steps up a fixed ladder of increasingly invasive access
//! tiers instead of repeating the unreachable test. The last tier is
//! terminal: past it, diagnosis requires shop labor.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Ordered ladder of physical-access difficulty.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccessTier {
    /// Scan-tool and freeze-frame data only.
    #[default]
    Scan,
    /// Checks reachable from the engine bay with basic hand tools.
    EngineBay,
    /// Moderate teardown: wheel off, splash shields, air box out.
    ModerateTeardown,
    /// Major labor: intake manifold, fuel tank, subframe.
    MajorLabor,
}

impl AccessTier {
    /// The next, more invasive tier, or `None` at the top of the ladder.
    pub fn escalate(self) -> Option<Self> {
        match self {
            Self::Scan => Some(Self::EngineBay),
            Self::EngineBay => Some(Self::ModerateTeardown),
            Self::ModerateTeardown => Some(Self::MajorLabor),
            Self::MajorLabor => None,
        }
    }
}

/// Keyword set that classifies a reply as "not accessible".
const INACCESSIBLE_KEYWORDS: &[&str] = &[
    "can't reach",
    "cannot reach",
    "can't get to",
    "cant get to",
    "hard to reach",
    "too hard",
    "buried",
    "have to remove",
    "need to remove",
    "have to pull",
    "need to pull",
    "tear down",
    "tear apart",
    "under the intake",
    "behind the intake",
    "drop the tank",
    "no access",
    "not accessible",
];

/// True when a pending-answer reply reports the check is out of reach.
pub fn is_inaccessible(text: &str) -> bool {
    let lower = text.to_lowercase();
    INACCESSIBLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_order_and_top() {
        assert_eq!(AccessTier::Scan.escalate(), Some(AccessTier::EngineBay));
        assert_eq!(
            AccessTier::ModerateTeardown.escalate(),
            Some(AccessTier::MajorLabor)
        );
        assert_eq!(AccessTier::MajorLabor.escalate(), None);
        assert!(AccessTier::Scan < AccessTier::MajorLabor);
    }

    #[test]
    fn test_inaccessible_detection() {
        assert!(is_inaccessible("I can't reach that coil, it's buried"));
        assert!(is_inaccessible("You'd have to remove the intake for that"));
        assert!(!is_inaccessible("yes, checked it"));
    }
}
