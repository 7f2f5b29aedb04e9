//! Static achievement level table and level derivation
//!
//! Levels are derived from XP, never stored. The table is compiled in and
//! immutable; there is no runtime mutation path.

use crate::models::RewardType;
use serde::Serialize;

/// A reward granted when a level is reached. The payload is keyed by the
/// reward type rather than carried in a single untyped value field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardTemplate {
    Badge { id: &'static str },
    Discount { percent: i64 },
    FreeService { service: &'static str },
    VipStatus,
}

impl RewardTemplate {
    pub fn reward_type(&self) -> RewardType {
        match self {
            Self::Badge { .. } => RewardType::Badge,
            Self::Discount { .. } => RewardType::Discount,
            Self::FreeService { .. } => RewardType::FreeService,
            Self::VipStatus => RewardType::VipStatus,
        }
    }
}

/// One row of the achievement level table
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    pub level: u32,
    pub required_xp: i64,
    pub name: &'static str,
    pub description: &'static str,
    pub rewards: &'static [RewardTemplate],
}

/// Achievement levels, ordered by strictly increasing XP threshold.
/// Level 1 requires 0 XP and is always attained.
pub const ACHIEVEMENT_LEVELS: &[LevelDefinition] = &[
    LevelDefinition {
        level: 1,
        required_xp: 0,
        name: "Newcomer",
        description: "Welcome to the CARX community!",
        rewards: &[],
    },
    LevelDefinition {
        level: 2,
        required_xp: 100,
        name: "Learner",
        description: "You are getting active on the platform",
        rewards: &[RewardTemplate::Badge { id: "learner" }],
    },
    LevelDefinition {
        level: 3,
        required_xp: 300,
        name: "Active Member",
        description: "You are becoming one of our active members!",
        rewards: &[
            RewardTemplate::Badge { id: "active_member" },
            // 5% on auto parts and 5% on car wash are separate coupons
            RewardTemplate::Discount { percent: 5 },
            RewardTemplate::Discount { percent: 5 },
        ],
    },
    LevelDefinition {
        level: 4,
        required_xp: 700,
        name: "Expert",
        description: "Your knowledge and activity help others!",
        rewards: &[
            RewardTemplate::Badge { id: "expert" },
            RewardTemplate::Discount { percent: 10 },
            RewardTemplate::Discount { percent: 5 },
            RewardTemplate::FreeService { service: "car_wash" },
        ],
    },
    LevelDefinition {
        level: 5,
        required_xp: 1500,
        name: "Master",
        description: "You are a true professional!",
        rewards: &[
            RewardTemplate::Badge { id: "master" },
            RewardTemplate::FreeService { service: "consultation" },
            RewardTemplate::Discount { percent: 15 },
            RewardTemplate::Discount { percent: 10 },
            RewardTemplate::FreeService { service: "car_wash_3" },
        ],
    },
    LevelDefinition {
        level: 6,
        required_xp: 3000,
        name: "Legend",
        description: "You are a legend already!",
        rewards: &[
            RewardTemplate::Badge { id: "legend" },
            RewardTemplate::Badge { id: "vip" },
            RewardTemplate::Discount { percent: 20 },
            RewardTemplate::Discount { percent: 15 },
            RewardTemplate::FreeService { service: "premium_month" },
            RewardTemplate::FreeService { service: "car_wash_5" },
        ],
    },
];

/// Derive the current level from an XP balance: the highest level whose
/// threshold is met, falling back to level 1.
pub fn current_level(xp: i64) -> u32 {
    for definition in ACHIEVEMENT_LEVELS.iter().rev() {
        if xp >= definition.required_xp {
            return definition.level;
        }
    }
    1
}

/// Look up a level's definition by number
pub fn level_definition(level: u32) -> Option<&'static LevelDefinition> {
    ACHIEVEMENT_LEVELS.iter().find(|d| d.level == level)
}

/// Highest defined level
pub fn max_level() -> u32 {
    ACHIEVEMENT_LEVELS.last().map(|d| d.level).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds() {
        assert_eq!(current_level(0), 1);
        assert_eq!(current_level(99), 1);
        assert_eq!(current_level(100), 2);
        assert_eq!(current_level(299), 2);
        assert_eq!(current_level(300), 3);
        assert_eq!(current_level(3000), 6);
        assert_eq!(current_level(10_000), 6);
    }

    #[test]
    fn test_monotonic_non_decreasing() {
        let mut previous = 0;
        for xp in 0..4000 {
            let level = current_level(xp);
            assert!(level >= previous, "level dropped at xp={}", xp);
            previous = level;
        }
    }

    #[test]
    fn test_table_is_strictly_increasing() {
        for pair in ACHIEVEMENT_LEVELS.windows(2) {
            assert!(pair[0].required_xp < pair[1].required_xp);
            assert_eq!(pair[0].level + 1, pair[1].level);
        }
    }

    #[test]
    fn test_max_level() {
        assert_eq!(max_level(), 6);
        assert!(level_definition(7).is_none());
        assert_eq!(level_definition(4).unwrap().required_xp, 700);
    }
}
