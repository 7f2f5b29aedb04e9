//! Aggregated achievements view

use crate::levels::RewardTemplate;
use serde::Serialize;

/// Per-level status joined against the user's XP and claimed rewards
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    pub level: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub required_xp: i64,
    /// Level reached
    pub achieved: bool,
    /// Reached and at least one reward is still unclaimed
    pub claimable: bool,
    /// At least one reward for this level has been claimed
    pub claimed: bool,
    pub rewards: Vec<TemplateStatus>,
}

/// A level's reward template plus whether a matching reward was claimed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateStatus {
    #[serde(flatten)]
    pub template: RewardTemplate,
    pub claimed: bool,
}

/// The full achievements view for a user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementsView {
    pub xp: i64,
    pub level: u32,
    pub achievements: Vec<AchievementStatus>,
    /// Claimed badge ids
    pub badges: Vec<String>,
    /// Next level to aim for, capped at the highest defined level
    pub next_level: u32,
    /// XP threshold of the next level; None at max level
    pub next_level_xp: Option<i64>,
    /// Percentage toward the next level, 100 at max level
    pub progress: u32,
}

impl Default for AchievementsView {
    /// Safe fallback returned when the view cannot be built
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            achievements: Vec::new(),
            badges: Vec::new(),
            next_level: 2,
            next_level_xp: Some(100),
            progress: 0,
        }
    }
}
