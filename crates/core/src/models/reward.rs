//! Reward types and outward-facing reward views

use crate::errors::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of benefit a reward grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RewardType {
    Badge,
    Discount,
    FreeService,
    VipStatus,
}

impl RewardType {
    /// Wire/storage name of this reward type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Badge => "BADGE",
            Self::Discount => "DISCOUNT",
            Self::FreeService => "FREE_SERVICE",
            Self::VipStatus => "VIP_STATUS",
        }
    }

    /// First three letters of the wire name, used as the code prefix
    pub fn code_prefix(&self) -> &'static str {
        match self {
            Self::Badge => "BAD",
            Self::Discount => "DIS",
            Self::FreeService => "FRE",
            Self::VipStatus => "VIP",
        }
    }

    /// Badges are the only reward without a redeemable code
    pub fn has_code(&self) -> bool {
        !matches!(self, Self::Badge)
    }

    /// Badges are the only reward that never expires
    pub fn expires(&self) -> bool {
        !matches!(self, Self::Badge)
    }
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BADGE" => Ok(Self::Badge),
            "DISCOUNT" => Ok(Self::Discount),
            "FREE_SERVICE" => Ok(Self::FreeService),
            "VIP_STATUS" => Ok(Self::VipStatus),
            other => Err(Error::InvalidData(format!("unknown reward type: {other}"))),
        }
    }
}

/// A reward as returned by a claim call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedReward {
    #[serde(rename = "type")]
    pub reward_type: RewardType,
    pub code: Option<String>,
    pub discount_percent: Option<i64>,
    pub badge: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of claiming an achievement: the full batch of rewards it unlocked
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedAchievement {
    pub achievement_id: String,
    pub rewards: Vec<ClaimedReward>,
}

/// A claimed reward in the user's reward list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardView {
    pub id: i64,
    #[serde(rename = "type")]
    pub reward_type: RewardType,
    pub name: String,
    pub code: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub used: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_prefixes() {
        assert_eq!(RewardType::Discount.code_prefix(), "DIS");
        assert_eq!(RewardType::FreeService.code_prefix(), "FRE");
        assert_eq!(RewardType::VipStatus.code_prefix(), "VIP");
    }

    #[test]
    fn test_badge_never_expires_and_has_no_code() {
        assert!(!RewardType::Badge.has_code());
        assert!(!RewardType::Badge.expires());
        assert!(RewardType::Discount.has_code());
        assert!(RewardType::Discount.expires());
    }

    #[test]
    fn test_parse_storage_names() {
        for reward_type in [
            RewardType::Badge,
            RewardType::Discount,
            RewardType::FreeService,
            RewardType::VipStatus,
        ] {
            assert_eq!(reward_type.as_str().parse::<RewardType>().unwrap(), reward_type);
        }
        assert!("GOLD_STAR".parse::<RewardType>().is_err());
    }
}
