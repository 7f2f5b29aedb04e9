//! Exchange market models

use crate::models::RewardType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog categories; each maps onto the reward type an exchange mints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    Discount,
    Service,
    Badge,
    Premium,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discount => "DISCOUNT",
            Self::Service => "SERVICE",
            Self::Badge => "BADGE",
            Self::Premium => "PREMIUM",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog item annotated with affordability for one user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeItemView {
    pub id: String,
    pub category: String,
    pub name: String,
    pub description: String,
    pub xp_cost: i64,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Whether the user's current XP covers the cost
    pub available: bool,
}

/// The reward minted by a successful exchange
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeReward {
    #[serde(rename = "type")]
    pub reward_type: RewardType,
    pub badge: Option<String>,
    pub discount_percent: Option<i64>,
    pub code: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of an exchange attempt. Precondition failures are reported here
/// with `success = false` rather than as errors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeOutcome {
    pub success: bool,
    #[serde(rename = "newXP")]
    pub new_xp: i64,
    pub reward: Option<ExchangeReward>,
    pub message: String,
}

impl ExchangeOutcome {
    /// An unsuccessful outcome that left the balance untouched
    pub fn rejected(new_xp: i64, message: impl Into<String>) -> Self {
        Self {
            success: false,
            new_xp,
            reward: None,
            message: message.into(),
        }
    }
}
