//! XP balance and grant views

use serde::{Deserialize, Serialize};

/// Current XP and derived level
#[derive(Debug, Clone, Copy, Serialize)]
pub struct XpSummary {
    pub xp: i64,
    pub level: u32,
}

/// Outcome of an XP grant
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct XpGrant {
    pub xp: i64,
    pub level: u32,
    pub level_up: bool,
}

/// What triggered an XP grant (a post, a comment, an exchange item, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub id: String,
    pub kind: String,
}

impl SourceRef {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
        }
    }
}

/// Outcome of a daily-login check
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DailyLoginOutcome {
    /// First login of the calendar day: XP was granted
    Granted(XpGrant),
    /// Already claimed today, nothing changed
    AlreadyClaimed { xp: i64, level: u32 },
    /// The check itself failed; callers treat this as a no-op
    Failed,
}
