//! Activity kinds and their fixed XP awards

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Everything that can earn (or, for exchanges, track) XP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    CreatePost,
    LikePost,
    ReceivePostLike,
    CreateComment,
    ReceiveCommentLike,
    DailyLogin,
    WeeklyActive,
    CompleteProfile,
    UseService,
    ReviewService,
    InviteFriend,
    ReferredServiceUse,
    XpExchange,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 13] = [
        Self::CreatePost,
        Self::LikePost,
        Self::ReceivePostLike,
        Self::CreateComment,
        Self::ReceiveCommentLike,
        Self::DailyLogin,
        Self::WeeklyActive,
        Self::CompleteProfile,
        Self::UseService,
        Self::ReviewService,
        Self::InviteFriend,
        Self::ReferredServiceUse,
        Self::XpExchange,
    ];

    /// Fixed XP awarded for this activity
    pub fn xp_award(&self) -> i64 {
        match self {
            Self::CreatePost => 50,
            Self::LikePost => 2,
            Self::ReceivePostLike => 5,
            Self::CreateComment => 10,
            Self::ReceiveCommentLike => 2,
            Self::DailyLogin => 5,
            Self::WeeklyActive => 25,
            Self::CompleteProfile => 20,
            Self::UseService => 30,
            Self::ReviewService => 15,
            Self::InviteFriend => 100,
            Self::ReferredServiceUse => 50,
            // Tracking-only: the actual (negative) delta is passed explicitly
            Self::XpExchange => 0,
        }
    }

    /// Wire/storage name of this activity kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatePost => "CREATE_POST",
            Self::LikePost => "LIKE_POST",
            Self::ReceivePostLike => "RECEIVE_POST_LIKE",
            Self::CreateComment => "CREATE_COMMENT",
            Self::ReceiveCommentLike => "RECEIVE_COMMENT_LIKE",
            Self::DailyLogin => "DAILY_LOGIN",
            Self::WeeklyActive => "WEEKLY_ACTIVE",
            Self::CompleteProfile => "COMPLETE_PROFILE",
            Self::UseService => "USE_SERVICE",
            Self::ReviewService => "REVIEW_SERVICE",
            Self::InviteFriend => "INVITE_FRIEND",
            Self::ReferredServiceUse => "REFERRED_SERVICE_USE",
            Self::XpExchange => "XP_EXCHANGE",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = Error;

    /// The validation boundary for string-typed collaborator input:
    /// unknown kinds are rejected before any mutation happens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidActivity(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_every_kind() {
        for kind in ActivityKind::ALL {
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let err = "TAKE_OVER_THE_WORLD".parse::<ActivityKind>().unwrap_err();
        assert!(matches!(err, Error::InvalidActivity(_)));
    }

    #[test]
    fn test_fixed_awards() {
        assert_eq!(ActivityKind::CreatePost.xp_award(), 50);
        assert_eq!(ActivityKind::LikePost.xp_award(), 2);
        assert_eq!(ActivityKind::DailyLogin.xp_award(), 5);
        assert_eq!(ActivityKind::WeeklyActive.xp_award(), 25);
        assert_eq!(ActivityKind::InviteFriend.xp_award(), 100);
        assert_eq!(ActivityKind::XpExchange.xp_award(), 0);
    }
}
