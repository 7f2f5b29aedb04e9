//! The achievements service: XP ledger, level-up orchestration, reward
//! lifecycle, and the exchange market.
//!
//! Collaborators (auth, community, bookings) call into this service after
//! their own writes succeed. Read paths degrade to safe defaults so a
//! failure here never breaks the action that triggered the call.

use std::sync::Arc;

use carx_core::{
    current_level, level_definition, max_level, AchievementStatus, AchievementsView, ActivityKind,
    ClaimedAchievement, ClaimedReward, DailyLoginOutcome, Error, ExchangeItemView, ExchangeOutcome,
    ExchangeReward, Result, RewardTemplate, RewardType, RewardView, SourceRef, TemplateStatus,
    XpGrant, XpSummary, ACHIEVEMENT_LEVELS,
};
use carx_persistence::sqlite::{self, Database, ExchangeItemRow, NewReward, RewardRow, XpActivityRow};
use chrono::{Duration, Local, Utc};
use tracing::{error, info, warn};

use crate::catalog::DEFAULT_EXCHANGE_ITEMS;
use crate::codes::generate_code;

const SOURCE_LEVEL_UP: &str = "level_up";
const SOURCE_EXCHANGE: &str = "exchange";

/// How many activities within the trailing week earn the weekly bonus
const WEEKLY_ACTIVITY_THRESHOLD: u32 = 5;

/// Reward validity window for everything except badges
const REWARD_VALIDITY_DAYS: i64 = 30;

/// The gamification engine facade
pub struct AchievementsService {
    db: Arc<Database>,
}

impl AchievementsService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert the default exchange catalog when the table is empty.
    /// Returns how many items were added.
    pub async fn seed_default_catalog(&self) -> Result<usize> {
        let pool = self.db.pool();
        if sqlite::count_items(pool).await? > 0 {
            return Ok(0);
        }

        info!("Seeding {} default exchange items", DEFAULT_EXCHANGE_ITEMS.len());
        let mut added = 0;
        for item in DEFAULT_EXCHANGE_ITEMS {
            let row = ExchangeItemRow {
                id: item.id.to_string(),
                category: item.category.as_str().to_string(),
                name: item.name.to_string(),
                description: item.description.to_string(),
                xp_cost: item.xp_cost,
                discount_percent: item.discount_percent,
                icon: Some(item.icon.to_string()),
                color: Some(item.color.to_string()),
                active: true,
            };
            if sqlite::insert_item(pool, &row).await? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Current XP and level. Never fails: storage errors degrade to `{0, 1}`.
    pub async fn get_xp(&self, user_id: &str) -> XpSummary {
        match sqlite::get_or_create_balance(self.db.pool(), user_id).await {
            Ok(balance) => XpSummary {
                xp: balance.xp,
                level: current_level(balance.xp),
            },
            Err(e) => {
                error!("Failed to read XP balance for {}: {}", user_id, e);
                XpSummary { xp: 0, level: 1 }
            }
        }
    }

    /// Add XP, record the activity, and issue level-up rewards for every
    /// crossed level. The grant itself is never rolled back by a failure in
    /// the history append or the reward minting.
    pub async fn add_xp(
        &self,
        user_id: &str,
        amount: i64,
        kind: ActivityKind,
        source: Option<&SourceRef>,
    ) -> Result<XpGrant> {
        let pool = self.db.pool();
        let balance = sqlite::get_or_create_balance(pool, user_id).await?;
        let level_before = current_level(balance.xp);

        let new_xp = sqlite::add_xp(pool, user_id, amount).await?;

        // Recorded even for zero-XP tracking activities; a failed append must
        // not unwind the committed balance mutation.
        if let Err(e) = sqlite::log_activity(
            pool,
            user_id,
            kind.as_str(),
            amount,
            source.map(|s| s.id.as_str()),
            source.map(|s| s.kind.as_str()),
        )
        .await
        {
            warn!("Failed to record {} activity for {}: {}", kind, user_id, e);
        }

        let level_after = current_level(new_xp);
        let level_up = level_after > level_before;

        if level_up {
            self.issue_level_rewards(user_id, level_before, level_after).await;
        }

        Ok(XpGrant {
            xp: new_xp,
            level: level_after,
            level_up,
        })
    }

    /// Add the fixed XP award for an activity kind
    pub async fn add_activity_xp(
        &self,
        user_id: &str,
        kind: ActivityKind,
        source: Option<&SourceRef>,
    ) -> Result<XpGrant> {
        self.add_xp(user_id, kind.xp_award(), kind, source).await
    }

    /// Mint the reward batch for every level crossed by one XP grant.
    /// Best-effort: each template is attempted independently and failures
    /// are logged, never propagated to the activity that earned the XP.
    async fn issue_level_rewards(&self, user_id: &str, level_before: u32, level_after: u32) {
        for level in (level_before + 1)..=level_after {
            let Some(definition) = level_definition(level) else {
                continue;
            };
            let achievement_id = format!("level_{level}");
            for (index, template) in definition.rewards.iter().enumerate() {
                match self
                    .mint_level_reward(user_id, &achievement_id, index, template)
                    .await
                {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        // The unique index dropped a duplicate from a racing grant
                        warn!(
                            "Reward {} #{} for {} was already issued",
                            achievement_id, index, user_id
                        );
                    }
                    Err(e) => {
                        error!(
                            "Failed to mint reward {} #{} for {}: {}",
                            achievement_id, index, user_id, e
                        );
                    }
                }
            }
            info!("User {} reached level {} ({})", user_id, level, definition.name);
        }
    }

    async fn mint_level_reward(
        &self,
        user_id: &str,
        achievement_id: &str,
        template_index: usize,
        template: &RewardTemplate,
    ) -> Result<Option<i64>> {
        let reward_type = template.reward_type();
        let now = Utc::now();
        let reward = NewReward {
            user_id,
            achievement_id,
            reward_type: reward_type.as_str(),
            code: reward_type.has_code().then(|| generate_code(reward_type)),
            discount_percent: match template {
                RewardTemplate::Discount { percent } => Some(*percent),
                _ => None,
            },
            badge: match template {
                RewardTemplate::Badge { id } => Some(*id),
                _ => None,
            },
            display_name: None,
            template_index: Some(template_index as i64),
            expires_at: reward_type
                .expires()
                .then(|| now + Duration::days(REWARD_VALIDITY_DAYS)),
            claimed: false,
            claimed_at: None,
            source_kind: SOURCE_LEVEL_UP,
        };
        sqlite::insert_reward(self.db.pool(), &reward).await
    }

    /// Claim every unclaimed reward for an achievement (`level_<n>`).
    /// Safe to repeat: once everything is claimed the call reports
    /// `NothingToClaim` instead of duplicating grants.
    pub async fn claim_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> Result<ClaimedAchievement> {
        let required_level = achievement_id
            .strip_prefix("level_")
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| Error::NotEligible(achievement_id.to_string()))?;

        let balance = sqlite::get_or_create_balance(self.db.pool(), user_id).await?;
        if current_level(balance.xp) < required_level {
            return Err(Error::NotEligible(achievement_id.to_string()));
        }

        let claimed =
            sqlite::claim_for_achievement(self.db.pool(), user_id, achievement_id, Utc::now())
                .await?;
        if claimed.is_empty() {
            return Err(Error::NothingToClaim(achievement_id.to_string()));
        }

        info!(
            "User {} claimed {} reward(s) for {}",
            user_id,
            claimed.len(),
            achievement_id
        );

        Ok(ClaimedAchievement {
            achievement_id: achievement_id.to_string(),
            rewards: claimed.iter().map(claimed_reward_view).collect(),
        })
    }

    /// Full achievements view: the level table joined with the user's XP and
    /// reward claim state. Degrades to the default view on storage failure.
    pub async fn get_achievements(&self, user_id: &str) -> AchievementsView {
        match self.achievements_view(user_id).await {
            Ok(view) => view,
            Err(e) => {
                error!("Failed to build achievements view for {}: {}", user_id, e);
                AchievementsView::default()
            }
        }
    }

    async fn achievements_view(&self, user_id: &str) -> Result<AchievementsView> {
        let pool = self.db.pool();
        let balance = sqlite::get_or_create_balance(pool, user_id).await?;
        let xp = balance.xp;
        let level = current_level(xp);
        let rewards = sqlite::rewards_for_user(pool, user_id).await?;

        let achievements = ACHIEVEMENT_LEVELS
            .iter()
            .map(|definition| {
                let achievement_id = format!("level_{}", definition.level);
                let achieved = level >= definition.level;
                let claimed_rows: Vec<&RewardRow> = rewards
                    .iter()
                    .filter(|r| r.achievement_id == achievement_id && r.claimed)
                    .collect();
                let has_unclaimed = rewards
                    .iter()
                    .any(|r| r.achievement_id == achievement_id && !r.claimed);

                AchievementStatus {
                    level: definition.level,
                    name: definition.name,
                    description: definition.description,
                    required_xp: definition.required_xp,
                    achieved,
                    claimable: achieved && has_unclaimed,
                    claimed: !claimed_rows.is_empty(),
                    rewards: definition
                        .rewards
                        .iter()
                        .map(|template| TemplateStatus {
                            template: *template,
                            claimed: claimed_rows.iter().any(|r| template_matches(template, r)),
                        })
                        .collect(),
                }
            })
            .collect();

        let badges = rewards
            .iter()
            .filter(|r| r.claimed && r.reward_type == RewardType::Badge.as_str())
            .filter_map(|r| r.badge.clone())
            .collect();

        let top = max_level();
        let (next_level, next_level_xp, progress) = if level < top {
            let next = level + 1;
            let required = level_definition(next).map(|d| d.required_xp).unwrap_or(i64::MAX);
            let percent = (xp as f64 / required as f64 * 100.0).min(100.0);
            (next, Some(required), percent.round() as u32)
        } else {
            (top, None, 100)
        };

        Ok(AchievementsView {
            xp,
            level,
            achievements,
            badges,
            next_level,
            next_level_xp,
            progress,
        })
    }

    /// Grant the daily-login XP at most once per calendar day (local time).
    /// Never fails: storage errors degrade to a `Failed` outcome.
    pub async fn check_daily_login(&self, user_id: &str) -> DailyLoginOutcome {
        match self.daily_login(user_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to process daily login for {}: {}", user_id, e);
                DailyLoginOutcome::Failed
            }
        }
    }

    async fn daily_login(&self, user_id: &str) -> Result<DailyLoginOutcome> {
        let pool = self.db.pool();
        let balance = sqlite::get_or_create_balance(pool, user_id).await?;
        let today = Local::now().date_naive();

        // Calendar-day comparison, not a rolling 24h window
        let claimed_today = balance
            .last_daily_login
            .map(|stamp| stamp.with_timezone(&Local).date_naive() >= today)
            .unwrap_or(false);
        if claimed_today {
            return Ok(DailyLoginOutcome::AlreadyClaimed {
                xp: balance.xp,
                level: current_level(balance.xp),
            });
        }

        // CAS on the previously observed stamp; a concurrent claim that got
        // there first turns this call into "already claimed".
        let stamped =
            sqlite::stamp_daily_login(pool, user_id, balance.last_daily_login, Utc::now()).await?;
        if !stamped {
            let fresh = sqlite::get_or_create_balance(pool, user_id).await?;
            return Ok(DailyLoginOutcome::AlreadyClaimed {
                xp: fresh.xp,
                level: current_level(fresh.xp),
            });
        }

        let grant = self
            .add_xp(
                user_id,
                ActivityKind::DailyLogin.xp_award(),
                ActivityKind::DailyLogin,
                None,
            )
            .await?;
        Ok(DailyLoginOutcome::Granted(grant))
    }

    /// Weekly activity bonus: granted when the previous bonus is older than
    /// seven days and at least five activities were recorded in the trailing
    /// week. Returns None when not eligible.
    pub async fn check_weekly_activity(&self, user_id: &str) -> Result<Option<XpGrant>> {
        let pool = self.db.pool();
        let balance = sqlite::get_or_create_balance(pool, user_id).await?;
        let week_ago = Utc::now() - Duration::days(7);

        let eligible = balance
            .last_weekly_bonus
            .map(|stamp| stamp < week_ago)
            .unwrap_or(true);
        if !eligible {
            return Ok(None);
        }

        let activity_count = sqlite::count_activities_since(pool, user_id, week_ago).await?;
        if activity_count < WEEKLY_ACTIVITY_THRESHOLD {
            return Ok(None);
        }

        // Eligibility check and stamp are combined via CAS: the losing side
        // of a race skips the grant instead of doubling it.
        let stamped =
            sqlite::stamp_weekly_bonus(pool, user_id, balance.last_weekly_bonus, Utc::now())
                .await?;
        if !stamped {
            return Ok(None);
        }

        let grant = self
            .add_xp(
                user_id,
                ActivityKind::WeeklyActive.xp_award(),
                ActivityKind::WeeklyActive,
                None,
            )
            .await?;
        Ok(Some(grant))
    }

    /// Active catalog items annotated with affordability.
    /// Degrades to an empty list on storage failure.
    pub async fn list_exchange_items(&self, user_id: &str) -> Vec<ExchangeItemView> {
        match self.exchange_items_view(user_id).await {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to list exchange items for {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    async fn exchange_items_view(&self, user_id: &str) -> Result<Vec<ExchangeItemView>> {
        let pool = self.db.pool();
        let xp = sqlite::get_or_create_balance(pool, user_id).await?.xp;
        let items = sqlite::active_items(pool).await?;

        Ok(items
            .into_iter()
            .map(|item| ExchangeItemView {
                available: xp >= item.xp_cost,
                id: item.id,
                category: item.category,
                name: item.name,
                description: item.description,
                xp_cost: item.xp_cost,
                icon: item.icon,
                color: item.color,
            })
            .collect())
    }

    /// Spend XP on a catalog item and mint the resulting reward pre-claimed.
    /// Precondition failures come back as an unsuccessful outcome; storage
    /// failures propagate as errors.
    pub async fn exchange(
        &self,
        user_id: &str,
        item_id: &str,
        expected_cost: i64,
    ) -> Result<ExchangeOutcome> {
        let pool = self.db.pool();

        let Some(item) = sqlite::get_active_item(pool, item_id).await? else {
            return Ok(ExchangeOutcome::rejected(0, "Item not found or not available"));
        };

        // Defense against a stale client price
        if item.xp_cost != expected_cost {
            return Ok(ExchangeOutcome::rejected(0, "Invalid XP cost provided"));
        }

        let balance = sqlite::get_or_create_balance(pool, user_id).await?;
        if balance.xp < item.xp_cost {
            return Ok(ExchangeOutcome::rejected(balance.xp, "Not enough XP"));
        }

        // The debit re-checks sufficiency inside the same statement, so two
        // racing exchanges cannot both drain the balance.
        let Some(new_xp) = sqlite::try_debit_xp(pool, user_id, item.xp_cost).await? else {
            let fresh = sqlite::get_or_create_balance(pool, user_id).await?;
            return Ok(ExchangeOutcome::rejected(fresh.xp, "Not enough XP"));
        };

        let reward = self.mint_exchange_reward(user_id, &item).await?;

        if let Err(e) = sqlite::log_activity(
            pool,
            user_id,
            ActivityKind::XpExchange.as_str(),
            -item.xp_cost,
            Some(item.id.as_str()),
            Some("ExchangeItem"),
        )
        .await
        {
            warn!("Failed to record exchange activity for {}: {}", user_id, e);
        }

        info!("User {} exchanged {} XP for {}", user_id, item.xp_cost, item.id);

        Ok(ExchangeOutcome {
            success: true,
            new_xp,
            reward: Some(reward),
            message: "Exchange successful".to_string(),
        })
    }

    async fn mint_exchange_reward(
        &self,
        user_id: &str,
        item: &ExchangeItemRow,
    ) -> Result<ExchangeReward> {
        let (reward_type, badge, discount_percent) = derive_exchange_reward(item);
        let now = Utc::now();
        let code = reward_type.has_code().then(|| generate_code(reward_type));
        let expires_at = reward_type
            .expires()
            .then(|| now + Duration::days(REWARD_VALIDITY_DAYS));
        let achievement_id = format!("exchange_{}", item.id);

        let reward = NewReward {
            user_id,
            achievement_id: &achievement_id,
            reward_type: reward_type.as_str(),
            code: code.clone(),
            discount_percent,
            badge: badge.as_deref(),
            display_name: Some(item.name.as_str()),
            template_index: None,
            expires_at,
            // Exchange rewards are paid for with XP and need no claim step
            claimed: true,
            claimed_at: Some(now),
            source_kind: SOURCE_EXCHANGE,
        };
        sqlite::insert_reward(self.db.pool(), &reward).await?;

        Ok(ExchangeReward {
            reward_type,
            badge,
            discount_percent,
            code,
            expires_at,
        })
    }

    /// Claimed rewards, newest claims first.
    /// Degrades to an empty list on storage failure.
    pub async fn list_rewards(&self, user_id: &str) -> Vec<RewardView> {
        match sqlite::claimed_rewards(self.db.pool(), user_id).await {
            Ok(rows) => rows.iter().map(reward_view).collect(),
            Err(e) => {
                error!("Failed to list rewards for {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    /// Recent activity history for a user (audit view).
    /// Degrades to an empty list on storage failure.
    pub async fn recent_activity(&self, user_id: &str, limit: u32) -> Vec<XpActivityRow> {
        match sqlite::recent_activities(self.db.pool(), user_id, limit).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to list activity for {}: {}", user_id, e);
                Vec::new()
            }
        }
    }

    /// One-time reward consumption. Boolean outcome by design: false covers
    /// not-owned, unclaimed, already-used, and expired rewards alike.
    pub async fn mark_reward_used(&self, user_id: &str, reward_id: i64) -> bool {
        match sqlite::mark_used(self.db.pool(), user_id, reward_id, Utc::now()).await {
            Ok(updated) => updated,
            Err(e) => {
                error!("Failed to mark reward {} used for {}: {}", reward_id, user_id, e);
                false
            }
        }
    }
}

/// Map a catalog category onto the reward it mints. Discount percents come
/// from the structured catalog field, falling back to an "NN%" pattern in
/// the description for legacy rows, then to 5.
fn derive_exchange_reward(item: &ExchangeItemRow) -> (RewardType, Option<String>, Option<i64>) {
    match item.category.as_str() {
        "DISCOUNT" => (
            RewardType::Discount,
            None,
            Some(
                item.discount_percent
                    .unwrap_or_else(|| parse_discount_percent(&item.description)),
            ),
        ),
        "SERVICE" => (RewardType::FreeService, None, None),
        "BADGE" => (RewardType::Badge, Some(item.id.clone()), None),
        "PREMIUM" => (RewardType::VipStatus, None, None),
        other => {
            warn!(
                "Unknown exchange category {:?} on item {}, defaulting to badge",
                other, item.id
            );
            (RewardType::Badge, Some("default_badge".to_string()), None)
        }
    }
}

/// Legacy catalog rows embed the percent in free text ("10% off ...")
fn parse_discount_percent(description: &str) -> i64 {
    for (idx, _) in description.match_indices('%') {
        let digits: Vec<char> = description[..idx]
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let digits: String = digits.into_iter().rev().collect();
        if let Ok(value) = digits.parse::<i64>() {
            return value;
        }
    }
    5
}

fn parse_reward_type(raw: &str) -> RewardType {
    raw.parse().unwrap_or_else(|_| {
        warn!("Unknown reward type {:?} in storage, treating as badge", raw);
        RewardType::Badge
    })
}

fn claimed_reward_view(row: &RewardRow) -> ClaimedReward {
    ClaimedReward {
        reward_type: parse_reward_type(&row.reward_type),
        code: row.code.clone(),
        discount_percent: row.discount_percent,
        badge: row.badge.clone(),
        expires_at: row.expires_at,
    }
}

fn reward_view(row: &RewardRow) -> RewardView {
    let reward_type = parse_reward_type(&row.reward_type);
    RewardView {
        id: row.id,
        reward_type,
        name: row
            .display_name
            .clone()
            .unwrap_or_else(|| default_reward_name(reward_type, row)),
        code: row.code.clone(),
        received_at: row.claimed_at,
        expires_at: row.expires_at,
        used: row.used,
    }
}

/// Fallback display name for rewards minted without one
fn default_reward_name(reward_type: RewardType, row: &RewardRow) -> String {
    match reward_type {
        RewardType::Badge => format!("Badge: {}", row.badge.as_deref().unwrap_or("unknown")),
        RewardType::Discount => format!("{}% Discount", row.discount_percent.unwrap_or(0)),
        RewardType::FreeService => "Free Service".to_string(),
        RewardType::VipStatus => "VIP Status".to_string(),
    }
}

/// A claimed reward row satisfies a level template when the typed payload
/// matches: badges by id, discounts by percent, free services and VIP status
/// by the presence of a generated code.
fn template_matches(template: &RewardTemplate, row: &RewardRow) -> bool {
    match template {
        RewardTemplate::Badge { id } => {
            row.reward_type == RewardType::Badge.as_str() && row.badge.as_deref() == Some(*id)
        }
        RewardTemplate::Discount { percent } => {
            row.reward_type == RewardType::Discount.as_str()
                && row.discount_percent == Some(*percent)
        }
        RewardTemplate::FreeService { .. } => {
            row.reward_type == RewardType::FreeService.as_str() && row.code.is_some()
        }
        RewardTemplate::VipStatus => {
            row.reward_type == RewardType::VipStatus.as_str() && row.code.is_some()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> AchievementsService {
        let db = Database::connect_in_memory().await.unwrap();
        AchievementsService::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_get_xp_for_fresh_user() {
        let service = service().await;
        let summary = service.get_xp("fresh").await;
        assert_eq!(summary.xp, 0);
        assert_eq!(summary.level, 1);
    }

    #[tokio::test]
    async fn test_add_xp_is_not_idempotent() {
        let service = service().await;
        let first = service
            .add_xp("u1", 50, ActivityKind::CreatePost, None)
            .await
            .unwrap();
        assert_eq!(first.xp, 50);
        assert!(!first.level_up);

        let second = service
            .add_xp("u1", 50, ActivityKind::CreatePost, None)
            .await
            .unwrap();
        assert_eq!(second.xp, 100);
        assert!(second.level_up);

        let count = sqlite::count_activities_since(
            service.db.pool(),
            "u1",
            Utc::now() - Duration::days(1),
        )
        .await
        .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_zero_xp_activity_still_recorded() {
        let service = service().await;
        service
            .add_xp("u1", 0, ActivityKind::XpExchange, None)
            .await
            .unwrap();
        let history = service.recent_activity("u1", 10).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].xp_delta, 0);
        assert_eq!(history[0].activity, "XP_EXCHANGE");
    }

    #[tokio::test]
    async fn test_activity_source_is_recorded() {
        let service = service().await;
        let source = SourceRef::new("post-42", "Post");
        service
            .add_activity_xp("u1", ActivityKind::LikePost, Some(&source))
            .await
            .unwrap();
        let history = service.recent_activity("u1", 10).await;
        assert_eq!(history[0].source_id.as_deref(), Some("post-42"));
        assert_eq!(history[0].source_kind.as_deref(), Some("Post"));
        assert_eq!(history[0].xp_delta, 2);
    }

    #[tokio::test]
    async fn test_single_grant_crossing_two_levels_issues_both_batches() {
        let service = service().await;
        service
            .add_xp("u1", 50, ActivityKind::CreatePost, None)
            .await
            .unwrap();

        let grant = service
            .add_xp("u1", 300, ActivityKind::InviteFriend, None)
            .await
            .unwrap();
        assert_eq!(grant.xp, 350);
        assert_eq!(grant.level, 3);
        assert!(grant.level_up);

        let rewards = sqlite::rewards_for_user(service.db.pool(), "u1").await.unwrap();
        let level2: Vec<_> = rewards.iter().filter(|r| r.achievement_id == "level_2").collect();
        let level3: Vec<_> = rewards.iter().filter(|r| r.achievement_id == "level_3").collect();
        assert_eq!(level2.len(), 1);
        assert_eq!(level3.len(), 3);
        assert!(rewards.iter().all(|r| !r.claimed));
    }

    #[tokio::test]
    async fn test_level_rewards_follow_the_templates() {
        let service = service().await;
        service
            .add_xp("u1", 300, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let rewards = sqlite::rewards_for_user(service.db.pool(), "u1").await.unwrap();
        let level3: Vec<_> = rewards.iter().filter(|r| r.achievement_id == "level_3").collect();

        let badge = level3.iter().find(|r| r.reward_type == "BADGE").unwrap();
        assert_eq!(badge.badge.as_deref(), Some("active_member"));
        assert!(badge.code.is_none());
        assert!(badge.expires_at.is_none());

        let discounts: Vec<_> = level3.iter().filter(|r| r.reward_type == "DISCOUNT").collect();
        assert_eq!(discounts.len(), 2);
        for discount in discounts {
            assert_eq!(discount.discount_percent, Some(5));
            assert!(discount.code.as_deref().unwrap().starts_with("DIS-"));
            assert!(discount.expires_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_claim_flow() {
        let service = service().await;
        service
            .add_xp("u1", 350, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        // Not reached yet
        let err = service.claim_achievement("u1", "level_4").await.unwrap_err();
        assert!(matches!(err, Error::NotEligible(_)));

        // Malformed achievement id
        let err = service.claim_achievement("u1", "level_soon").await.unwrap_err();
        assert!(matches!(err, Error::NotEligible(_)));

        let claimed = service.claim_achievement("u1", "level_3").await.unwrap();
        assert_eq!(claimed.achievement_id, "level_3");
        assert_eq!(claimed.rewards.len(), 3);

        let err = service.claim_achievement("u1", "level_3").await.unwrap_err();
        assert!(matches!(err, Error::NothingToClaim(_)));
    }

    #[tokio::test]
    async fn test_daily_login_once_per_day() {
        let service = service().await;

        let first = service.check_daily_login("u1").await;
        let DailyLoginOutcome::Granted(grant) = first else {
            panic!("expected a grant, got {:?}", first);
        };
        assert_eq!(grant.xp, 5);

        let second = service.check_daily_login("u1").await;
        let DailyLoginOutcome::AlreadyClaimed { xp, level } = second else {
            panic!("expected already-claimed, got {:?}", second);
        };
        assert_eq!(xp, 5);
        assert_eq!(level, 1);
    }

    #[tokio::test]
    async fn test_daily_login_grants_again_next_day() {
        let service = service().await;
        service.check_daily_login("u1").await;

        // Backdate the stamp to yesterday
        let balance = sqlite::get_or_create_balance(service.db.pool(), "u1").await.unwrap();
        assert!(sqlite::stamp_daily_login(
            service.db.pool(),
            "u1",
            balance.last_daily_login,
            Utc::now() - Duration::days(1),
        )
        .await
        .unwrap());

        let outcome = service.check_daily_login("u1").await;
        assert!(matches!(outcome, DailyLoginOutcome::Granted(_)));
        assert_eq!(service.get_xp("u1").await.xp, 10);
    }

    #[tokio::test]
    async fn test_weekly_bonus_requires_five_activities() {
        let service = service().await;
        service
            .add_activity_xp("u1", ActivityKind::CreateComment, None)
            .await
            .unwrap();

        assert!(service.check_weekly_activity("u1").await.unwrap().is_none());

        for _ in 0..4 {
            service
                .add_activity_xp("u1", ActivityKind::LikePost, None)
                .await
                .unwrap();
        }

        let grant = service.check_weekly_activity("u1").await.unwrap().unwrap();
        assert_eq!(grant.xp, 10 + 4 * 2 + 25);

        // Stamp blocks a second bonus inside the window
        assert!(service.check_weekly_activity("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_catalog_seeding_is_idempotent() {
        let service = service().await;
        let added = service.seed_default_catalog().await.unwrap();
        assert_eq!(added, DEFAULT_EXCHANGE_ITEMS.len());
        assert_eq!(service.seed_default_catalog().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_exchange_items_marks_affordability() {
        let service = service().await;
        service.seed_default_catalog().await.unwrap();
        service
            .add_xp("u1", 200, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let items = service.list_exchange_items("u1").await;
        assert_eq!(items.len(), DEFAULT_EXCHANGE_ITEMS.len());
        for item in items {
            assert_eq!(item.available, item.xp_cost <= 200, "item {}", item.id);
        }
    }

    #[tokio::test]
    async fn test_exchange_price_mismatch_mutates_nothing() {
        let service = service().await;
        service.seed_default_catalog().await.unwrap();
        service
            .add_xp("u1", 500, ActivityKind::InviteFriend, None)
            .await
            .unwrap();
        let activities_before = service.recent_activity("u1", 50).await.len();

        let outcome = service.exchange("u1", "discount_5_service", 140).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Invalid XP cost provided");
        assert!(outcome.reward.is_none());

        assert_eq!(service.get_xp("u1").await.xp, 500);
        assert_eq!(service.recent_activity("u1", 50).await.len(), activities_before);
        assert!(service.list_rewards("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_unknown_item_rejected() {
        let service = service().await;
        service.seed_default_catalog().await.unwrap();
        let outcome = service.exchange("u1", "jetpack", 100).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Item not found or not available");
    }

    #[tokio::test]
    async fn test_exchange_insufficient_xp_rejected() {
        let service = service().await;
        service.seed_default_catalog().await.unwrap();
        service
            .add_xp("u1", 100, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let outcome = service.exchange("u1", "discount_5_service", 150).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Not enough XP");
        assert_eq!(outcome.new_xp, 100);
        assert_eq!(service.get_xp("u1").await.xp, 100);
    }

    #[tokio::test]
    async fn test_exchange_down_to_exactly_zero() {
        let service = service().await;
        service.seed_default_catalog().await.unwrap();
        service
            .add_xp("u1", 150, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let outcome = service.exchange("u1", "discount_5_service", 150).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.new_xp, 0);
        assert_eq!(outcome.message, "Exchange successful");

        let reward = outcome.reward.unwrap();
        assert_eq!(reward.reward_type, RewardType::Discount);
        assert_eq!(reward.discount_percent, Some(5));
        assert!(reward.code.as_deref().unwrap().starts_with("DIS-"));
        assert!(reward.expires_at.is_some());

        // Exchange rewards arrive pre-claimed and show up immediately
        let rewards = service.list_rewards("u1").await;
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].name, "5% Service Discount");
        assert!(!rewards[0].used);

        // The debit left a negative-delta tracking activity
        let history = service.recent_activity("u1", 10).await;
        assert_eq!(history[0].activity, "XP_EXCHANGE");
        assert_eq!(history[0].xp_delta, -150);
        assert_eq!(history[0].source_id.as_deref(), Some("discount_5_service"));

        // A second attempt has nothing left to spend
        let outcome = service.exchange("u1", "discount_5_service", 150).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(service.get_xp("u1").await.xp, 0);
    }

    #[tokio::test]
    async fn test_exchange_badge_item_mints_badge() {
        let service = service().await;
        service.seed_default_catalog().await.unwrap();
        service
            .add_xp("u1", 200, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let outcome = service.exchange("u1", "badge_supporter", 200).await.unwrap();
        let reward = outcome.reward.unwrap();
        assert_eq!(reward.reward_type, RewardType::Badge);
        assert_eq!(reward.badge.as_deref(), Some("badge_supporter"));
        assert!(reward.code.is_none());
        assert!(reward.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_legacy_discount_item_parses_percent_from_description() {
        let service = service().await;
        sqlite::insert_item(
            service.db.pool(),
            &ExchangeItemRow {
                id: "old_discount".to_string(),
                category: "DISCOUNT".to_string(),
                name: "Old Discount".to_string(),
                description: "15% off, grandfathered from the old catalog".to_string(),
                xp_cost: 300,
                discount_percent: None,
                icon: None,
                color: None,
                active: true,
            },
        )
        .await
        .unwrap();
        service
            .add_xp("u1", 300, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let outcome = service.exchange("u1", "old_discount", 300).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.reward.unwrap().discount_percent, Some(15));
    }

    #[tokio::test]
    async fn test_mark_reward_used_lifecycle() {
        let service = service().await;
        service.seed_default_catalog().await.unwrap();
        service
            .add_xp("u1", 150, ActivityKind::InviteFriend, None)
            .await
            .unwrap();
        service.exchange("u1", "discount_5_service", 150).await.unwrap();

        let reward_id = service.list_rewards("u1").await[0].id;

        assert!(!service.mark_reward_used("intruder", reward_id).await);
        assert!(service.mark_reward_used("u1", reward_id).await);
        assert!(!service.mark_reward_used("u1", reward_id).await);
        assert!(service.list_rewards("u1").await[0].used);
    }

    #[tokio::test]
    async fn test_expired_reward_cannot_be_used() {
        let service = service().await;
        let id = sqlite::insert_reward(
            service.db.pool(),
            &NewReward {
                user_id: "u1",
                achievement_id: "exchange_old",
                reward_type: "DISCOUNT",
                code: Some("DIS-11111".to_string()),
                discount_percent: Some(5),
                badge: None,
                display_name: None,
                template_index: None,
                expires_at: Some(Utc::now() - Duration::days(1)),
                claimed: true,
                claimed_at: Some(Utc::now() - Duration::days(40)),
                source_kind: SOURCE_EXCHANGE,
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert!(!service.mark_reward_used("u1", id).await);
    }

    #[tokio::test]
    async fn test_unclaimed_level_reward_cannot_be_used() {
        let service = service().await;
        service
            .add_xp("u1", 100, ActivityKind::InviteFriend, None)
            .await
            .unwrap();
        let rewards = sqlite::rewards_for_user(service.db.pool(), "u1").await.unwrap();
        assert!(!service.mark_reward_used("u1", rewards[0].id).await);
    }

    #[tokio::test]
    async fn test_achievements_view_progress_and_flags() {
        let service = service().await;
        service
            .add_xp("u1", 150, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let view = service.get_achievements("u1").await;
        assert_eq!(view.xp, 150);
        assert_eq!(view.level, 2);
        assert_eq!(view.next_level, 3);
        assert_eq!(view.next_level_xp, Some(300));
        assert_eq!(view.progress, 50);
        assert!(view.badges.is_empty());

        let level2 = view.achievements.iter().find(|a| a.level == 2).unwrap();
        assert!(level2.achieved);
        assert!(level2.claimable);
        assert!(!level2.claimed);
        assert!(!level2.rewards[0].claimed);

        let level3 = view.achievements.iter().find(|a| a.level == 3).unwrap();
        assert!(!level3.achieved);
        assert!(!level3.claimable);
    }

    #[tokio::test]
    async fn test_achievements_view_after_claiming() {
        let service = service().await;
        service
            .add_xp("u1", 150, ActivityKind::InviteFriend, None)
            .await
            .unwrap();
        service.claim_achievement("u1", "level_2").await.unwrap();

        let view = service.get_achievements("u1").await;
        assert_eq!(view.badges, vec!["learner".to_string()]);

        let level2 = view.achievements.iter().find(|a| a.level == 2).unwrap();
        assert!(level2.claimed);
        assert!(!level2.claimable);
        assert!(level2.rewards[0].claimed);
    }

    #[tokio::test]
    async fn test_achievements_view_at_max_level() {
        let service = service().await;
        service
            .add_xp("u1", 5000, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let view = service.get_achievements("u1").await;
        assert_eq!(view.level, 6);
        assert_eq!(view.next_level, 6);
        assert_eq!(view.next_level_xp, None);
        assert_eq!(view.progress, 100);
        assert!(view.achievements.iter().all(|a| a.achieved));
    }

    #[tokio::test]
    async fn test_exchange_outcome_wire_shape() {
        let service = service().await;
        service.seed_default_catalog().await.unwrap();
        service
            .add_xp("u1", 150, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let outcome = service.exchange("u1", "discount_5_service", 150).await.unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["newXP"], 0);
        assert_eq!(json["reward"]["type"], "DISCOUNT");
        assert_eq!(json["reward"]["discountPercent"], 5);
    }

    #[tokio::test]
    async fn test_achievements_view_wire_shape() {
        let service = service().await;
        service
            .add_xp("u1", 150, ActivityKind::InviteFriend, None)
            .await
            .unwrap();

        let json = serde_json::to_value(service.get_achievements("u1").await).unwrap();
        assert_eq!(json["nextLevelXp"], 300);
        assert_eq!(json["progress"], 50);

        let level2 = &json["achievements"][1];
        assert_eq!(level2["requiredXp"], 100);
        assert_eq!(level2["claimable"], true);
        // Flattened template payload sits beside the claimed flag
        assert_eq!(level2["rewards"][0]["type"], "BADGE");
        assert_eq!(level2["rewards"][0]["id"], "learner");
        assert_eq!(level2["rewards"][0]["claimed"], false);
    }

    #[test]
    fn test_parse_discount_percent() {
        assert_eq!(parse_discount_percent("10% off any service booking"), 10);
        assert_eq!(parse_discount_percent("save 25% today"), 25);
        assert_eq!(parse_discount_percent("a great perk"), 5);
        assert_eq!(parse_discount_percent("% sign without digits"), 5);
    }
}
