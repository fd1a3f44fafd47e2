//! Rewards catalog and per-user eligibility.

use std::collections::HashSet;
use std::hash::BuildHasher;

use serde::Serialize;
use seva_core::rank::{MAX_LEVEL, MIN_LEVEL, RankSnapshot};
use seva_db::db::connection::DbConnection;
use seva_db::db::enums::RewardStatus;
use seva_db::db::query;
use seva_db::model::reward::{NewReward, Reward};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::error::{ServiceError, ServiceResult};

pub const MAX_TITLE_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct RewardSpec {
    pub title: String,
    pub description: Option<String>,
    pub points_cost: i64,
    pub min_level: i32,
    pub require_join_badge: bool,
    pub required_badges: Vec<String>,
    /// `None` is unlimited.
    pub stock: Option<i32>,
}

impl RewardSpec {
    /// ## Errors
    /// Returns `Validation` for a blank title, a negative cost or stock, or
    /// a level outside the rank table.
    pub fn validate(&self) -> ServiceResult<()> {
        let title = self.title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(ServiceError::Validation(format!(
                "title must be 1 to {MAX_TITLE_LEN} characters"
            )));
        }
        if self.points_cost < 0 {
            return Err(ServiceError::Validation(
                "points cost must not be negative".to_string(),
            ));
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.min_level) {
            return Err(ServiceError::Validation(format!(
                "minimum level must be between {MIN_LEVEL} and {MAX_LEVEL}"
            )));
        }
        if self.stock.is_some_and(|s| s < 0) {
            return Err(ServiceError::Validation(
                "stock must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// ## Summary
/// Adds an active reward to the catalog.
///
/// ## Errors
/// Returns `Validation` for bad input or an unknown required badge code.
#[tracing::instrument(skip(conn, spec), fields(title = %spec.title))]
pub async fn create(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    spec: RewardSpec,
) -> ServiceResult<Reward> {
    spec.validate()?;
    for code in &spec.required_badges {
        if query::badge::by_code(conn, code).await?.is_none() {
            return Err(ServiceError::Validation(format!("unknown badge '{code}'")));
        }
    }

    let reward = query::reward::insert(
        conn,
        &NewReward {
            title: spec.title.trim(),
            description: spec.description.as_deref(),
            points_cost: spec.points_cost,
            min_level: spec.min_level,
            require_join_badge: spec.require_join_badge,
            required_badges: &spec.required_badges,
            stock: spec.stock,
            status: RewardStatus::Active,
            created_by: Some(actor_id),
        },
    )
    .await?;

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::RewardCreate).target("reward", reward.id),
    )
    .await;
    Ok(reward)
}

/// Why a user can or cannot redeem a reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub can_redeem: bool,
    pub missing_badges: Vec<String>,
    pub reason: Option<Ineligible>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligible {
    Inactive,
    OutOfStock,
    LevelTooLow,
    InsufficientPoints,
    JoinBadgeRequired,
    MissingBadges,
}

impl Ineligible {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Inactive => "reward is not active",
            Self::OutOfStock => "reward is out of stock",
            Self::LevelTooLow => "rank level is too low",
            Self::InsufficientPoints => "not enough points",
            Self::JoinBadgeRequired => "join badge required",
            Self::MissingBadges => "required badges missing",
        }
    }
}

impl From<Ineligible> for ServiceError {
    fn from(reason: Ineligible) -> Self {
        match reason {
            Ineligible::Inactive => Self::conflict("reward", "inactive"),
            Ineligible::OutOfStock => Self::conflict("reward", "out of stock"),
            other => Self::Validation(other.message().to_string()),
        }
    }
}

/// ## Summary
/// Checks a reward against a user's snapshot and held badge codes. The first
/// failing condition becomes `reason`; `missing_badges` is always complete.
#[must_use]
pub fn eligibility<S: BuildHasher>(
    reward: &Reward,
    snapshot: &RankSnapshot,
    held: &HashSet<String, S>,
) -> Eligibility {
    let missing_badges: Vec<String> = reward
        .required_badges
        .iter()
        .filter(|code| !held.contains(*code))
        .cloned()
        .collect();

    let reason = if reward.status != RewardStatus::Active {
        Some(Ineligible::Inactive)
    } else if reward.stock.is_some_and(|s| s <= 0) {
        Some(Ineligible::OutOfStock)
    } else if snapshot.rank_level < reward.min_level {
        Some(Ineligible::LevelTooLow)
    } else if snapshot.total_points < reward.points_cost {
        Some(Ineligible::InsufficientPoints)
    } else if reward.require_join_badge && !snapshot.join_badge {
        Some(Ineligible::JoinBadgeRequired)
    } else if !missing_badges.is_empty() {
        Some(Ineligible::MissingBadges)
    } else {
        None
    };

    Eligibility {
        can_redeem: reason.is_none(),
        missing_badges,
        reason,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardListing {
    #[serde(flatten)]
    pub reward: Reward,
    #[serde(flatten)]
    pub eligibility: Eligibility,
}

/// ## Summary
/// Lists rewards annotated with the user's eligibility.
///
/// ## Errors
/// Returns a database error if any query fails.
pub async fn list_for_user(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    include_inactive: bool,
) -> ServiceResult<Vec<RewardListing>> {
    let rewards = query::reward::list(conn, !include_inactive).await?;
    let snapshot = query::rank::find(conn, user_id)
        .await?
        .map(|row| RankSnapshot::from(&row))
        .unwrap_or_default();
    let held: HashSet<String> = query::badge::held_badge_codes(conn, user_id)
        .await?
        .into_iter()
        .collect();

    Ok(rewards
        .into_iter()
        .map(|reward| {
            let eligibility = eligibility(&reward, &snapshot, &held);
            RewardListing {
                reward,
                eligibility,
            }
        })
        .collect())
}
