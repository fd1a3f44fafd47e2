//! Badge rule engine and badge administration.
//!
//! Auto-grant rules are decoded into [`AutoGrantRule`] once per catalog load.
//! Grants are guarded twice: held badges are skipped up front, and the
//! partial unique index on active grants turns a racing duplicate insert into
//! a no-op.

use std::collections::HashSet;
use std::hash::BuildHasher;

use chrono::{DateTime, Utc};
use serde::Serialize;
use seva_core::badge_rule::{AutoGrantRule, EngagementSpan, RuleContext};
use seva_db::db::connection::DbConnection;
use seva_db::db::query;
use seva_db::model::badge::{Badge, HeldBadge, NewUserBadge, UserBadge};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::error::{ServiceError, ServiceResult};

/// A catalog badge paired with its decoded rule.
#[derive(Debug, Clone)]
pub struct RuledBadge {
    pub badge: Badge,
    pub rule: AutoGrantRule,
}

/// ## Summary
/// Keeps badges whose rule decodes; badges without a rule are manual-only.
/// Invalid rules are logged and skipped.
#[must_use]
pub fn decode_rules(catalog: Vec<Badge>) -> Vec<RuledBadge> {
    catalog
        .into_iter()
        .filter_map(|badge| {
            let raw = badge.auto_grant_rule.as_ref()?;
            match AutoGrantRule::decode(raw) {
                Ok(rule) => Some(RuledBadge { badge, rule }),
                Err(err) => {
                    tracing::warn!(badge = %badge.code, error = %err, "Skipping badge with invalid auto-grant rule");
                    None
                }
            }
        })
        .collect()
}

/// ## Errors
/// Returns a database error if the catalog cannot be read.
pub async fn load_rules(conn: &mut DbConnection<'_>) -> ServiceResult<Vec<RuledBadge>> {
    Ok(decode_rules(query::badge::list_catalog(conn).await?))
}

/// Rules the user satisfies for badges they do not hold.
#[must_use]
pub fn due<'a, S: BuildHasher>(
    rules: &'a [RuledBadge],
    held: &HashSet<i64, S>,
    ctx: &RuleContext<'_>,
) -> Vec<&'a RuledBadge> {
    rules
        .iter()
        .filter(|ruled| !held.contains(&ruled.badge.id))
        .filter(|ruled| ruled.rule.is_satisfied(ctx))
        .collect()
}

/// ## Summary
/// Evaluates `rules` for one user and inserts missing auto grants.
///
/// ## Side Effects
/// Inserts `user_badge` rows with `granted_by = NULL`.
///
/// ## Errors
/// Returns a database error if reading user state or inserting fails.
#[tracing::instrument(skip(conn, rules))]
pub async fn check_and_grant_with(
    conn: &mut DbConnection<'_>,
    rules: &[RuledBadge],
    user_id: i64,
    now: DateTime<Utc>,
) -> ServiceResult<Vec<String>> {
    if rules.is_empty() {
        return Ok(Vec::new());
    }

    let held: HashSet<i64> = query::badge::held_badge_ids(conn, user_id)
        .await?
        .into_iter()
        .collect();
    let total_minutes = query::rank::find(conn, user_id)
        .await?
        .map_or(0, |row| row.total_minutes);
    let engagements: Vec<EngagementSpan> = query::engagement::history(conn, user_id)
        .await?
        .iter()
        .map(|e| e.span())
        .collect();

    let ctx = RuleContext {
        total_minutes,
        engagements: &engagements,
        now,
    };

    let mut granted = Vec::new();
    for ruled in due(rules, &held, &ctx) {
        let grant = NewUserBadge {
            user_id,
            badge_id: ruled.badge.id,
            granted_by: None,
            metadata: Some(serde_json::json!({
                "autoGranted": true,
                "rule": ruled.badge.code,
            })),
        };
        if query::badge::insert_grant_if_absent(conn, &grant).await?.is_some() {
            tracing::info!(user_id, badge = %ruled.badge.code, "Badge auto-granted");
            granted.push(ruled.badge.code.clone());
        }
    }

    Ok(granted)
}

/// ## Summary
/// Loads the catalog and grants every newly earned badge. Safe to repeat.
///
/// ## Errors
/// Returns a database error if any step fails.
pub async fn check_and_grant(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    now: DateTime<Utc>,
) -> ServiceResult<Vec<String>> {
    let rules = load_rules(conn).await?;
    check_and_grant_with(conn, &rules, user_id, now).await
}

/// ## Summary
/// [`check_and_grant`] for use after a committed settlement: failures are
/// logged and read as "nothing granted".
pub async fn check_and_grant_best_effort(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    now: DateTime<Utc>,
) -> Vec<String> {
    match check_and_grant(conn, user_id, now).await {
        Ok(granted) => granted,
        Err(err) => {
            tracing::warn!(user_id, error = %err, "Badge check failed after settlement");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub users_checked: usize,
    pub badges_granted: usize,
    pub failures: usize,
}

/// ## Summary
/// Runs the auto-grant check over every active user. Per-user failures are
/// logged and counted, not propagated.
///
/// ## Errors
/// Returns a database error only if the catalog or user list cannot be read.
#[tracing::instrument(skip(conn))]
pub async fn sweep(conn: &mut DbConnection<'_>, now: DateTime<Utc>) -> ServiceResult<SweepReport> {
    let rules = load_rules(conn).await?;
    let user_ids = query::user::active_ids(conn).await?;

    let mut report = SweepReport::default();
    for user_id in user_ids {
        report.users_checked += 1;
        match check_and_grant_with(conn, &rules, user_id, now).await {
            Ok(granted) => report.badges_granted += granted.len(),
            Err(err) => {
                report.failures += 1;
                tracing::warn!(user_id, error = %err, "Badge sweep failed for user");
            }
        }
    }

    tracing::info!(
        users_checked = report.users_checked,
        badges_granted = report.badges_granted,
        failures = report.failures,
        "Badge sweep finished"
    );
    Ok(report)
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn catalog(conn: &mut DbConnection<'_>) -> ServiceResult<Vec<Badge>> {
    Ok(query::badge::list_catalog(conn).await?)
}

/// Active grants with their catalog rows.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn held(conn: &mut DbConnection<'_>, user_id: i64) -> ServiceResult<Vec<HeldBadge>> {
    Ok(query::badge::held_badges(conn, user_id)
        .await?
        .into_iter()
        .map(|(grant, badge)| HeldBadge { grant, badge })
        .collect())
}

async fn badge_by_code(conn: &mut DbConnection<'_>, code: &str) -> ServiceResult<Badge> {
    query::badge::by_code(conn, code)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("badge '{code}'")))
}

/// ## Summary
/// Grants a badge by hand.
///
/// ## Errors
/// Returns `NotFound` for an unknown badge or user, `Conflict` if the user
/// already holds it.
#[tracing::instrument(skip(conn, note))]
pub async fn grant(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    user_id: i64,
    code: &str,
    note: Option<String>,
) -> ServiceResult<UserBadge> {
    let badge = badge_by_code(conn, code).await?;
    if query::user::find(conn, user_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("user {user_id}")));
    }

    let grant = NewUserBadge {
        user_id,
        badge_id: badge.id,
        granted_by: Some(actor_id),
        metadata: Some(serde_json::json!({ "autoGranted": false, "note": note })),
    };
    let granted = query::badge::insert_grant_if_absent(conn, &grant)
        .await?
        .ok_or_else(|| ServiceError::conflict("badge", "already held"))?;

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::BadgeGrant)
            .target("user_badge", granted.id)
            .detail(serde_json::json!({ "userId": user_id, "badge": code })),
    )
    .await;

    Ok(granted)
}

/// ## Summary
/// Revokes the active grant. The row is kept as history and the badge can be
/// granted again later.
///
/// ## Errors
/// Returns `NotFound` for an unknown badge or when the user holds no active
/// grant of it.
#[tracing::instrument(skip(conn, reason))]
pub async fn revoke(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    user_id: i64,
    code: &str,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> ServiceResult<UserBadge> {
    let badge = badge_by_code(conn, code).await?;
    let revoked = query::badge::revoke_active(conn, user_id, badge.id, actor_id, reason.as_deref(), now)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("active grant of '{code}' for user {user_id}")))?;

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::BadgeRevoke)
            .target("user_badge", revoked.id)
            .detail(serde_json::json!({ "userId": user_id, "badge": code, "reason": reason })),
    )
    .await;

    Ok(revoked)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use seva_core::types::EngagementType;
    use seva_db::db::enums::BadgeCategory;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn badge(id: i64, code: &str, rule: Option<serde_json::Value>) -> Badge {
        Badge {
            id,
            code: code.to_string(),
            name: code.to_string(),
            description: None,
            category: BadgeCategory::ServiceHours,
            auto_grant_rule: rule,
            display_order: 0,
            created_at: now(),
        }
    }

    fn catalog() -> Vec<Badge> {
        vec![
            badge(1, "joy_badge", Some(serde_json::json!({"type": "service_hours", "thresholdHours": 70}))),
            badge(2, "hundred_hours", Some(serde_json::json!({"type": "service_hours", "thresholdHours": 100}))),
            badge(3, "manual_only", None),
            badge(4, "broken", Some(serde_json::json!({"type": "moon_phase"}))),
            badge(
                5,
                "temple_worker_1year",
                Some(serde_json::json!({
                    "type": "engagement_duration",
                    "engagementType": "temple_worker",
                    "durationMonths": 12
                })),
            ),
        ]
    }

    fn codes(due: &[&RuledBadge]) -> Vec<String> {
        due.iter().map(|r| r.badge.code.clone()).collect()
    }

    #[test_log::test]
    fn decoding_skips_manual_and_invalid_rules() {
        let rules = decode_rules(catalog());
        let decoded: Vec<_> = rules.iter().map(|r| r.badge.code.as_str()).collect();
        assert_eq!(decoded, ["joy_badge", "hundred_hours", "temple_worker_1year"]);
    }

    #[test_log::test]
    fn service_hour_thresholds() {
        let rules = decode_rules(catalog());
        let ctx = |minutes| RuleContext {
            total_minutes: minutes,
            engagements: &[],
            now: now(),
        };

        assert!(due(&rules, &HashSet::new(), &ctx(70 * 60 - 1)).is_empty());
        assert_eq!(codes(&due(&rules, &HashSet::new(), &ctx(70 * 60))), ["joy_badge"]);
        assert_eq!(
            codes(&due(&rules, &HashSet::new(), &ctx(100 * 60))),
            ["joy_badge", "hundred_hours"]
        );
    }

    #[test_log::test]
    fn held_badges_are_not_due_again() {
        let rules = decode_rules(catalog());
        let ctx = RuleContext {
            total_minutes: 100 * 60,
            engagements: &[],
            now: now(),
        };
        let held: HashSet<i64> = [1].into_iter().collect();
        assert_eq!(codes(&due(&rules, &held, &ctx)), ["hundred_hours"]);

        let all: HashSet<i64> = [1, 2].into_iter().collect();
        assert!(due(&rules, &all, &ctx).is_empty());
    }

    #[test_log::test]
    fn engagement_duration_sums_closed_and_open_spans() {
        let rules = decode_rules(catalog());
        let spans = [
            EngagementSpan {
                engagement_type: EngagementType::TempleWorker,
                effective_from: now() - Duration::days(400),
                effective_until: Some(now() - Duration::days(200)),
            },
            EngagementSpan {
                engagement_type: EngagementType::TempleWorker,
                effective_from: now() - Duration::days(160),
                effective_until: None,
            },
        ];
        let ctx = RuleContext {
            total_minutes: 0,
            engagements: &spans,
            now: now(),
        };
        assert_eq!(codes(&due(&rules, &HashSet::new(), &ctx)), ["temple_worker_1year"]);

        let short = RuleContext {
            engagements: &spans[1..],
            ..ctx
        };
        assert!(due(&rules, &HashSet::new(), &short).is_empty());
    }
}
