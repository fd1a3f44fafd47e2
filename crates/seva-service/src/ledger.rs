//! Append-only hours and points ledgers.
//!
//! There is no update or delete path. Corrections are new rows with
//! `manual_adjust` or `appeal_resolve` reasons.

use chrono::{DateTime, NaiveDate, Utc};
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};
use seva_core::constants::MAX_LEDGER_PAGE;
use seva_core::rank::{LedgerTotals, RankSnapshot};
use seva_db::db::connection::DbConnection;
use seva_db::db::enums::{HoursReason, PointReason};
use seva_db::db::query;
use seva_db::model::ledger::{
    HoursLedgerEntry, NewHoursLedgerEntry, NewPointLedgerEntry, PointLedgerEntry,
};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::error::{ServiceError, ServiceResult};
use crate::{badge, rank};

/// ## Summary
/// Appends one hours row.
///
/// ## Errors
/// Returns a database error if the insert fails. Callers must not swallow it.
#[tracing::instrument(skip(conn, entry), fields(user_id = entry.user_id, minutes = entry.minutes_delta, reason = %entry.reason))]
pub async fn append_hours(
    conn: &mut DbConnection<'_>,
    entry: &NewHoursLedgerEntry<'_>,
) -> ServiceResult<HoursLedgerEntry> {
    Ok(query::ledger::insert_hours(conn, entry).await?)
}

/// ## Summary
/// Appends one points row.
///
/// ## Errors
/// Returns `InvariantViolation` for a non-negative `redeem` row, or a
/// database error if the insert fails.
#[tracing::instrument(skip(conn, entry), fields(user_id = entry.user_id, points = entry.points_delta, reason = %entry.reason))]
pub async fn append_points(
    conn: &mut DbConnection<'_>,
    entry: &NewPointLedgerEntry<'_>,
) -> ServiceResult<PointLedgerEntry> {
    if entry.reason == PointReason::Redeem && entry.points_delta >= 0 {
        return Err(ServiceError::InvariantViolation(
            "redeem ledger rows must be negative",
        ));
    }
    Ok(query::ledger::insert_points(conn, entry).await?)
}

/// ## Summary
/// Sums every committed row of both ledgers for a user.
///
/// ## Errors
/// Returns a database error if either aggregate fails.
pub async fn totals(conn: &mut DbConnection<'_>, user_id: i64) -> ServiceResult<LedgerTotals> {
    Ok(LedgerTotals {
        total_minutes: query::ledger::sum_minutes(conn, user_id).await?,
        total_points: query::ledger::sum_points(conn, user_id).await?,
    })
}

fn page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(MAX_LEDGER_PAGE).clamp(1, MAX_LEDGER_PAGE)
}

/// Newest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_hours(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    limit: Option<i64>,
) -> ServiceResult<Vec<HoursLedgerEntry>> {
    Ok(query::ledger::list_hours(conn, user_id, page_size(limit)).await?)
}

/// Newest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_points(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    limit: Option<i64>,
) -> ServiceResult<Vec<PointLedgerEntry>> {
    Ok(query::ledger::list_points(conn, user_id, page_size(limit)).await?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    ManualAdjust,
    AppealResolve,
}

impl AdjustmentReason {
    const fn hours(self) -> HoursReason {
        match self {
            Self::ManualAdjust => HoursReason::ManualAdjust,
            Self::AppealResolve => HoursReason::AppealResolve,
        }
    }

    const fn points(self) -> PointReason {
        match self {
            Self::ManualAdjust => PointReason::ManualAdjust,
            Self::AppealResolve => PointReason::AppealResolve,
        }
    }
}

/// A correction to one user's ledgers.
#[derive(Debug, Clone)]
pub struct Adjustment {
    pub user_id: i64,
    pub minutes_delta: Option<i64>,
    pub points_delta: Option<i64>,
    pub reason: AdjustmentReason,
    pub service_date: NaiveDate,
    pub department_id: Option<i64>,
    pub ref_id: Option<i64>,
    pub note: Option<String>,
}

impl Adjustment {
    fn nonzero(delta: Option<i64>) -> Option<i64> {
        delta.filter(|d| *d != 0)
    }

    /// ## Errors
    /// Returns `Validation` if neither delta is non-zero.
    pub fn validate(&self) -> ServiceResult<()> {
        if Self::nonzero(self.minutes_delta).is_none() && Self::nonzero(self.points_delta).is_none() {
            return Err(ServiceError::Validation(
                "an adjustment needs a non-zero minutes or points delta".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentOutcome {
    pub hours_entry_id: Option<i64>,
    pub points_entry_id: Option<i64>,
    pub snapshot: RankSnapshot,
    pub join_badge_newly_granted: bool,
    pub badges_granted: Vec<String>,
}

/// ## Summary
/// Appends the adjustment rows and resyncs the snapshot in one transaction,
/// then runs a best-effort badge check.
///
/// ## Side Effects
/// - Inserts up to one row in each ledger
/// - Upserts the user's rank snapshot
/// - May grant badges and writes a `manual_adjustment` audit row
///
/// ## Errors
/// Returns `Validation` for an empty adjustment, `NotFound` for an unknown
/// user, or a database error (nothing is committed in that case).
#[tracing::instrument(skip(conn, adjustment), fields(user_id = adjustment.user_id))]
pub async fn adjust(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    adjustment: Adjustment,
    now: DateTime<Utc>,
) -> ServiceResult<AdjustmentOutcome> {
    adjustment.validate()?;
    if query::user::find(conn, adjustment.user_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("user {}", adjustment.user_id)));
    }

    let settled = adjustment.clone();
    let (hours_entry_id, points_entry_id, recomputed) = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let a = &settled;
                let mut hours_entry_id = None;
                if let Some(minutes_delta) = Adjustment::nonzero(a.minutes_delta) {
                    let entry = append_hours(
                        tx,
                        &NewHoursLedgerEntry {
                            user_id: a.user_id,
                            service_date: a.service_date,
                            minutes_delta,
                            reason: a.reason.hours(),
                            ref_id: a.ref_id,
                            note: a.note.as_deref(),
                            created_by: Some(actor_id),
                        },
                    )
                    .await?;
                    hours_entry_id = Some(entry.id);
                }

                let mut points_entry_id = None;
                if let Some(points_delta) = Adjustment::nonzero(a.points_delta) {
                    let entry = append_points(
                        tx,
                        &NewPointLedgerEntry {
                            user_id: a.user_id,
                            points_delta,
                            reason: a.reason.points(),
                            ref_id: a.ref_id,
                            department_id: a.department_id,
                            note: a.note.as_deref(),
                            created_by: Some(actor_id),
                        },
                    )
                    .await?;
                    points_entry_id = Some(entry.id);
                }

                let recomputed = rank::resync(tx, a.user_id, now).await?;
                Ok((hours_entry_id, points_entry_id, recomputed))
            }
            .scope_boxed()
        })
        .await?;

    let badges_granted = badge::check_and_grant_best_effort(conn, adjustment.user_id, now).await;

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::ManualAdjustment)
            .target("app_user", adjustment.user_id)
            .detail(serde_json::json!({
                "minutesDelta": adjustment.minutes_delta,
                "pointsDelta": adjustment.points_delta,
                "reason": adjustment.reason.points(),
                "note": adjustment.note,
            })),
    )
    .await;

    Ok(AdjustmentOutcome {
        hours_entry_id,
        points_entry_id,
        snapshot: recomputed.snapshot,
        join_badge_newly_granted: recomputed.join_badge_newly_granted,
        badges_granted,
    })
}
