//! Department monthly quotas and the bonus request workflow.
//!
//! `sum(admin_approved points) + request.points <= quota` is checked when a
//! request is created and again when it is approved. Approval holds a row
//! lock on the department-month quota for the whole recheck, transition,
//! ledger append and resync, so concurrent approvals serialize.

use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::Serialize;
use seva_core::quota::{QuotaUsage, YearMonth};
use seva_core::rank::RankSnapshot;
use seva_core::types::{BonusDecision, BonusStatus as CoreBonusStatus};
use seva_db::db::connection::DbConnection;
use seva_db::db::enums::{BonusStatus, PointReason};
use seva_db::db::query;
use seva_db::model::bonus::{BonusRequest, DeptMonthQuota, NewBonusRequest, NewDeptMonthQuota};
use seva_db::model::ledger::NewPointLedgerEntry;

use crate::audit::{self, AuditAction, AuditEvent};
use crate::error::{ServiceError, ServiceResult};
use crate::{badge, ledger, rank};

const REQUEST: &str = "bonus request";

/// ## Summary
/// Sets a department's budget for a month. The latest value replaces any
/// earlier one.
///
/// ## Errors
/// Returns `Validation` for a negative quota, `NotFound` for an unknown
/// department.
#[tracing::instrument(skip(conn))]
pub async fn set_quota(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    department_id: i64,
    year_month: YearMonth,
    quota_points: i64,
    now: DateTime<Utc>,
) -> ServiceResult<DeptMonthQuota> {
    if quota_points < 0 {
        return Err(ServiceError::Validation(
            "quota points must not be negative".to_string(),
        ));
    }
    if query::department::find(conn, department_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("department {department_id}")));
    }

    let ym = year_month.to_string();
    let quota = query::bonus::upsert_quota(
        conn,
        &NewDeptMonthQuota {
            department_id,
            year_month: &ym,
            quota_points,
            updated_by: Some(actor_id),
        },
        now,
    )
    .await?;

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::QuotaSet)
            .target("dept_month_quota", quota.id)
            .detail(serde_json::json!({
                "departmentId": department_id,
                "yearMonth": ym,
                "quotaPoints": quota_points,
            })),
    )
    .await;

    Ok(quota)
}

/// A quota with what has been approved against it.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaView {
    #[serde(flatten)]
    pub quota: DeptMonthQuota,
    pub used_points: i64,
    pub remaining_points: i64,
}

async fn usage(
    conn: &mut DbConnection<'_>,
    quota: &DeptMonthQuota,
) -> ServiceResult<QuotaUsage> {
    Ok(QuotaUsage {
        quota_points: quota.quota_points,
        approved_points: query::bonus::approved_points(conn, quota.department_id, &quota.year_month)
            .await?,
    })
}

fn missing_quota(department_id: i64, year_month: &str) -> ServiceError {
    ServiceError::not_found(format!(
        "quota for department {department_id} in {year_month}"
    ))
}

/// ## Errors
/// Returns `NotFound` if no quota is set for the department-month.
pub async fn get_quota(
    conn: &mut DbConnection<'_>,
    department_id: i64,
    year_month: YearMonth,
) -> ServiceResult<QuotaView> {
    let ym = year_month.to_string();
    let quota = query::bonus::find_quota(conn, department_id, &ym)
        .await?
        .ok_or_else(|| missing_quota(department_id, &ym))?;
    let usage = usage(conn, &quota).await?;
    Ok(QuotaView {
        quota,
        used_points: usage.approved_points,
        remaining_points: usage.remaining(),
    })
}

#[derive(Debug, Clone)]
pub struct NewBonus {
    pub department_id: i64,
    pub year_month: YearMonth,
    pub user_id: i64,
    pub points: i64,
    pub reason: Option<String>,
}

/// ## Summary
/// Files a pending request after a creation-time quota check.
///
/// ## Errors
/// - `Validation` for fewer than one point
/// - `NotFound` for a missing quota or user
/// - `QuotaExceeded` if the request cannot fit the remaining budget
#[tracing::instrument(skip(conn, bonus), fields(department_id = bonus.department_id, user_id = bonus.user_id, points = bonus.points))]
pub async fn create_request(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    bonus: NewBonus,
) -> ServiceResult<BonusRequest> {
    if bonus.points < 1 {
        return Err(ServiceError::Validation(
            "bonus points must be at least 1".to_string(),
        ));
    }
    let ym = bonus.year_month.to_string();
    let quota = query::bonus::find_quota(conn, bonus.department_id, &ym)
        .await?
        .ok_or_else(|| missing_quota(bonus.department_id, &ym))?;
    if query::user::find(conn, bonus.user_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("user {}", bonus.user_id)));
    }

    usage(conn, &quota).await?.admit(bonus.points)?;

    let request = query::bonus::insert_request(
        conn,
        &NewBonusRequest {
            department_id: bonus.department_id,
            year_month: &ym,
            user_id: bonus.user_id,
            points: bonus.points,
            reason_text: bonus.reason.as_deref(),
            status: BonusStatus::Pending,
            created_by: actor_id,
        },
    )
    .await?;

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::BonusRequestCreate)
            .target("dept_bonus_request", request.id)
            .detail(serde_json::json!({ "userId": bonus.user_id, "points": bonus.points })),
    )
    .await;

    Ok(request)
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_requests(
    conn: &mut DbConnection<'_>,
    department_id: i64,
    year_month: YearMonth,
) -> ServiceResult<Vec<BonusRequest>> {
    Ok(query::bonus::list_requests(conn, department_id, &year_month.to_string()).await?)
}

/// Oldest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_pending(conn: &mut DbConnection<'_>) -> ServiceResult<Vec<BonusRequest>> {
    Ok(query::bonus::list_pending(conn).await?)
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub request: BonusRequest,
    pub ledger_entry_id: Option<i64>,
    pub snapshot: Option<RankSnapshot>,
    pub badges_granted: Vec<String>,
}

/// ## Summary
/// Settles a pending request.
///
/// Approval locks the quota row, rechecks the budget, moves the request to
/// `admin_approved`, appends a `dept_bonus` ledger row and resyncs the
/// recipient's snapshot, all in one transaction. Rejection only moves the
/// request to `rejected`.
///
/// ## Errors
/// - `NotFound` for an unknown request (or a quota removed since creation)
/// - `Conflict` naming the current status when the request is not pending
/// - `QuotaExceeded` when approval would overshoot the budget
#[tracing::instrument(skip(conn))]
pub async fn decide(
    conn: &mut DbConnection<'_>,
    request_id: i64,
    actor_id: i64,
    decision: BonusDecision,
    now: DateTime<Utc>,
) -> ServiceResult<DecisionOutcome> {
    let (request, ledger_entry_id, recomputed) = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let request = query::bonus::find_request(tx, request_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found(format!("{REQUEST} {request_id}")))?;

                let current: CoreBonusStatus = request.status.into();
                let next = current
                    .decide(decision)
                    .ok_or_else(|| ServiceError::conflict(REQUEST, current))?;

                if decision == BonusDecision::Approve {
                    let quota = query::bonus::find_quota_for_update(
                        tx,
                        request.department_id,
                        &request.year_month,
                    )
                    .await?
                    .ok_or_else(|| missing_quota(request.department_id, &request.year_month))?;
                    usage(tx, &quota).await?.admit(request.points)?;
                }

                let Some(settled) = query::bonus::transition(
                    tx,
                    request_id,
                    BonusStatus::Pending,
                    next.into(),
                    actor_id,
                    now,
                )
                .await?
                else {
                    // Lost a race with another decision.
                    let status = query::bonus::find_request(tx, request_id)
                        .await?
                        .map_or_else(|| "missing".to_string(), |r| r.status.to_string());
                    return Err(ServiceError::conflict(REQUEST, status));
                };

                if decision == BonusDecision::Reject {
                    return Ok((settled, None, None));
                }

                let entry = ledger::append_points(
                    tx,
                    &NewPointLedgerEntry {
                        user_id: settled.user_id,
                        points_delta: settled.points,
                        reason: PointReason::DeptBonus,
                        ref_id: Some(settled.id),
                        department_id: Some(settled.department_id),
                        note: settled.reason_text.as_deref(),
                        created_by: Some(actor_id),
                    },
                )
                .await?;
                let recomputed = rank::resync(tx, settled.user_id, now).await?;

                Ok((settled, Some(entry.id), Some(recomputed)))
            }
            .scope_boxed()
        })
        .await?;

    let badges_granted = if recomputed.is_some() {
        badge::check_and_grant_best_effort(conn, request.user_id, now).await
    } else {
        Vec::new()
    };

    let action = match decision {
        BonusDecision::Approve => AuditAction::BonusRequestApprove,
        BonusDecision::Reject => AuditAction::BonusRequestReject,
    };
    tracing::info!(request_id, status = %request.status, "Bonus request settled");
    audit::record(
        conn,
        AuditEvent::new(actor_id, action)
            .target("dept_bonus_request", request.id)
            .detail(serde_json::json!({ "userId": request.user_id, "points": request.points })),
    )
    .await;

    Ok(DecisionOutcome {
        request,
        ledger_entry_id,
        snapshot: recomputed.map(|r| r.snapshot),
        badges_granted,
    })
}

/// ## Errors
/// See [`decide`].
pub async fn approve(
    conn: &mut DbConnection<'_>,
    request_id: i64,
    actor_id: i64,
    now: DateTime<Utc>,
) -> ServiceResult<DecisionOutcome> {
    decide(conn, request_id, actor_id, BonusDecision::Approve, now).await
}

/// ## Errors
/// See [`decide`].
pub async fn reject(
    conn: &mut DbConnection<'_>,
    request_id: i64,
    actor_id: i64,
    now: DateTime<Utc>,
) -> ServiceResult<DecisionOutcome> {
    decide(conn, request_id, actor_id, BonusDecision::Reject, now).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn overrun_maps_to_quota_exceeded() {
        let usage = QuotaUsage {
            quota_points: 1000,
            approved_points: 800,
        };
        let err: ServiceError = usage.admit(300).map_err(ServiceError::from).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::QuotaExceeded {
                quota: 1000,
                approved: 800,
                requested: 300
            }
        ));
        assert!(usage.admit(200).is_ok());
    }

    #[test_log::test]
    fn only_pending_requests_can_be_decided() {
        for status in [CoreBonusStatus::AdminApproved, CoreBonusStatus::Rejected] {
            let err = status
                .decide(BonusDecision::Approve)
                .ok_or_else(|| ServiceError::conflict(REQUEST, status))
                .unwrap_err();
            assert_eq!(err.to_string(), format!("Conflict: bonus request is {status}"));
        }
    }
}
