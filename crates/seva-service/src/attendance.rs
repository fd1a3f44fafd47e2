//! Attendance confirmation, the main settlement entry point.

use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::Serialize;
use seva_core::shift::{Shift, points_for_minutes};
use seva_db::db::connection::DbConnection;
use seva_db::db::enums::{AttendanceStatus, HoursReason, PointReason};
use seva_db::db::query;
use seva_db::model::ledger::{NewHoursLedgerEntry, NewPointLedgerEntry};
use seva_db::model::schedule::{Attendance, NewAttendance, ScheduleDay};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::error::{ServiceError, ServiceResult};
use crate::{badge, ledger, rank};

#[derive(Debug, Clone)]
pub struct Confirmation {
    pub schedule_day_id: i64,
    pub user_id: i64,
    pub status: AttendanceStatus,
    /// Replaces the shift span when set.
    pub minutes_override: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceOutcome {
    pub attendance_id: i64,
    pub minutes_worked: i64,
    pub points_awarded: i64,
    pub rank_level: i32,
    pub join_badge_newly_granted: bool,
    pub badges_granted: Vec<String>,
}

/// Minutes and points a confirmation settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub minutes: i64,
    pub points: i64,
}

/// ## Summary
/// Works out what a confirmation earns. Only `present` and `late` earn
/// anything; the override wins over the schedule's shift span.
///
/// ## Errors
/// Returns `Validation` for a negative override, or a core validation error
/// when the stored shift is malformed or empty.
pub fn credit_for(
    day: &ScheduleDay,
    status: AttendanceStatus,
    minutes_override: Option<i64>,
) -> ServiceResult<Credit> {
    let minutes = match minutes_override {
        Some(m) if m < 0 => {
            return Err(ServiceError::Validation(
                "minutes must not be negative".to_string(),
            ));
        }
        Some(m) => m,
        None => Shift::from_bounds(day.shift_start.as_deref(), day.shift_end.as_deref())?.minutes(),
    };

    if !status.earns_credit() {
        return Ok(Credit {
            minutes: 0,
            points: 0,
        });
    }
    Ok(Credit {
        minutes,
        points: points_for_minutes(minutes),
    })
}

/// ## Summary
/// Confirms one assigned user's attendance for a schedule day and settles it.
///
/// ## Side Effects
/// In one transaction: inserts the attendance record, appends an
/// `attendance` hours row (when minutes are positive) and an
/// `attendance_eval` points row (when points are positive), then resyncs the
/// rank snapshot. After commit the badge check and audit row are
/// best-effort.
///
/// ## Errors
/// - `NotFound` for an unknown schedule day or a user not assigned to it
/// - `Conflict` when the user was already confirmed for that day
/// - `Validation` for bad minutes or shift bounds
#[tracing::instrument(skip(conn, confirmation), fields(
    schedule_day_id = confirmation.schedule_day_id,
    user_id = confirmation.user_id,
))]
pub async fn record(
    conn: &mut DbConnection<'_>,
    confirmer_id: i64,
    confirmation: Confirmation,
    now: DateTime<Utc>,
) -> ServiceResult<AttendanceOutcome> {
    let Confirmation {
        schedule_day_id,
        user_id,
        status,
        minutes_override,
        comment,
    } = confirmation;

    let (attendance, recomputed) = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let day = query::schedule::find_day(tx, schedule_day_id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found(format!("schedule day {schedule_day_id}")))?;
                if query::schedule::find_assignment(tx, schedule_day_id, user_id)
                    .await?
                    .is_none()
                {
                    return Err(ServiceError::not_found(format!(
                        "assignment of user {user_id} to schedule day {schedule_day_id}"
                    )));
                }

                let credit = credit_for(&day, status, minutes_override)?;
                let attendance = query::attendance::insert_if_absent(
                    tx,
                    &NewAttendance {
                        schedule_day_id,
                        user_id,
                        status,
                        minutes_worked: credit.minutes,
                        points_awarded: credit.points,
                        comment: comment.as_deref(),
                        confirmed_by: confirmer_id,
                    },
                )
                .await?
                .ok_or_else(|| ServiceError::conflict("attendance", "already confirmed"))?;

                post_credit(tx, &day, &attendance, credit, confirmer_id).await?;

                let recomputed = rank::resync(tx, user_id, now).await?;
                Ok((attendance, recomputed))
            }
            .scope_boxed()
        })
        .await?;

    let badges_granted = if attendance.minutes_worked > 0 {
        badge::check_and_grant_best_effort(conn, user_id, now).await
    } else {
        Vec::new()
    };

    tracing::info!(
        attendance_id = attendance.id,
        minutes = attendance.minutes_worked,
        points = attendance.points_awarded,
        "Attendance confirmed"
    );
    audit::record(
        conn,
        AuditEvent::new(confirmer_id, AuditAction::AttendanceConfirm)
            .target("attendance_daily", attendance.id)
            .detail(serde_json::json!({
                "userId": user_id,
                "status": attendance.status,
                "minutesWorked": attendance.minutes_worked,
                "pointsAwarded": attendance.points_awarded,
            })),
    )
    .await;

    Ok(AttendanceOutcome {
        attendance_id: attendance.id,
        minutes_worked: attendance.minutes_worked,
        points_awarded: attendance.points_awarded,
        rank_level: recomputed.snapshot.rank_level,
        join_badge_newly_granted: recomputed.join_badge_newly_granted,
        badges_granted,
    })
}

/// Appends the ledger rows for a fresh attendance record. Zero amounts
/// write nothing.
async fn post_credit(
    tx: &mut DbConnection<'_>,
    day: &ScheduleDay,
    attendance: &Attendance,
    credit: Credit,
    confirmer_id: i64,
) -> ServiceResult<()> {
    if credit.minutes > 0 {
        ledger::append_hours(
            tx,
            &NewHoursLedgerEntry {
                user_id: attendance.user_id,
                service_date: day.service_date,
                minutes_delta: credit.minutes,
                reason: HoursReason::Attendance,
                ref_id: Some(attendance.id),
                note: None,
                created_by: Some(confirmer_id),
            },
        )
        .await?;
    }
    if credit.points > 0 {
        ledger::append_points(
            tx,
            &NewPointLedgerEntry {
                user_id: attendance.user_id,
                points_delta: credit.points,
                reason: PointReason::AttendanceEval,
                ref_id: Some(attendance.id),
                department_id: Some(day.department_id),
                note: None,
                created_by: Some(confirmer_id),
            },
        )
        .await?;
    }
    Ok(())
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_for_day(
    conn: &mut DbConnection<'_>,
    schedule_day_id: i64,
) -> ServiceResult<Vec<Attendance>> {
    Ok(query::attendance::list_for_day(conn, schedule_day_id).await?)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn day(start: Option<&str>, end: Option<&str>) -> ScheduleDay {
        ScheduleDay {
            id: 1,
            department_id: 2,
            service_date: NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            shift_start: start.map(str::to_string),
            shift_end: end.map(str::to_string),
            required_count: 3,
            note: None,
            created_by: None,
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test_log::test]
    fn shift_span_earns_whole_hours() {
        let credit = credit_for(&day(Some("09:00"), Some("12:30")), AttendanceStatus::Present, None)
            .unwrap();
        assert_eq!(credit, Credit { minutes: 210, points: 30 });
    }

    #[test_log::test]
    fn blank_shift_defaults_to_full_day() {
        let credit = credit_for(&day(None, None), AttendanceStatus::Late, None).unwrap();
        assert_eq!(credit, Credit { minutes: 480, points: 80 });
    }

    #[test_log::test]
    fn override_replaces_shift() {
        let credit = credit_for(&day(None, None), AttendanceStatus::Present, Some(59)).unwrap();
        assert_eq!(credit, Credit { minutes: 59, points: 0 });
        assert!(credit_for(&day(None, None), AttendanceStatus::Present, Some(-1)).is_err());
    }

    #[test_log::test]
    fn non_earning_statuses_settle_nothing() {
        for status in [AttendanceStatus::Absent, AttendanceStatus::Leave, AttendanceStatus::Exception] {
            let credit = credit_for(&day(Some("08:00"), Some("18:00")), status, None).unwrap();
            assert_eq!(credit, Credit { minutes: 0, points: 0 });
        }
    }

    #[test_log::test]
    fn inverted_shift_is_rejected() {
        let err = credit_for(&day(Some("17:00"), Some("09:00")), AttendanceStatus::Present, None)
            .unwrap_err();
        assert!(matches!(err, ServiceError::CoreError(_)));
    }
}
