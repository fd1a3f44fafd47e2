//! Schedule days and user assignments.

use chrono::NaiveDate;
use seva_core::shift::{Shift, ShiftTime};
use seva_db::db::connection::DbConnection;
use seva_db::db::query;
use seva_db::model::schedule::{NewScheduleAssignment, NewScheduleDay, ScheduleAssignment, ScheduleDay};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::error::{ServiceError, ServiceResult, conflict_on_unique};

/// Longest date range a single listing may cover.
pub const MAX_LIST_DAYS: i64 = 366;

#[derive(Debug, Clone)]
pub struct ScheduleDaySpec {
    pub department_id: i64,
    pub service_date: NaiveDate,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    pub required_count: i32,
    pub note: Option<String>,
}

/// Normalized shift bounds ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bounds {
    start: Option<String>,
    end: Option<String>,
}

impl ScheduleDaySpec {
    /// Blank bounds stay unset and read back as the default shift. Given
    /// bounds are stored as `HH:MM`.
    fn bounds(&self) -> ServiceResult<Bounds> {
        let normalize = |value: Option<&str>| -> ServiceResult<Option<String>> {
            match value.map(str::trim).filter(|v| !v.is_empty()) {
                Some(v) => Ok(Some(v.parse::<ShiftTime>()?.to_string())),
                None => Ok(None),
            }
        };
        let bounds = Bounds {
            start: normalize(self.shift_start.as_deref())?,
            end: normalize(self.shift_end.as_deref())?,
        };
        Shift::from_bounds(bounds.start.as_deref(), bounds.end.as_deref())?;
        if self.required_count < 0 {
            return Err(ServiceError::Validation(
                "required count must not be negative".to_string(),
            ));
        }
        Ok(bounds)
    }
}

/// ## Summary
/// Creates the schedule for one department on one date.
///
/// ## Errors
/// - `Validation` for a malformed or empty shift
/// - `NotFound` for an unknown department
/// - `Conflict` when the department already has a schedule that day
#[tracing::instrument(skip(conn, spec), fields(department_id = spec.department_id, date = %spec.service_date))]
pub async fn create_day(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    spec: ScheduleDaySpec,
) -> ServiceResult<ScheduleDay> {
    let bounds = spec.bounds()?;
    if query::department::find(conn, spec.department_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("department {}", spec.department_id)));
    }

    let day = query::schedule::insert_day(
        conn,
        &NewScheduleDay {
            department_id: spec.department_id,
            service_date: spec.service_date,
            shift_start: bounds.start.as_deref(),
            shift_end: bounds.end.as_deref(),
            required_count: spec.required_count,
            note: spec.note.as_deref(),
            created_by: Some(actor_id),
        },
    )
    .await
    .map_err(|e| conflict_on_unique(e, "schedule day", "already scheduled"))?;

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::ScheduleCreate).target("schedule_day", day.id),
    )
    .await;
    Ok(day)
}

/// ## Errors
/// Returns `NotFound` for an unknown schedule day.
pub async fn get_day(conn: &mut DbConnection<'_>, id: i64) -> ServiceResult<ScheduleDay> {
    query::schedule::find_day(conn, id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("schedule day {id}")))
}

/// ## Summary
/// Lists a department's schedule days in `[from, to]`, oldest first.
///
/// ## Errors
/// Returns `Validation` for an inverted or overlong range.
pub async fn list_days(
    conn: &mut DbConnection<'_>,
    department_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> ServiceResult<Vec<ScheduleDay>> {
    check_range(from, to)?;
    Ok(query::schedule::list_days(conn, department_id, from, to).await?)
}

fn check_range(from: NaiveDate, to: NaiveDate) -> ServiceResult<()> {
    if to < from {
        return Err(ServiceError::Validation(format!("range end {to} is before {from}")));
    }
    if (to - from).num_days() > MAX_LIST_DAYS {
        return Err(ServiceError::Validation(format!(
            "range may cover at most {MAX_LIST_DAYS} days"
        )));
    }
    Ok(())
}

/// ## Summary
/// Assigns a user to a schedule day.
///
/// ## Errors
/// `NotFound` for an unknown day or user; `Conflict` when already assigned.
#[tracing::instrument(skip(conn))]
pub async fn assign(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    schedule_day_id: i64,
    user_id: i64,
) -> ServiceResult<ScheduleAssignment> {
    get_day(conn, schedule_day_id).await?;
    if query::user::find(conn, user_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("user {user_id}")));
    }

    let assignment = query::schedule::insert_assignment(
        conn,
        &NewScheduleAssignment {
            schedule_day_id,
            user_id,
            created_by: Some(actor_id),
        },
    )
    .await
    .map_err(|e| conflict_on_unique(e, "assignment", "already assigned"))?;
    tracing::debug!(assignment_id = assignment.id, "User assigned");
    Ok(assignment)
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn assignments(
    conn: &mut DbConnection<'_>,
    schedule_day_id: i64,
) -> ServiceResult<Vec<ScheduleAssignment>> {
    Ok(query::schedule::assignments_for_day(conn, schedule_day_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(start: Option<&str>, end: Option<&str>) -> ScheduleDaySpec {
        ScheduleDaySpec {
            department_id: 1,
            service_date: NaiveDate::from_ymd_opt(2026, 4, 4).unwrap(),
            shift_start: start.map(str::to_string),
            shift_end: end.map(str::to_string),
            required_count: 2,
            note: None,
        }
    }

    #[test_log::test]
    fn bounds_are_normalized() {
        let bounds = spec(Some(" 7:30"), Some("16:00")).bounds().unwrap();
        assert_eq!(bounds.start.as_deref(), Some("07:30"));
        assert_eq!(bounds.end.as_deref(), Some("16:00"));
    }

    #[test_log::test]
    fn blank_bounds_stay_unset() {
        let bounds = spec(Some(""), None).bounds().unwrap();
        assert_eq!(bounds, Bounds { start: None, end: None });
    }

    #[test_log::test]
    fn bad_shifts_are_rejected() {
        assert!(spec(Some("18:00"), Some("09:00")).bounds().is_err());
        assert!(spec(Some("25:00"), None).bounds().is_err());
        assert!(
            ScheduleDaySpec {
                required_count: -1,
                ..spec(None, None)
            }
            .bounds()
            .is_err()
        );
    }

    #[test_log::test]
    fn ranges_are_bounded() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
        assert!(check_range(d(1), d(31)).is_ok());
        assert!(check_range(d(2), d(1)).is_err());
        assert!(check_range(d(1), NaiveDate::from_ymd_opt(2027, 6, 1).unwrap()).is_err());
    }
}
