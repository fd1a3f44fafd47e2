use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::{schedule_assignment, schedule_day};
use crate::model::schedule::{
    NewScheduleAssignment, NewScheduleDay, ScheduleAssignment, ScheduleDay,
};

/// ## Errors
/// Returns a database error if the insert fails, including a second day for
/// the same department and date.
pub async fn insert_day(conn: &mut DbConnection<'_>, row: &NewScheduleDay<'_>) -> QueryResult<ScheduleDay> {
    diesel::insert_into(schedule_day::table)
        .values(row)
        .returning(ScheduleDay::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_day(conn: &mut DbConnection<'_>, id: i64) -> QueryResult<Option<ScheduleDay>> {
    schedule_day::table
        .find(id)
        .select(ScheduleDay::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Days for a department within `[from, to]`, in date order.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_days(
    conn: &mut DbConnection<'_>,
    department_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> QueryResult<Vec<ScheduleDay>> {
    schedule_day::table
        .filter(schedule_day::department_id.eq(department_id))
        .filter(schedule_day::service_date.between(from, to))
        .order(schedule_day::service_date.asc())
        .select(ScheduleDay::as_select())
        .load(conn)
        .await
}

/// ## Errors
/// Returns a database error if the insert fails, including a duplicate
/// assignment of the same user.
pub async fn insert_assignment(
    conn: &mut DbConnection<'_>,
    row: &NewScheduleAssignment,
) -> QueryResult<ScheduleAssignment> {
    diesel::insert_into(schedule_assignment::table)
        .values(row)
        .returning(ScheduleAssignment::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_assignment(
    conn: &mut DbConnection<'_>,
    schedule_day_id: i64,
    user_id: i64,
) -> QueryResult<Option<ScheduleAssignment>> {
    schedule_assignment::table
        .filter(schedule_assignment::schedule_day_id.eq(schedule_day_id))
        .filter(schedule_assignment::user_id.eq(user_id))
        .select(ScheduleAssignment::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn assignments_for_day(
    conn: &mut DbConnection<'_>,
    schedule_day_id: i64,
) -> QueryResult<Vec<ScheduleAssignment>> {
    schedule_assignment::table
        .filter(schedule_assignment::schedule_day_id.eq(schedule_day_id))
        .order(schedule_assignment::id.asc())
        .select(ScheduleAssignment::as_select())
        .load(conn)
        .await
}
