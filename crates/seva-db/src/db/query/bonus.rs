//! Department-month quotas and bonus requests.

use chrono::{DateTime, Utc};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::BonusStatus;
use crate::db::schema::{dept_bonus_request, dept_month_quota};
use crate::model::bonus::{BonusRequest, DeptMonthQuota, NewBonusRequest, NewDeptMonthQuota};

/// ## Summary
/// Sets the quota for a department-month; the latest value replaces any
/// earlier one.
///
/// ## Errors
/// Returns a database error if the upsert fails.
pub async fn upsert_quota(
    conn: &mut DbConnection<'_>,
    row: &NewDeptMonthQuota<'_>,
    now: DateTime<Utc>,
) -> QueryResult<DeptMonthQuota> {
    diesel::insert_into(dept_month_quota::table)
        .values(row)
        .on_conflict((dept_month_quota::department_id, dept_month_quota::year_month))
        .do_update()
        .set((
            dept_month_quota::quota_points.eq(excluded(dept_month_quota::quota_points)),
            dept_month_quota::updated_by.eq(excluded(dept_month_quota::updated_by)),
            dept_month_quota::updated_at.eq(now),
        ))
        .returning(DeptMonthQuota::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_quota(
    conn: &mut DbConnection<'_>,
    department_id: i64,
    year_month: &str,
) -> QueryResult<Option<DeptMonthQuota>> {
    dept_month_quota::table
        .filter(dept_month_quota::department_id.eq(department_id))
        .filter(dept_month_quota::year_month.eq(year_month))
        .select(DeptMonthQuota::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Reads the quota row and locks it until the transaction ends. Every
/// approval for the same department-month serializes on this lock.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_quota_for_update(
    conn: &mut DbConnection<'_>,
    department_id: i64,
    year_month: &str,
) -> QueryResult<Option<DeptMonthQuota>> {
    dept_month_quota::table
        .filter(dept_month_quota::department_id.eq(department_id))
        .filter(dept_month_quota::year_month.eq(year_month))
        .select(DeptMonthQuota::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Points already approved for a department-month.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn approved_points(
    conn: &mut DbConnection<'_>,
    department_id: i64,
    year_month: &str,
) -> QueryResult<i64> {
    dept_bonus_request::table
        .filter(dept_bonus_request::department_id.eq(department_id))
        .filter(dept_bonus_request::year_month.eq(year_month))
        .filter(dept_bonus_request::status.eq(BonusStatus::AdminApproved))
        .select(sql::<BigInt>("COALESCE(SUM(points), 0)::BIGINT"))
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert_request(
    conn: &mut DbConnection<'_>,
    row: &NewBonusRequest<'_>,
) -> QueryResult<BonusRequest> {
    diesel::insert_into(dept_bonus_request::table)
        .values(row)
        .returning(BonusRequest::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_request(conn: &mut DbConnection<'_>, id: i64) -> QueryResult<Option<BonusRequest>> {
    dept_bonus_request::table
        .find(id)
        .select(BonusRequest::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_requests(
    conn: &mut DbConnection<'_>,
    department_id: i64,
    year_month: &str,
) -> QueryResult<Vec<BonusRequest>> {
    dept_bonus_request::table
        .filter(dept_bonus_request::department_id.eq(department_id))
        .filter(dept_bonus_request::year_month.eq(year_month))
        .order(dept_bonus_request::created_at.desc())
        .select(BonusRequest::as_select())
        .load(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_pending(conn: &mut DbConnection<'_>) -> QueryResult<Vec<BonusRequest>> {
    dept_bonus_request::table
        .filter(dept_bonus_request::status.eq(BonusStatus::Pending))
        .order(dept_bonus_request::created_at.asc())
        .select(BonusRequest::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Moves a request from `from` to `to`. `None` means the request was no
/// longer in `from`.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn transition(
    conn: &mut DbConnection<'_>,
    id: i64,
    from: BonusStatus,
    to: BonusStatus,
    actor_id: i64,
    now: DateTime<Utc>,
) -> QueryResult<Option<BonusRequest>> {
    diesel::update(
        dept_bonus_request::table
            .filter(dept_bonus_request::id.eq(id))
            .filter(dept_bonus_request::status.eq(from)),
    )
    .set((
        dept_bonus_request::status.eq(to),
        dept_bonus_request::updated_by.eq(actor_id),
        dept_bonus_request::updated_at.eq(now),
    ))
    .returning(BonusRequest::as_returning())
    .get_result(conn)
    .await
    .optional()
}
