//! Append-only ledger access: inserts, sums and listings. Nothing here
//! updates or deletes a ledger row.

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::{hours_ledger, point_ledger};
use crate::model::ledger::{
    HoursLedgerEntry, NewHoursLedgerEntry, NewPointLedgerEntry, PointLedgerEntry,
};

/// ## Summary
/// Appends an hours entry.
///
/// ## Errors
/// Returns a database error if the insert fails.
#[tracing::instrument(skip(conn, entry), fields(user_id = entry.user_id, minutes = entry.minutes_delta))]
pub async fn insert_hours(
    conn: &mut DbConnection<'_>,
    entry: &NewHoursLedgerEntry<'_>,
) -> QueryResult<HoursLedgerEntry> {
    diesel::insert_into(hours_ledger::table)
        .values(entry)
        .returning(HoursLedgerEntry::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Appends a points entry.
///
/// ## Errors
/// Returns a database error if the insert fails, including the CHECK that
/// keeps `redeem` entries negative.
#[tracing::instrument(skip(conn, entry), fields(user_id = entry.user_id, points = entry.points_delta))]
pub async fn insert_points(
    conn: &mut DbConnection<'_>,
    entry: &NewPointLedgerEntry<'_>,
) -> QueryResult<PointLedgerEntry> {
    diesel::insert_into(point_ledger::table)
        .values(entry)
        .returning(PointLedgerEntry::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Sum of every hours entry for a user, in minutes. Zero when there are none.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn sum_minutes(conn: &mut DbConnection<'_>, user_id: i64) -> QueryResult<i64> {
    hours_ledger::table
        .filter(hours_ledger::user_id.eq(user_id))
        .select(sql::<BigInt>("COALESCE(SUM(minutes_delta), 0)::BIGINT"))
        .get_result(conn)
        .await
}

/// ## Summary
/// Sum of every points entry for a user. Zero when there are none.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn sum_points(conn: &mut DbConnection<'_>, user_id: i64) -> QueryResult<i64> {
    point_ledger::table
        .filter(point_ledger::user_id.eq(user_id))
        .select(sql::<BigInt>("COALESCE(SUM(points_delta), 0)::BIGINT"))
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_hours(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    limit: i64,
) -> QueryResult<Vec<HoursLedgerEntry>> {
    hours_ledger::table
        .filter(hours_ledger::user_id.eq(user_id))
        .order((hours_ledger::created_at.desc(), hours_ledger::id.desc()))
        .limit(limit)
        .select(HoursLedgerEntry::as_select())
        .load(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_points(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    limit: i64,
) -> QueryResult<Vec<PointLedgerEntry>> {
    point_ledger::table
        .filter(point_ledger::user_id.eq(user_id))
        .order((point_ledger::created_at.desc(), point_ledger::id.desc()))
        .limit(limit)
        .select(PointLedgerEntry::as_select())
        .load(conn)
        .await
}
