//! Engagement history queries. Rows are closed, never rewritten.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::engagement;
use crate::model::engagement::{Engagement, NewEngagement};

/// ## Summary
/// Returns a query for a user's rows, newest first.
#[must_use]
pub fn for_user(user_id: i64) -> engagement::BoxedQuery<'static, diesel::pg::Pg> {
    engagement::table
        .filter(engagement::user_id.eq(user_id))
        .order((engagement::effective_from.desc(), engagement::id.desc()))
        .into_boxed()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn current(conn: &mut DbConnection<'_>, user_id: i64) -> QueryResult<Option<Engagement>> {
    engagement::table
        .filter(engagement::user_id.eq(user_id))
        .filter(engagement::effective_until.is_null())
        .select(Engagement::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Reads the current row and locks it for the rest of the transaction.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn current_for_update(
    conn: &mut DbConnection<'_>,
    user_id: i64,
) -> QueryResult<Option<Engagement>> {
    engagement::table
        .filter(engagement::user_id.eq(user_id))
        .filter(engagement::effective_until.is_null())
        .select(Engagement::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn history(conn: &mut DbConnection<'_>, user_id: i64) -> QueryResult<Vec<Engagement>> {
    for_user(user_id).select(Engagement::as_select()).load(conn).await
}

/// ## Errors
/// Returns a database error if the insert fails, including a second open row
/// for the same user.
pub async fn insert(conn: &mut DbConnection<'_>, row: &NewEngagement<'_>) -> QueryResult<Engagement> {
    diesel::insert_into(engagement::table)
        .values(row)
        .returning(Engagement::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Ends an open row at `until`.
///
/// ## Errors
/// Returns `NotFound` if the row is missing or already closed.
pub async fn close(
    conn: &mut DbConnection<'_>,
    id: i64,
    until: DateTime<Utc>,
) -> QueryResult<Engagement> {
    diesel::update(
        engagement::table
            .filter(engagement::id.eq(id))
            .filter(engagement::effective_until.is_null()),
    )
    .set(engagement::effective_until.eq(until))
    .returning(Engagement::as_returning())
    .get_result(conn)
    .await
}

/// ## Errors
/// Returns a database error if the update fails.
pub async fn link_successor(
    conn: &mut DbConnection<'_>,
    id: i64,
    successor_id: i64,
) -> QueryResult<usize> {
    diesel::update(engagement::table.find(id))
        .set(engagement::replaced_by.eq(successor_id))
        .execute(conn)
        .await
}
