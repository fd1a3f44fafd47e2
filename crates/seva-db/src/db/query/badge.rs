//! Badge catalog and grant queries.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::{badge, user_badge};
use crate::model::badge::{Badge, NewUserBadge, UserBadge};

/// ## Summary
/// Returns a query for the whole catalog in display order.
#[must_use]
pub fn catalog() -> badge::BoxedQuery<'static, diesel::pg::Pg> {
    badge::table
        .order((badge::display_order.asc(), badge::id.asc()))
        .into_boxed()
}

/// ## Summary
/// Returns a query for grants that have not been revoked.
#[must_use]
pub fn active_grants_for_user(user_id: i64) -> user_badge::BoxedQuery<'static, diesel::pg::Pg> {
    user_badge::table
        .filter(user_badge::user_id.eq(user_id))
        .filter(user_badge::revoked_at.is_null())
        .into_boxed()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_catalog(conn: &mut DbConnection<'_>) -> QueryResult<Vec<Badge>> {
    catalog().select(Badge::as_select()).load(conn).await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn by_code(conn: &mut DbConnection<'_>, code: &str) -> QueryResult<Option<Badge>> {
    badge::table
        .filter(badge::code.eq(code))
        .select(Badge::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Badge ids the user currently holds.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn held_badge_ids(conn: &mut DbConnection<'_>, user_id: i64) -> QueryResult<Vec<i64>> {
    active_grants_for_user(user_id)
        .select(user_badge::badge_id)
        .load(conn)
        .await
}

/// ## Summary
/// Codes of the badges the user currently holds.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn held_badge_codes(conn: &mut DbConnection<'_>, user_id: i64) -> QueryResult<Vec<String>> {
    user_badge::table
        .inner_join(badge::table)
        .filter(user_badge::user_id.eq(user_id))
        .filter(user_badge::revoked_at.is_null())
        .select(badge::code)
        .load(conn)
        .await
}

/// ## Summary
/// Active grants joined with their catalog entries, newest first.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn held_badges(
    conn: &mut DbConnection<'_>,
    user_id: i64,
) -> QueryResult<Vec<(UserBadge, Badge)>> {
    user_badge::table
        .inner_join(badge::table)
        .filter(user_badge::user_id.eq(user_id))
        .filter(user_badge::revoked_at.is_null())
        .order(user_badge::granted_at.desc())
        .select((UserBadge::as_select(), Badge::as_select()))
        .load(conn)
        .await
}

/// ## Summary
/// Inserts a grant unless the user already holds the badge.
///
/// The partial unique index on `(user_id, badge_id) WHERE revoked_at IS NULL`
/// turns a concurrent duplicate into a no-op, reported as `None`.
///
/// ## Errors
/// Returns a database error if the insert fails for any other reason.
#[tracing::instrument(skip(conn, grant), fields(user_id = grant.user_id, badge_id = grant.badge_id))]
pub async fn insert_grant_if_absent(
    conn: &mut DbConnection<'_>,
    grant: &NewUserBadge,
) -> QueryResult<Option<UserBadge>> {
    diesel::insert_into(user_badge::table)
        .values(grant)
        .on_conflict_do_nothing()
        .returning(UserBadge::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Summary
/// Stamps revocation on the user's active grant of a badge.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn revoke_active(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    badge_id: i64,
    revoked_by: i64,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> QueryResult<Option<UserBadge>> {
    diesel::update(
        user_badge::table
            .filter(user_badge::user_id.eq(user_id))
            .filter(user_badge::badge_id.eq(badge_id))
            .filter(user_badge::revoked_at.is_null()),
    )
    .set((
        user_badge::revoked_at.eq(now),
        user_badge::revoked_by.eq(revoked_by),
        user_badge::revoke_reason.eq(reason),
    ))
    .returning(UserBadge::as_returning())
    .get_result(conn)
    .await
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn active_grants_exclude_revoked_rows() {
        let sql =
            diesel::debug_query::<diesel::pg::Pg, _>(&active_grants_for_user(3)).to_string();
        assert!(sql.contains("\"user_badge\".\"revoked_at\" IS NULL"), "{sql}");
    }
}
