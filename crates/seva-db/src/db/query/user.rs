use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::{UserRole, UserStatus};
use crate::db::schema::app_user;
use crate::model::user::{NewUser, User, UserProfileChanges};

/// ## Summary
/// Returns a query to select all users.
#[must_use]
pub fn all() -> app_user::BoxedQuery<'static, diesel::pg::Pg> {
    app_user::table.into_boxed()
}

/// ## Summary
/// Returns a query to find a user by ID.
#[must_use]
pub fn by_id(id: i64) -> app_user::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(app_user::id.eq(id))
}

/// ## Summary
/// Returns a query to find a user by email.
#[must_use]
pub fn by_email(email: &str) -> app_user::BoxedQuery<'_, diesel::pg::Pg> {
    all().filter(app_user::email.eq(email))
}

/// ## Summary
/// Returns a query matching either an email or a volunteer code.
#[must_use]
pub fn by_login_identifier(identifier: &str) -> app_user::BoxedQuery<'_, diesel::pg::Pg> {
    all().filter(
        app_user::email
            .eq(identifier)
            .or(app_user::volunteer_code.eq(identifier)),
    )
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find(conn: &mut DbConnection<'_>, id: i64) -> QueryResult<Option<User>> {
    by_id(id).select(User::as_select()).first(conn).await.optional()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_by_email(conn: &mut DbConnection<'_>, email: &str) -> QueryResult<Option<User>> {
    by_email(email)
        .select(User::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_by_login_identifier(
    conn: &mut DbConnection<'_>,
    identifier: &str,
) -> QueryResult<Option<User>> {
    by_login_identifier(identifier)
        .select(User::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list(conn: &mut DbConnection<'_>) -> QueryResult<Vec<User>> {
    all()
        .order(app_user::id.asc())
        .select(User::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Ids of every active user, for population-wide sweeps.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn active_ids(conn: &mut DbConnection<'_>) -> QueryResult<Vec<i64>> {
    all()
        .filter(app_user::status.eq(UserStatus::Active))
        .order(app_user::id.asc())
        .select(app_user::id)
        .load(conn)
        .await
}

/// ## Errors
/// Returns a database error if the insert fails, including a duplicate email.
pub async fn insert(conn: &mut DbConnection<'_>, user: &NewUser<'_>) -> QueryResult<User> {
    diesel::insert_into(app_user::table)
        .values(user)
        .returning(User::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_volunteer_code(
    conn: &mut DbConnection<'_>,
    id: i64,
    code: &str,
) -> QueryResult<User> {
    diesel::update(app_user::table.find(id))
        .set(app_user::volunteer_code.eq(code))
        .returning(User::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the update fails.
pub async fn update_profile(
    conn: &mut DbConnection<'_>,
    id: i64,
    changes: &UserProfileChanges<'_>,
    now: DateTime<Utc>,
) -> QueryResult<Option<User>> {
    diesel::update(app_user::table.find(id))
        .set((changes, app_user::updated_at.eq(now)))
        .returning(User::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_role(
    conn: &mut DbConnection<'_>,
    id: i64,
    role: UserRole,
    now: DateTime<Utc>,
) -> QueryResult<Option<User>> {
    diesel::update(app_user::table.find(id))
        .set((app_user::role.eq(role), app_user::updated_at.eq(now)))
        .returning(User::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_status(
    conn: &mut DbConnection<'_>,
    id: i64,
    status: UserStatus,
    now: DateTime<Utc>,
) -> QueryResult<Option<User>> {
    diesel::update(app_user::table.find(id))
        .set((app_user::status.eq(status), app_user::updated_at.eq(now)))
        .returning(User::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the update fails.
pub async fn set_password_hash(
    conn: &mut DbConnection<'_>,
    id: i64,
    password_hash: &str,
    now: DateTime<Utc>,
) -> QueryResult<usize> {
    diesel::update(app_user::table.find(id))
        .set((
            app_user::password_hash.eq(password_hash),
            app_user::updated_at.eq(now),
        ))
        .execute(conn)
        .await
}
