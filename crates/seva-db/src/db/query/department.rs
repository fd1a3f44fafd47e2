use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::department;
use crate::model::department::{Department, NewDepartment};

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list(conn: &mut DbConnection<'_>) -> QueryResult<Vec<Department>> {
    department::table
        .order((department::display_order.asc(), department::id.asc()))
        .select(Department::as_select())
        .load(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find(conn: &mut DbConnection<'_>, id: i64) -> QueryResult<Option<Department>> {
    department::table
        .find(id)
        .select(Department::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert(conn: &mut DbConnection<'_>, row: &NewDepartment<'_>) -> QueryResult<Department> {
    diesel::insert_into(department::table)
        .values(row)
        .returning(Department::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the update fails.
pub async fn update(
    conn: &mut DbConnection<'_>,
    id: i64,
    row: &NewDepartment<'_>,
    now: DateTime<Utc>,
) -> QueryResult<Option<Department>> {
    diesel::update(department::table.find(id))
        .set((row, department::updated_at.eq(now)))
        .returning(Department::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Summary
/// Deletes a department. Rows referencing it without a cascade (ledgers,
/// engagements, bonus requests) make this fail with a foreign-key error.
///
/// ## Errors
/// Returns a database error if the delete fails.
pub async fn delete(conn: &mut DbConnection<'_>, id: i64) -> QueryResult<usize> {
    diesel::delete(department::table.find(id)).execute(conn).await
}
