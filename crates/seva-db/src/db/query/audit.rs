use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::audit_log;
use crate::model::audit::{AuditLogEntry, NewAuditLogEntry};

/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert(conn: &mut DbConnection<'_>, row: &NewAuditLogEntry<'_>) -> QueryResult<usize> {
    diesel::insert_into(audit_log::table)
        .values(row)
        .execute(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn recent(conn: &mut DbConnection<'_>, limit: i64) -> QueryResult<Vec<AuditLogEntry>> {
    audit_log::table
        .order((audit_log::created_at.desc(), audit_log::id.desc()))
        .limit(limit)
        .select(AuditLogEntry::as_select())
        .load(conn)
        .await
}
