use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::audit_log)]
#[diesel(check_for_backend(Pg))]
pub struct AuditLogEntry {
    pub id: i64,
    pub actor_user_id: Option<i64>,
    pub action: String,
    pub target_table: Option<String>,
    pub target_id: Option<i64>,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::audit_log)]
pub struct NewAuditLogEntry<'a> {
    pub actor_user_id: Option<i64>,
    pub action: &'a str,
    pub target_table: Option<&'a str>,
    pub target_id: Option<i64>,
    pub detail: Option<serde_json::Value>,
}
