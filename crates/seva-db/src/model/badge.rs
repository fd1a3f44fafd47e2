use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::enums::BadgeCategory;
use crate::db::schema;

/// Catalog entry. `auto_grant_rule` holds the raw stored JSON; decode it with
/// `seva_core::badge_rule::AutoGrantRule::decode`.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::badge)]
#[diesel(check_for_backend(Pg))]
pub struct Badge {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: BadgeCategory,
    pub auto_grant_rule: Option<serde_json::Value>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::user_badge)]
#[diesel(check_for_backend(Pg))]
pub struct UserBadge {
    pub id: i64,
    pub user_id: i64,
    pub badge_id: i64,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<i64>,
    pub revoke_reason: Option<String>,
}

/// A grant to insert. `granted_by` of `None` marks an automatic grant.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::user_badge)]
pub struct NewUserBadge {
    pub user_id: i64,
    pub badge_id: i64,
    pub granted_by: Option<i64>,
    pub metadata: Option<serde_json::Value>,
}

/// Active grant joined with its catalog entry, for display.
#[derive(Debug, Clone, Serialize)]
pub struct HeldBadge {
    pub grant: UserBadge,
    pub badge: Badge,
}
