use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::enums::{RedeemStatus, RewardStatus};
use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::reward)]
#[diesel(check_for_backend(Pg))]
pub struct Reward {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub points_cost: i64,
    pub min_level: i32,
    pub require_join_badge: bool,
    pub required_badges: Vec<String>,
    /// `None` is unlimited.
    pub stock: Option<i32>,
    pub status: RewardStatus,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::reward)]
pub struct NewReward<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub points_cost: i64,
    pub min_level: i32,
    pub require_join_badge: bool,
    pub required_badges: &'a [String],
    pub stock: Option<i32>,
    pub status: RewardStatus,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::redeem_order)]
#[diesel(check_for_backend(Pg))]
pub struct RedeemOrder {
    pub id: i64,
    pub user_id: i64,
    pub reward_id: i64,
    pub points_cost: i64,
    pub code_payload: String,
    pub code_signature: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: RedeemStatus,
    pub used_by: Option<i64>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Orders are inserted with a pre-allocated id so the signed code can be
/// stored in the same statement.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::redeem_order)]
pub struct NewRedeemOrder<'a> {
    pub id: i64,
    pub user_id: i64,
    pub reward_id: i64,
    pub points_cost: i64,
    pub code_payload: &'a str,
    pub code_signature: &'a str,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: RedeemStatus,
}
