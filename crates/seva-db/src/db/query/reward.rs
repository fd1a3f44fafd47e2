//! Rewards catalog and redemption orders.

use chrono::{DateTime, Utc};
use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::{RedeemStatus, RewardStatus};
use crate::db::schema::{redeem_order, reward};
use crate::model::reward::{NewRedeemOrder, NewReward, RedeemOrder, Reward};

/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert(conn: &mut DbConnection<'_>, row: &NewReward<'_>) -> QueryResult<Reward> {
    diesel::insert_into(reward::table)
        .values(row)
        .returning(Reward::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list(conn: &mut DbConnection<'_>, only_active: bool) -> QueryResult<Vec<Reward>> {
    let mut query = reward::table
        .order((reward::points_cost.asc(), reward::id.asc()))
        .into_boxed();
    if only_active {
        query = query.filter(reward::status.eq(RewardStatus::Active));
    }
    query.select(Reward::as_select()).load(conn).await
}

/// ## Summary
/// Reads a reward and locks it so stock checks and decrements serialize.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_for_update(conn: &mut DbConnection<'_>, id: i64) -> QueryResult<Option<Reward>> {
    reward::table
        .find(id)
        .select(Reward::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Takes one unit from a finite stock. Unlimited (`NULL`) stock is left alone.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn decrement_stock(
    conn: &mut DbConnection<'_>,
    id: i64,
    now: DateTime<Utc>,
) -> QueryResult<usize> {
    diesel::update(
        reward::table
            .filter(reward::id.eq(id))
            .filter(reward::stock.gt(0)),
    )
    .set((reward::stock.eq(reward::stock - 1), reward::updated_at.eq(now)))
    .execute(conn)
    .await
}

/// ## Summary
/// Allocates the next order id so the signed code can be stored in the
/// insert itself.
///
/// ## Errors
/// Returns a database error if the sequence cannot be read.
pub async fn next_order_id(conn: &mut DbConnection<'_>) -> QueryResult<i64> {
    diesel::select(sql::<BigInt>("nextval('redeem_order_id_seq')"))
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert_order(conn: &mut DbConnection<'_>, row: &NewRedeemOrder<'_>) -> QueryResult<RedeemOrder> {
    diesel::insert_into(redeem_order::table)
        .values(row)
        .returning(RedeemOrder::as_returning())
        .get_result(conn)
        .await
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_order(conn: &mut DbConnection<'_>, id: i64) -> QueryResult<Option<RedeemOrder>> {
    redeem_order::table
        .find(id)
        .select(RedeemOrder::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_orders_for_user(
    conn: &mut DbConnection<'_>,
    user_id: i64,
) -> QueryResult<Vec<RedeemOrder>> {
    redeem_order::table
        .filter(redeem_order::user_id.eq(user_id))
        .order((redeem_order::created_at.desc(), redeem_order::id.desc()))
        .select(RedeemOrder::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Single-statement compare-and-set from `pending` to `used`, matched on the
/// stored signature. Of two concurrent callers only one gets `Some`.
///
/// ## Errors
/// Returns a database error if the update fails.
pub async fn mark_used(
    conn: &mut DbConnection<'_>,
    id: i64,
    signature: &str,
    used_by: i64,
    now: DateTime<Utc>,
) -> QueryResult<Option<RedeemOrder>> {
    diesel::update(
        redeem_order::table
            .filter(redeem_order::id.eq(id))
            .filter(redeem_order::status.eq(RedeemStatus::Pending))
            .filter(redeem_order::code_signature.eq(signature)),
    )
    .set((
        redeem_order::status.eq(RedeemStatus::Used),
        redeem_order::used_by.eq(used_by),
        redeem_order::used_at.eq(now),
    ))
    .returning(RedeemOrder::as_returning())
    .get_result(conn)
    .await
    .optional()
}
