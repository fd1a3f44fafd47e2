//! Reward redemption and code verification.

use chrono::Utc;
use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Deserialize;
use seva_db::model::reward::RedeemOrder;
use seva_service::auth::{Action, Resource};
use seva_service::redemption::{self, RedeemOutcome, VerifyOutcome};

use super::context::{Caller, json_body};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;
use crate::redemption_handler::get_policy_from_depot;

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub reward_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub code: String,
}

/// ## Summary
/// `POST /redemptions` - Redeems a reward for the caller and returns the code.
///
/// ## Errors
/// 400 when the caller is not eligible, 409 when the reward is inactive or
/// out of stock.
#[handler]
async fn redeem(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<RedeemOutcome>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Redemption, Action::Write)?;
    let body: RedeemRequest = json_body(req).await?;
    let policy = get_policy_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let outcome = redemption::redeem(&mut conn, &policy, caller.id(), body.reward_id, Utc::now()).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(outcome))
}

#[handler]
async fn list_own(depot: &mut Depot) -> AppResult<Json<Vec<RedeemOrder>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Redemption, Action::Read)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(redemption::list_orders(&mut conn, caller.id()).await?))
}

/// ## Summary
/// `POST /redemptions/verify` - Marks the order behind a presented code used.
///
/// ## Errors
/// 400 for a forged or malformed code, 410 once it has expired, 409 when
/// the order was already used.
#[handler]
async fn verify(req: &mut Request, depot: &mut Depot) -> AppResult<Json<VerifyOutcome>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Redemption, Action::Approve)?;
    let body: VerifyRequest = json_body(req).await?;
    let policy = get_policy_from_depot(depot)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(
        redemption::verify(&mut conn, &policy, body.code.trim(), caller.id(), Utc::now()).await?,
    ))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("redemptions")
        .get(list_own)
        .post(redeem)
        .push(Router::with_path("verify").post(verify))
}
