//! Department bonus requests and their approval.

use chrono::Utc;
use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Deserialize;
use seva_core::quota::YearMonth;
use seva_db::model::bonus::BonusRequest;
use seva_service::auth::{Action, Resource};
use seva_service::bonus::{self, DecisionOutcome, NewBonus};

use super::context::{Caller, json_body, path_id, query_required};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct BonusRequestBody {
    pub department_id: i64,
    pub year_month: YearMonth,
    pub user_id: i64,
    pub points: i64,
    pub reason: Option<String>,
}

/// ## Summary
/// `POST /bonus-requests` - Files a pending bonus request.
///
/// ## Errors
/// 404 without a quota for the month, 422 when the request alone would
/// overshoot what is left of it.
#[handler]
async fn create(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<BonusRequest>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Bonus, Action::Write)?;
    let body: BonusRequestBody = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let request = bonus::create_request(
        &mut conn,
        caller.id(),
        NewBonus {
            department_id: body.department_id,
            year_month: body.year_month,
            user_id: body.user_id,
            points: body.points,
            reason: body.reason,
        },
    )
    .await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(request))
}

/// `GET /bonus-requests?department_id=&year_month=`
#[handler]
async fn list(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<BonusRequest>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Bonus, Action::Read)?;
    let department_id: i64 = query_required(req, "department_id")?;
    let year_month: YearMonth = query_required(req, "year_month")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(bonus::list_requests(&mut conn, department_id, year_month).await?))
}

#[handler]
async fn pending(depot: &mut Depot) -> AppResult<Json<Vec<BonusRequest>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Bonus, Action::Read)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(bonus::list_pending(&mut conn).await?))
}

/// ## Errors
/// 409 when the request is no longer pending, 422 when the quota has been
/// used up since it was filed.
#[handler]
async fn approve(req: &mut Request, depot: &mut Depot) -> AppResult<Json<DecisionOutcome>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Bonus, Action::Approve)?;
    let id = path_id(req, "id")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(bonus::approve(&mut conn, id, caller.id(), Utc::now()).await?))
}

#[handler]
async fn reject(req: &mut Request, depot: &mut Depot) -> AppResult<Json<DecisionOutcome>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Bonus, Action::Approve)?;
    let id = path_id(req, "id")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(bonus::reject(&mut conn, id, caller.id(), Utc::now()).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("bonus-requests")
        .get(list)
        .post(create)
        .push(Router::with_path("pending").get(pending))
        .push(Router::with_path("{id}/approve").post(approve))
        .push(Router::with_path("{id}/reject").post(reject))
}

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn approval_requires_authentication() {
        let resp = TestClient::post("http://127.0.0.1:5800/bonus-requests/9/approve")
            .send(routes())
            .await;

        assert_eq!(resp.status_code, Some(StatusCode::UNAUTHORIZED));
    }
}
