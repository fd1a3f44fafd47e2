//! Points summary, ledger history and manual adjustment.

use chrono::{NaiveDate, Utc};
use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::{Deserialize, Serialize};
use seva_core::rank::LevelRule;
use seva_db::model::ledger::{HoursLedgerEntry, PointLedgerEntry};
use seva_service::auth::{Action, Resource};
use seva_service::ledger::{self, Adjustment, AdjustmentOutcome, AdjustmentReason};
use seva_service::rank::{self, PointsSummary};

use super::context::{Caller, json_body, query_parsed};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct LedgerHistory {
    pub user_id: i64,
    pub hours: Vec<HoursLedgerEntry>,
    pub points: Vec<PointLedgerEntry>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentRequest {
    pub user_id: i64,
    pub minutes_delta: Option<i64>,
    pub points_delta: Option<i64>,
    #[serde(default = "default_reason")]
    pub reason: AdjustmentReason,
    /// Defaults to today.
    pub service_date: Option<NaiveDate>,
    pub department_id: Option<i64>,
    pub ref_id: Option<i64>,
    pub note: Option<String>,
}

const fn default_reason() -> AdjustmentReason {
    AdjustmentReason::ManualAdjust
}

#[handler]
async fn levels(depot: &mut Depot) -> AppResult<Json<&'static [LevelRule]>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Points, Action::Read)?;
    Ok(Json(rank::levels()))
}

/// `GET /points/summary?user_id=`
#[handler]
async fn summary(req: &mut Request, depot: &mut Depot) -> AppResult<Json<PointsSummary>> {
    let caller = Caller::from_depot(depot)?;
    let user_id = caller.subject(depot, query_parsed(req, "user_id")?, Resource::Points)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(rank::summary(&mut conn, user_id).await?))
}

/// `GET /points/ledger?user_id=&limit=`
#[handler]
async fn history(req: &mut Request, depot: &mut Depot) -> AppResult<Json<LedgerHistory>> {
    let caller = Caller::from_depot(depot)?;
    let user_id = caller.subject(depot, query_parsed(req, "user_id")?, Resource::Points)?;
    let limit: Option<i64> = query_parsed(req, "limit")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let hours = ledger::list_hours(&mut conn, user_id, limit).await?;
    let points = ledger::list_points(&mut conn, user_id, limit).await?;
    Ok(Json(LedgerHistory {
        user_id,
        hours,
        points,
    }))
}

/// ## Summary
/// `POST /points/adjustments` - Appends manual ledger rows and resyncs.
#[handler]
async fn adjust(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<AdjustmentOutcome>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Points, Action::Write)?;
    let body: AdjustmentRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let now = Utc::now();
    let outcome = ledger::adjust(
        &mut conn,
        caller.id(),
        Adjustment {
            user_id: body.user_id,
            minutes_delta: body.minutes_delta,
            points_delta: body.points_delta,
            reason: body.reason,
            service_date: body.service_date.unwrap_or_else(|| now.date_naive()),
            department_id: body.department_id,
            ref_id: body.ref_id,
            note: body.note,
        },
        now,
    )
    .await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(outcome))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("points")
        .push(Router::with_path("levels").get(levels))
        .push(Router::with_path("summary").get(summary))
        .push(Router::with_path("ledger").get(history))
        .push(Router::with_path("adjustments").post(adjust))
}
