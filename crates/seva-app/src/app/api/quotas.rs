//! Monthly department bonus quotas.

use chrono::Utc;
use salvo::prelude::Json;
use salvo::{Depot, Request, Router, handler};
use serde::Deserialize;
use seva_core::quota::YearMonth;
use seva_db::model::bonus::DeptMonthQuota;
use seva_service::auth::{Action, Resource};
use seva_service::bonus::{self, QuotaView};

use super::context::{Caller, json_body, path_id};
use crate::db_handler::get_db_from_depot;
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct QuotaRequest {
    pub department_id: i64,
    pub year_month: YearMonth,
    pub quota_points: i64,
}

fn path_month(req: &Request) -> AppResult<YearMonth> {
    let raw = req
        .param::<String>("year_month")
        .ok_or_else(|| AppError::BadRequest("missing path parameter 'year_month'".to_string()))?;
    Ok(raw.parse()?)
}

/// `PUT /quotas` - Creates or replaces a department-month quota.
#[handler]
async fn upsert(req: &mut Request, depot: &mut Depot) -> AppResult<Json<DeptMonthQuota>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Quota, Action::Write)?;
    let body: QuotaRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(
        bonus::set_quota(
            &mut conn,
            caller.id(),
            body.department_id,
            body.year_month,
            body.quota_points,
            Utc::now(),
        )
        .await?,
    ))
}

/// `GET /quotas/{department_id}/{year_month}` - The quota with its usage.
#[handler]
async fn show(req: &mut Request, depot: &mut Depot) -> AppResult<Json<QuotaView>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Quota, Action::Read)?;
    let department_id = path_id(req, "department_id")?;
    let year_month = path_month(req)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(bonus::get_quota(&mut conn, department_id, year_month).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("quotas")
        .put(upsert)
        .push(Router::with_path("{department_id}/{year_month}").get(show))
}
