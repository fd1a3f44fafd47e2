//! Badge catalog, holdings and manual grants.

use chrono::Utc;
use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Deserialize;
use seva_db::model::badge::{Badge, HeldBadge, UserBadge};
use seva_service::auth::{Action, Resource};
use seva_service::badge::{self, SweepReport};

use super::context::{Caller, json_body, query_parsed};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub user_id: i64,
    pub code: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub user_id: i64,
    pub code: String,
    pub reason: Option<String>,
}

#[handler]
async fn catalog(depot: &mut Depot) -> AppResult<Json<Vec<Badge>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Badge, Action::Read)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(badge::catalog(&mut conn).await?))
}

/// `GET /badges/held?user_id=`
#[handler]
async fn held(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<HeldBadge>>> {
    let caller = Caller::from_depot(depot)?;
    let user_id = caller.subject(depot, query_parsed(req, "user_id")?, Resource::Badge)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(badge::held(&mut conn, user_id).await?))
}

/// ## Errors
/// 404 for an unknown badge code or user, 409 when the badge is already held.
#[handler]
async fn grant(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<UserBadge>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Badge, Action::Write)?;
    let body: GrantRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let granted = badge::grant(&mut conn, caller.id(), body.user_id, &body.code, body.note).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(granted))
}

#[handler]
async fn revoke(req: &mut Request, depot: &mut Depot) -> AppResult<Json<UserBadge>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Badge, Action::Write)?;
    let body: RevokeRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(
        badge::revoke(
            &mut conn,
            caller.id(),
            body.user_id,
            &body.code,
            body.reason,
            Utc::now(),
        )
        .await?,
    ))
}

/// Runs the auto-grant sweep on demand.
#[handler]
async fn sweep(depot: &mut Depot) -> AppResult<Json<SweepReport>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Badge, Action::Write)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(badge::sweep(&mut conn, Utc::now()).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("badges")
        .get(catalog)
        .push(Router::with_path("held").get(held))
        .push(Router::with_path("grants").post(grant))
        .push(Router::with_path("revocations").post(revoke))
        .push(Router::with_path("sweep").post(sweep))
}
