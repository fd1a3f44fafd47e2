//! Reward catalog with per-caller eligibility.

use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Deserialize;
use seva_db::model::reward::Reward;
use seva_service::auth::{Action, Resource};
use seva_service::reward::{self, RewardListing, RewardSpec};

use super::context::{Caller, json_body, query_parsed};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct RewardRequest {
    pub title: String,
    pub description: Option<String>,
    pub points_cost: i64,
    #[serde(default = "default_min_level")]
    pub min_level: i32,
    #[serde(default)]
    pub require_join_badge: bool,
    #[serde(default)]
    pub required_badges: Vec<String>,
    pub stock: Option<i32>,
}

const fn default_min_level() -> i32 {
    1
}

impl From<RewardRequest> for RewardSpec {
    fn from(body: RewardRequest) -> Self {
        Self {
            title: body.title,
            description: body.description,
            points_cost: body.points_cost,
            min_level: body.min_level,
            require_join_badge: body.require_join_badge,
            required_badges: body.required_badges,
            stock: body.stock,
        }
    }
}

/// ## Summary
/// `GET /rewards?include_inactive=`
///
/// Every listing carries `can_redeem` and `missing_badges` for the caller.
/// Inactive rewards are only listed for catalog editors.
#[handler]
async fn list(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<RewardListing>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Reward, Action::Read)?;
    let include_inactive = query_parsed::<bool>(req, "include_inactive")?.unwrap_or(false);
    if include_inactive {
        caller.require(depot, Resource::Reward, Action::Write)?;
    }
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(
        reward::list_for_user(&mut conn, caller.id(), include_inactive).await?,
    ))
}

#[handler]
async fn create(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<Reward>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Reward, Action::Write)?;
    let body: RewardRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let created = reward::create(&mut conn, caller.id(), body.into()).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(created))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("rewards").get(list).post(create)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn reward_request_defaults() {
        let body: RewardRequest =
            serde_json::from_str(r#"{"title": "Tea set", "points_cost": 80}"#).unwrap();
        let spec = RewardSpec::from(body);
        assert_eq!(spec.min_level, 1);
        assert!(!spec.require_join_badge);
        assert!(spec.required_badges.is_empty());
        assert!(spec.stock.is_none());
    }
}
