//! Engagement periods: the current one and its history.

use chrono::Utc;
use salvo::prelude::Json;
use salvo::{Depot, Request, Router, handler};
use serde::{Deserialize, Serialize};
use seva_db::db::enums::EngagementType;
use seva_db::model::engagement::Engagement;
use seva_service::auth::{Action, Resource};
use seva_service::engagement::{self, EngagementChange, EngagementUpdate};

use super::context::{Caller, json_body, path_id, query_parsed};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Serialize)]
pub struct EngagementView {
    pub current: Option<Engagement>,
    pub history: Vec<Engagement>,
}

#[derive(Debug, Deserialize)]
pub struct EngagementRequest {
    pub engagement_type: EngagementType,
    pub department_id: i64,
    pub title: Option<String>,
    pub change_reason: Option<String>,
}

/// `GET /engagements?user_id=`
#[handler]
async fn show(req: &mut Request, depot: &mut Depot) -> AppResult<Json<EngagementView>> {
    let caller = Caller::from_depot(depot)?;
    let user_id = caller.subject(depot, query_parsed(req, "user_id")?, Resource::Engagement)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let current = engagement::current(&mut conn, user_id).await?;
    let history = engagement::history(&mut conn, user_id).await?;
    Ok(Json(EngagementView { current, history }))
}

/// ## Summary
/// `PUT /engagements/{user_id}` - Closes the current period and opens a new one.
#[handler]
async fn update(req: &mut Request, depot: &mut Depot) -> AppResult<Json<EngagementUpdate>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Engagement, Action::Write)?;
    let user_id = path_id(req, "user_id")?;
    let body: EngagementRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(
        engagement::update(
            &mut conn,
            caller.id(),
            user_id,
            EngagementChange {
                engagement_type: body.engagement_type,
                department_id: body.department_id,
                title: body.title,
                change_reason: body.change_reason,
            },
            Utc::now(),
        )
        .await?,
    ))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("engagements")
        .get(show)
        .push(Router::with_path("{user_id}").put(update))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn engagement_body_rejects_unknown_type() {
        let ok: EngagementRequest = serde_json::from_str(
            r#"{"engagement_type": "temple_worker", "department_id": 2, "change_reason": "promoted"}"#,
        )
        .unwrap();
        assert_eq!(ok.engagement_type, EngagementType::TempleWorker);

        let bad = serde_json::from_str::<EngagementRequest>(
            r#"{"engagement_type": "contractor", "department_id": 2}"#,
        );
        assert!(bad.is_err());
    }
}
