use salvo::prelude::Json;
use salvo::{Depot, Request, Router, handler};
use seva_db::model::audit::AuditLogEntry;
use seva_service::audit;
use seva_service::auth::{Action, Resource};

use super::context::{Caller, query_parsed};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

const DEFAULT_LIMIT: i64 = 100;

/// `GET /audit?limit=` - Newest entries first.
#[handler]
async fn recent(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<AuditLogEntry>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Audit, Action::Read)?;
    let limit = query_parsed(req, "limit")?.unwrap_or(DEFAULT_LIMIT);
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(audit::recent(&mut conn, limit).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("audit").get(recent)
}
