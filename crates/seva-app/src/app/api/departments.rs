use chrono::Utc;
use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Deserialize;
use seva_db::model::department::Department;
use seva_service::auth::{Action, Resource};
use seva_service::department::{self, DepartmentSpec};

use super::context::{Caller, json_body, path_id};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    pub name: String,
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub display_order: i32,
}

impl From<DepartmentRequest> for DepartmentSpec {
    fn from(body: DepartmentRequest) -> Self {
        Self {
            name: body.name,
            parent_id: body.parent_id,
            display_order: body.display_order,
        }
    }
}

#[handler]
async fn list_departments(depot: &mut Depot) -> AppResult<Json<Vec<Department>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Department, Action::Read)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(department::list(&mut conn).await?))
}

#[handler]
async fn get_department(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Department>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Department, Action::Read)?;
    let id = path_id(req, "id")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(department::get(&mut conn, id).await?))
}

#[handler]
async fn create_department(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<Department>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Department, Action::Write)?;
    let body: DepartmentRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let created = department::create(&mut conn, caller.id(), body.into()).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(created))
}

#[handler]
async fn update_department(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Department>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Department, Action::Write)?;
    let id = path_id(req, "id")?;
    let body: DepartmentRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let updated = department::update(&mut conn, caller.id(), id, body.into(), Utc::now()).await?;
    Ok(Json(updated))
}

#[handler]
async fn delete_department(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Department, Action::Write)?;
    let id = path_id(req, "id")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    department::delete(&mut conn, caller.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("departments")
        .get(list_departments)
        .post(create_department)
        .push(
            Router::with_path("{id}")
                .get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
}
