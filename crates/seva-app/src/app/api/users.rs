//! User management.

use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Router, handler};
use serde::Deserialize;
use seva_core::types::Role;
use seva_db::db::enums::UserStatus;
use seva_db::model::user::User;
use seva_service::auth::{Action, Resource};
use seva_service::user;

use super::context::{Caller, json_body, path_id};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// The caller's own account is checked against `profile`, anyone else's
/// against `user`.
fn require_self_or(caller: &Caller, depot: &Depot, target_id: i64, action: Action) -> AppResult<()> {
    if target_id == caller.id() {
        caller.require(depot, Resource::Profile, action)
    } else {
        caller.require(depot, Resource::User, action)
    }
}

/// `GET /users`
#[handler]
async fn list_users(depot: &mut Depot) -> AppResult<Json<Vec<User>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::User, Action::Read)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(user::list(&mut conn).await?))
}

/// `GET /users/{id}`
#[handler]
async fn get_user(req: &mut Request, depot: &mut Depot) -> AppResult<Json<User>> {
    let caller = Caller::from_depot(depot)?;
    let target_id = path_id(req, "id")?;
    require_self_or(&caller, depot, target_id, Action::Read)?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(user::get(&mut conn, target_id).await?))
}

/// `PUT /users/{id}/profile`
#[handler]
async fn update_profile(req: &mut Request, depot: &mut Depot) -> AppResult<Json<User>> {
    let caller = Caller::from_depot(depot)?;
    let target_id = path_id(req, "id")?;
    require_self_or(&caller, depot, target_id, Action::Write)?;
    let body: UpdateProfileRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let updated =
        user::update_profile(&mut conn, target_id, body.name.as_deref(), body.phone.as_deref()).await?;
    Ok(Json(updated))
}

/// `PUT /users/{id}/role`
///
/// ## Errors
/// 403 when changing one's own role, a higher-ranked account, or granting
/// above the caller's own role.
#[handler]
async fn update_role(req: &mut Request, depot: &mut Depot) -> AppResult<Json<User>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::User, Action::Write)?;
    let target_id = path_id(req, "id")?;
    let body: UpdateRoleRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(user::update_role(&mut conn, &caller.user, target_id, body.role).await?))
}

/// `PUT /users/{id}/status`
#[handler]
async fn update_status(req: &mut Request, depot: &mut Depot) -> AppResult<Json<User>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::User, Action::Write)?;
    let target_id = path_id(req, "id")?;
    let body: UpdateStatusRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(user::update_status(&mut conn, &caller.user, target_id, body.status).await?))
}

/// `PUT /users/{id}/password` - Administrative reset; no current password.
#[handler]
async fn reset_password(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::User, Action::Write)?;
    let target_id = path_id(req, "id")?;
    let body: ResetPasswordRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    user::change_password(&mut conn, target_id, None, body.new_password).await?;
    tracing::info!(target_id, reset_by = caller.id(), "Password reset");
    Ok(StatusCode::NO_CONTENT)
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("users").get(list_users).push(
        Router::with_path("{id}")
            .get(get_user)
            .push(Router::with_path("profile").put(update_profile))
            .push(Router::with_path("role").put(update_role))
            .push(Router::with_path("status").put(update_status))
            .push(Router::with_path("password").put(reset_password)),
    )
}

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn listing_requires_authentication() {
        let resp = TestClient::get("http://127.0.0.1:5800/users").send(routes()).await;

        assert_eq!(resp.status_code, Some(StatusCode::UNAUTHORIZED));
    }
}
