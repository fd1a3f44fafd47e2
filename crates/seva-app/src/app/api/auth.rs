//! Registration, credential check and password change.

use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::Deserialize;
use seva_db::model::user::User;
use seva_service::user::{self, Registration};

use super::context::{Caller, json_body};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// ## Summary
/// `POST /auth/register` - Creates a volunteer account. Open to public requests.
///
/// ## Errors
/// 400 for invalid input, 409 when the email is taken.
#[handler]
async fn register(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<Json<User>> {
    let body: RegisterRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let created = user::register(
        &mut conn,
        Registration {
            name: body.name,
            email: body.email,
            password: body.password,
            phone: body.phone,
        },
    )
    .await?;

    res.status_code(StatusCode::CREATED);
    Ok(Json(created))
}

/// ## Summary
/// `POST /auth/login` - Checks an email or volunteer code with a password and
/// returns the profile. Sessions are not issued; clients keep sending
/// credentials through the configured auth method.
///
/// ## Errors
/// 401 for unknown users, inactive accounts and wrong passwords alike.
#[handler]
async fn login(req: &mut Request, depot: &mut Depot) -> AppResult<Json<User>> {
    let body: LoginRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let user = user::login(&mut conn, &body.identifier, &body.password).await?;
    Ok(Json(user))
}

/// ## Summary
/// `PUT /auth/password` - Changes the caller's own password.
///
/// ## Errors
/// 401 when unauthenticated or the current password is wrong.
#[handler]
async fn change_password(req: &mut Request, depot: &mut Depot) -> AppResult<StatusCode> {
    let caller = Caller::from_depot(depot)?;
    let body: ChangePasswordRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    user::change_password(
        &mut conn,
        caller.id(),
        Some(body.current_password),
        body.new_password,
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("auth")
        .push(Router::with_path("register").post(register))
        .push(Router::with_path("login").post(login))
        .push(Router::with_path("password").put(change_password))
}

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn malformed_body_is_a_bad_request() {
        let resp = TestClient::post("http://127.0.0.1:5800/auth/register")
            .raw_json("{not json")
            .send(routes())
            .await;

        assert_eq!(resp.status_code, Some(StatusCode::BAD_REQUEST));
    }

    #[test_log::test(tokio::test)]
    async fn password_change_needs_a_user() {
        let resp = TestClient::put("http://127.0.0.1:5800/auth/password")
            .json(&serde_json::json!({"current_password": "a", "new_password": "bbbbbb"}))
            .send(routes())
            .await;

        assert_eq!(resp.status_code, Some(StatusCode::UNAUTHORIZED));
    }
}
