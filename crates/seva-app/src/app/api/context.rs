//! Request plumbing shared by the API handlers.

use std::str::FromStr;

use salvo::{Depot, Request};
use serde::de::DeserializeOwned;
use seva_core::types::Role;
use seva_db::model::user::User;
use seva_service::auth::{Action, Resource, authorizer_from_depot, get_user_from_depot};

use crate::error::{AppError, AppResult};

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub role: Role,
}

impl Caller {
    /// ## Errors
    /// Returns `NotAuthenticated` for public requests.
    pub fn from_depot(depot: &Depot) -> AppResult<Self> {
        let user = get_user_from_depot(depot)?.clone();
        let role = user.role.into();
        Ok(Self { user, role })
    }

    #[must_use]
    pub const fn id(&self) -> i64 {
        self.user.id
    }

    /// ## Errors
    /// Returns `Forbidden` when the caller's role lacks the permission.
    pub fn require(&self, depot: &Depot, resource: Resource, action: Action) -> AppResult<()> {
        authorizer_from_depot(depot)?.require(self.role, resource, action)?;
        Ok(())
    }

    /// ## Summary
    /// Resolves whose data a read targets. The caller's own data needs
    /// `read`; anyone else's needs `read_any`.
    ///
    /// ## Errors
    /// Returns `Forbidden` when the required permission is missing.
    pub fn subject(&self, depot: &Depot, requested: Option<i64>, resource: Resource) -> AppResult<i64> {
        match requested {
            Some(user_id) if user_id != self.id() => {
                self.require(depot, resource, Action::ReadAny)?;
                Ok(user_id)
            }
            _ => {
                self.require(depot, resource, Action::Read)?;
                Ok(self.id())
            }
        }
    }
}

/// ## Errors
/// Returns `BadRequest` when the path segment is missing or not a number.
pub fn path_id(req: &Request, name: &str) -> AppResult<i64> {
    req.param::<i64>(name)
        .ok_or_else(|| AppError::BadRequest(format!("invalid path parameter '{name}'")))
}

/// ## Errors
/// Returns `BadRequest` when the value is present but does not parse.
pub fn query_parsed<T: FromStr>(req: &Request, name: &str) -> AppResult<Option<T>> {
    req.query::<String>(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_err| AppError::BadRequest(format!("invalid query parameter '{name}'")))
        })
        .transpose()
}

/// ## Errors
/// Returns `BadRequest` when the value is missing or does not parse.
pub fn query_required<T: FromStr>(req: &Request, name: &str) -> AppResult<T> {
    query_parsed(req, name)?
        .ok_or_else(|| AppError::BadRequest(format!("missing query parameter '{name}'")))
}

/// ## Errors
/// Returns `BadRequest` when the body is not valid JSON for `T`.
pub async fn json_body<T: DeserializeOwned>(req: &mut Request) -> AppResult<T> {
    req.parse_json::<T>()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))
}
