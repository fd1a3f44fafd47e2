use salvo::Depot;
use salvo::http::StatusCode;
use salvo::writing::Json;
use tracing::error;

use crate::error::ErrorResponse;
use crate::{config::get_config_from_depot, db_handler::get_db_from_depot};
use seva_service::auth::{DepotUser, authenticate::authenticate, depot::depot_keys};
use seva_service::error::ServiceError;

fn abort(res: &mut salvo::Response, ctrl: &mut salvo::FlowCtrl, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(ErrorResponse {
        error: message.to_string(),
    }));
    ctrl.skip_rest();
}

/// ## Summary
/// Authenticates the request and stores the result in the depot.
/// Requests that carry no valid credentials continue as [`DepotUser::Public`];
/// handlers that need a user answer 401 themselves.
///
/// ## Side Effects
/// Inserts a [`DepotUser`] under [`depot_keys::AUTHENTICATED_USER`].
///
/// ## Errors
/// Responds 503 when no connection can be obtained and 500 for
/// unexpected authentication failures.
#[salvo::async_trait]
impl salvo::Handler for AuthMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        tracing::trace!("Authenticating request");

        if req.method() == salvo::http::Method::OPTIONS {
            depot.insert(depot_keys::AUTHENTICATED_USER, DepotUser::Public);
            return;
        }

        let config = match get_config_from_depot(depot) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(error = ?e, "Failed to get config from depot");
                abort(res, ctrl, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                return;
            }
        };

        let provider = match get_db_from_depot(depot) {
            Ok(p) => p,
            Err(e) => {
                error!(error = ?e, "Failed to get database provider from depot");
                abort(res, ctrl, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                return;
            }
        };

        let mut conn = match provider.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!(error = ?e, "Failed to get database connection");
                abort(res, ctrl, StatusCode::SERVICE_UNAVAILABLE, "Database unavailable");
                return;
            }
        };

        match authenticate(req, &mut conn, &config).await {
            Ok(user) => {
                tracing::debug!(user_id = user.id, "User authenticated");
                depot.insert(depot_keys::AUTHENTICATED_USER, DepotUser::User(user));
            }
            Err(ServiceError::NotAuthenticated | ServiceError::InvalidConfiguration(_)) => {
                tracing::debug!("Request not authenticated, treating as public");
                depot.insert(depot_keys::AUTHENTICATED_USER, DepotUser::Public);
            }
            Err(ServiceError::StoreUnavailable(e)) => {
                error!(error = %e, "Store unavailable during authentication");
                abort(res, ctrl, StatusCode::SERVICE_UNAVAILABLE, "Database unavailable");
            }
            Err(service_err) => {
                error!(error = ?service_err, "Authentication failed with error");
                abort(res, ctrl, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        }
    }
}

/// ## Summary
/// Middleware handler for authentication.
pub struct AuthMiddleware;

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;
    use salvo::{Router, handler};

    use super::*;

    #[handler]
    async fn ok() -> &'static str {
        "ok"
    }

    #[test_log::test(tokio::test)]
    async fn missing_config_is_an_internal_error() {
        let service = Router::new().hoop(AuthMiddleware).push(Router::with_path("ping").get(ok));

        let content = TestClient::get("http://127.0.0.1:5800/ping").send(service).await;

        assert_eq!(content.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test_log::test(tokio::test)]
    async fn preflight_passes_as_public() {
        let service = Router::new()
            .hoop(AuthMiddleware)
            .push(Router::with_path("ping").options(ok));

        let content = TestClient::options("http://127.0.0.1:5800/ping").send(service).await;

        assert_eq!(content.status_code, Some(StatusCode::OK));
    }
}
