use salvo::http::StatusCode;
use salvo::writing::{Json, Writer};
use salvo::{Depot, Request, Response, async_trait};
use serde::Serialize;
use seva_core::error::CoreError;
use seva_db::error::DbError;
use seva_service::error::ServiceError;
use thiserror::Error;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    DatabaseError(#[from] DbError),

    #[error(transparent)]
    CoreError(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

const fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::ValidationError(_) | CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoreError::ConfigError(_) | CoreError::InvariantViolation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn db_status(err: &DbError) -> StatusCode {
    match err {
        DbError::PoolError(_) => StatusCode::SERVICE_UNAVAILABLE,
        DbError::CoreError(e) => core_status(e),
        DbError::DatabaseError(_) | DbError::MigrationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(err) => match err {
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Conflict { .. } => StatusCode::CONFLICT,
                ServiceError::QuotaExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ServiceError::InvalidCode | ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
                ServiceError::Expired => StatusCode::GONE,
                ServiceError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::CoreError(e) => core_status(e),
                ServiceError::DatabaseError(e) => db_status(e),
                ServiceError::InvalidConfiguration(_)
                | ServiceError::InvariantViolation(_)
                | ServiceError::CasbinError(_)
                | ServiceError::DieselError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::DatabaseError(e) => db_status(e),
            Self::CoreError(e) => core_status(e),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Server-side failures are reported generically; their detail goes to
    /// the log only.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            StatusCode::SERVICE_UNAVAILABLE => "Database unavailable".to_string(),
            _ => self.to_string(),
        }
    }
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, %status, "Request failed");
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }
        res.status_code(status);
        res.render(Json(ErrorResponse {
            error: self.public_message(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn settlement_errors_map_to_statuses() {
        let cases = [
            (ServiceError::not_found("reward 9"), StatusCode::NOT_FOUND),
            (ServiceError::conflict("redemption order", "used"), StatusCode::CONFLICT),
            (
                ServiceError::QuotaExceeded {
                    quota: 1000,
                    approved: 800,
                    requested: 300,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ServiceError::InvalidCode, StatusCode::BAD_REQUEST),
            (ServiceError::Expired, StatusCode::GONE),
            (
                ServiceError::StoreUnavailable("pool timed out".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (ServiceError::NotAuthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("no".to_string()), StatusCode::FORBIDDEN),
            (
                ServiceError::InvariantViolation("broken"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test_log::test]
    fn core_validation_is_a_bad_request() {
        let err = AppError::from(ServiceError::from(CoreError::ValidationError(
            "shift end 09:00 must be after start 17:00".to_string(),
        )));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.public_message().contains("must be after"));
    }

    #[test_log::test]
    fn internal_detail_is_not_exposed() {
        let err = AppError::from(ServiceError::InvariantViolation("snapshot drift"));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test_log::test]
    fn conflict_message_names_status() {
        let err = AppError::from(ServiceError::conflict("bonus request", "rejected"));
        assert_eq!(err.public_message(), "Conflict: bonus request is rejected");
    }
}
