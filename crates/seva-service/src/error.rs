use diesel::result::{DatabaseErrorKind, Error as DieselError};
use seva_db::error::DbError;
use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {entity} is {status}")]
    Conflict { entity: &'static str, status: String },

    #[error("Quota exceeded: {approved} approved + {requested} requested > {quota}")]
    QuotaExceeded {
        quota: i64,
        approved: i64,
        requested: i64,
    },

    #[error("Invalid redemption code")]
    InvalidCode,

    #[error("Redemption code expired")]
    Expired,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("Casbin error: {0}")]
    CasbinError(#[from] casbin::Error),

    #[error("Diesel error: {0}")]
    DieselError(DieselError),

    #[error(transparent)]
    DatabaseError(DbError),

    #[error(transparent)]
    CoreError(#[from] seva_core::error::CoreError),
}

impl ServiceError {
    #[must_use]
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    #[must_use]
    pub fn conflict(entity: &'static str, status: impl std::fmt::Display) -> Self {
        Self::Conflict {
            entity,
            status: status.to_string(),
        }
    }
}

impl From<seva_core::quota::QuotaOverrun> for ServiceError {
    fn from(overrun: seva_core::quota::QuotaOverrun) -> Self {
        Self::QuotaExceeded {
            quota: overrun.quota,
            approved: overrun.approved,
            requested: overrun.requested,
        }
    }
}

impl From<DieselError> for ServiceError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
                Self::StoreUnavailable(info.message().to_string())
            }
            DieselError::BrokenTransactionManager => {
                Self::StoreUnavailable("transaction manager is broken".to_string())
            }
            other => Self::DieselError(other),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::PoolError(e) => Self::StoreUnavailable(e.to_string()),
            DbError::DatabaseError(e) => e.into(),
            DbError::CoreError(e) => Self::CoreError(e),
            other @ DbError::MigrationError(_) => Self::DatabaseError(other),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Maps a unique-constraint violation to `Conflict`, anything else through
/// the usual conversion.
#[must_use]
pub fn conflict_on_unique(err: DieselError, entity: &'static str, status: &str) -> ServiceError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            ServiceError::conflict(entity, status)
        }
        other => other.into(),
    }
}
