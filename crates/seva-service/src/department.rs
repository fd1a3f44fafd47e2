//! Department CRUD. `parent_id` is stored as given; no tree is rendered.

use chrono::{DateTime, Utc};
use seva_db::db::connection::DbConnection;
use seva_db::db::query;
use seva_db::model::department::{Department, NewDepartment};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::error::{ServiceError, ServiceResult};

pub const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct DepartmentSpec {
    pub name: String,
    pub parent_id: Option<i64>,
    pub display_order: i32,
}

impl DepartmentSpec {
    fn validate(&self, id: Option<i64>) -> ServiceResult<()> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(ServiceError::Validation(format!(
                "department name must be 1 to {MAX_NAME_LEN} characters"
            )));
        }
        if id.is_some() && self.parent_id == id {
            return Err(ServiceError::Validation(
                "a department cannot be its own parent".to_string(),
            ));
        }
        Ok(())
    }

    fn row(&self) -> NewDepartment<'_> {
        NewDepartment {
            name: self.name.trim(),
            parent_id: self.parent_id,
            display_order: self.display_order,
        }
    }
}

async fn require_parent(conn: &mut DbConnection<'_>, parent_id: Option<i64>) -> ServiceResult<()> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    if query::department::find(conn, parent_id).await?.is_none() {
        return Err(ServiceError::not_found(format!("parent department {parent_id}")));
    }
    Ok(())
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list(conn: &mut DbConnection<'_>) -> ServiceResult<Vec<Department>> {
    Ok(query::department::list(conn).await?)
}

/// ## Errors
/// Returns `NotFound` for an unknown department.
pub async fn get(conn: &mut DbConnection<'_>, id: i64) -> ServiceResult<Department> {
    query::department::find(conn, id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("department {id}")))
}

/// ## Errors
/// Returns `Validation` for a bad name, `NotFound` for an unknown parent.
#[tracing::instrument(skip(conn, spec), fields(name = %spec.name))]
pub async fn create(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    spec: DepartmentSpec,
) -> ServiceResult<Department> {
    spec.validate(None)?;
    require_parent(conn, spec.parent_id).await?;

    let department = query::department::insert(conn, &spec.row()).await?;
    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::DepartmentCreate).target("department", department.id),
    )
    .await;
    Ok(department)
}

/// ## Errors
/// Returns `Validation` for a bad name or self-parenting, `NotFound` for an
/// unknown department or parent.
#[tracing::instrument(skip(conn, spec))]
pub async fn update(
    conn: &mut DbConnection<'_>,
    actor_id: i64,
    id: i64,
    spec: DepartmentSpec,
    now: DateTime<Utc>,
) -> ServiceResult<Department> {
    spec.validate(Some(id))?;
    require_parent(conn, spec.parent_id).await?;

    let department = query::department::update(conn, id, &spec.row(), now)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("department {id}")))?;
    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::DepartmentUpdate).target("department", id),
    )
    .await;
    Ok(department)
}

/// ## Errors
/// Returns `NotFound` for an unknown department and `Conflict` while ledger
/// rows, engagements or bonus requests still reference it.
#[tracing::instrument(skip(conn))]
pub async fn delete(conn: &mut DbConnection<'_>, actor_id: i64, id: i64) -> ServiceResult<()> {
    let deleted = query::department::delete(conn, id).await.map_err(|e| match e {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _,
        ) => ServiceError::conflict("department", "still referenced"),
        other => other.into(),
    })?;
    if deleted == 0 {
        return Err(ServiceError::not_found(format!("department {id}")));
    }

    audit::record(
        conn,
        AuditEvent::new(actor_id, AuditAction::DepartmentDelete).target("department", id),
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, parent_id: Option<i64>) -> DepartmentSpec {
        DepartmentSpec {
            name: name.to_string(),
            parent_id,
            display_order: 0,
        }
    }

    #[test_log::test]
    fn names_are_trimmed_and_bounded() {
        assert!(spec("  Kitchen ", None).validate(None).is_ok());
        assert_eq!(spec("  Kitchen ", None).row().name, "Kitchen");
        assert!(spec("   ", None).validate(None).is_err());
        assert!(spec(&"x".repeat(MAX_NAME_LEN + 1), None).validate(None).is_err());
    }

    #[test_log::test]
    fn department_cannot_parent_itself() {
        assert!(spec("Hall", Some(4)).validate(Some(4)).is_err());
        assert!(spec("Hall", Some(3)).validate(Some(4)).is_ok());
    }
}
