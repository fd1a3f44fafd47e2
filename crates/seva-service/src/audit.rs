//! Best-effort audit trail.
//!
//! Entries are written after the primary transaction commits. A failed write
//! is logged and swallowed; it never fails the operation it describes.

use seva_db::db::connection::DbConnection;
use seva_db::db::query;
use seva_db::model::audit::{AuditLogEntry, NewAuditLogEntry};

use crate::error::ServiceResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserLogin,
    UserRegister,
    UserRoleChange,
    UserStatusChange,
    PasswordChange,
    EngagementUpdate,
    ScheduleCreate,
    AttendanceConfirm,
    ManualAdjustment,
    BadgeGrant,
    BadgeRevoke,
    BonusRequestCreate,
    BonusRequestApprove,
    BonusRequestReject,
    QuotaSet,
    RewardCreate,
    RedemptionCreate,
    RedemptionVerify,
    DepartmentCreate,
    DepartmentUpdate,
    DepartmentDelete,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserLogin => "user_login",
            Self::UserRegister => "user_register",
            Self::UserRoleChange => "user_role_change",
            Self::UserStatusChange => "user_status_change",
            Self::PasswordChange => "password_change",
            Self::EngagementUpdate => "engagement_update",
            Self::ScheduleCreate => "schedule_create",
            Self::AttendanceConfirm => "attendance_confirm",
            Self::ManualAdjustment => "manual_adjustment",
            Self::BadgeGrant => "badge_grant",
            Self::BadgeRevoke => "badge_revoke",
            Self::BonusRequestCreate => "bonus_request_create",
            Self::BonusRequestApprove => "bonus_request_approve",
            Self::BonusRequestReject => "bonus_request_reject",
            Self::QuotaSet => "quota_set",
            Self::RewardCreate => "reward_create",
            Self::RedemptionCreate => "redemption_create",
            Self::RedemptionVerify => "redemption_verify",
            Self::DepartmentCreate => "department_create",
            Self::DepartmentUpdate => "department_update",
            Self::DepartmentDelete => "department_delete",
        }
    }
}

/// One audit row, described before it is written.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor_user_id: Option<i64>,
    pub action: AuditAction,
    pub target: Option<(&'static str, i64)>,
    pub detail: Option<serde_json::Value>,
}

impl AuditEvent {
    #[must_use]
    pub const fn new(actor_user_id: i64, action: AuditAction) -> Self {
        Self {
            actor_user_id: Some(actor_user_id),
            action,
            target: None,
            detail: None,
        }
    }

    #[must_use]
    pub const fn target(mut self, table: &'static str, id: i64) -> Self {
        self.target = Some((table, id));
        self
    }

    #[must_use]
    pub fn detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// ## Summary
/// Writes an audit row, logging instead of failing.
///
/// ## Side Effects
/// Inserts into `audit_log` on success; emits a `warn` event on failure.
#[tracing::instrument(skip(conn, event), fields(action = event.action.as_str()))]
pub async fn record(conn: &mut DbConnection<'_>, event: AuditEvent) {
    let (target_table, target_id) = event
        .target
        .map_or((None, None), |(table, id)| (Some(table), Some(id)));
    let row = NewAuditLogEntry {
        actor_user_id: event.actor_user_id,
        action: event.action.as_str(),
        target_table,
        target_id,
        detail: event.detail,
    };

    if let Err(err) = query::audit::insert(conn, &row).await {
        tracing::warn!(error = %err, "Failed to write audit log entry");
    }
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn recent(conn: &mut DbConnection<'_>, limit: i64) -> ServiceResult<Vec<AuditLogEntry>> {
    Ok(query::audit::recent(conn, limit.clamp(1, 500)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn builder_sets_target_and_detail() {
        let event = AuditEvent::new(7, AuditAction::UserRoleChange)
            .target("app_user", 9)
            .detail(serde_json::json!({ "oldRole": "volunteer", "newRole": "leader" }));

        assert_eq!(event.actor_user_id, Some(7));
        assert_eq!(event.target, Some(("app_user", 9)));
        assert_eq!(event.action.as_str(), "user_role_change");
        assert_eq!(
            event.detail.as_ref().and_then(|d| d.get("newRole")),
            Some(&serde_json::json!("leader"))
        );
    }
}
