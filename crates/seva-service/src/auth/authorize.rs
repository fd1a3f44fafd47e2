//! Role-based authorization over the Casbin enforcer.
//!
//! Handlers call [`Authorizer::require`] before invoking a service operation;
//! the services themselves stay authorization-free.

use std::sync::Arc;

use casbin::CoreApi;
use seva_core::types::Role;

use super::{Action, Resource};
use crate::error::{ServiceError, ServiceResult};

/// Result of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthzResult {
    Allowed,
    Denied,
}

impl AuthzResult {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// ## Errors
    /// Returns `Forbidden` if access is denied.
    pub fn require(self, resource: Resource, action: Action) -> ServiceResult<()> {
        match self {
            Self::Allowed => Ok(()),
            Self::Denied => Err(ServiceError::Forbidden(format!(
                "{action} on {resource} is not permitted"
            ))),
        }
    }
}

pub struct Authorizer {
    enforcer: Arc<casbin::Enforcer>,
}

impl Authorizer {
    #[must_use]
    pub fn new(enforcer: Arc<casbin::Enforcer>) -> Self {
        Self { enforcer }
    }

    /// ## Errors
    /// Returns `CasbinError` if Casbin evaluation fails.
    pub fn check(
        &self,
        role: Role,
        resource: Resource,
        action: Action,
    ) -> ServiceResult<AuthzResult> {
        let allowed = self
            .enforcer
            .enforce((
                role.as_str(),
                resource.as_casbin_object(),
                action.as_casbin_action(),
            ))
            .map_err(ServiceError::CasbinError)?;

        tracing::debug!(
            role = %role,
            resource = %resource,
            action = %action,
            allowed,
            "Authorization check"
        );

        Ok(if allowed {
            AuthzResult::Allowed
        } else {
            AuthzResult::Denied
        })
    }

    /// ## Errors
    /// - Returns `Forbidden` if access is denied.
    /// - Returns `CasbinError` if Casbin evaluation fails.
    pub fn require(&self, role: Role, resource: Resource, action: Action) -> ServiceResult<()> {
        self.check(role, resource, action)?.require(resource, action)
    }
}

/// Create an authorizer from the depot.
///
/// ## Errors
///
/// Returns `InvariantViolation` if the Casbin enforcer is not in the depot.
pub fn authorizer_from_depot(depot: &salvo::Depot) -> ServiceResult<Authorizer> {
    let enforcer = super::casbin::get_enforcer_from_depot(depot)?;
    Ok(Authorizer::new(enforcer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn authz_result_require() {
        assert!(
            AuthzResult::Allowed
                .require(Resource::Bonus, Action::Approve)
                .is_ok()
        );
        let denied = AuthzResult::Denied.require(Resource::Bonus, Action::Approve);
        assert!(matches!(denied, Err(ServiceError::Forbidden(msg)) if msg == "approve on bonus is not permitted"));
    }

    #[test_log::test(tokio::test)]
    async fn authorizer_uses_role_hierarchy() {
        let enforcer = super::super::casbin::init_casbin()
            .await
            .expect("Failed to create enforcer");
        let authz = Authorizer::new(Arc::new(enforcer));

        let leader = authz
            .check(Role::Leader, Resource::Redemption, Action::Approve)
            .expect("casbin evaluation");
        assert!(leader.is_allowed());

        assert!(authz.require(Role::SuperAdmin, Resource::Audit, Action::Read).is_ok());
        assert!(matches!(
            authz.require(Role::Manager, Resource::Audit, Action::Read),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
