use std::sync::Arc;

use casbin::{CoreApi, MgmtApi};
use salvo::async_trait;
use seva_core::types::Role;

use super::{Action, Resource};
use crate::error::{ServiceError, ServiceResult};

/// Grants per role. Each role also inherits everything granted to the role
/// below it (see [`Role::inherits`]).
pub const ROLE_POLICIES: &[(Role, Resource, Action)] = &[
    (Role::Volunteer, Resource::Profile, Action::Read),
    (Role::Volunteer, Resource::Profile, Action::Write),
    (Role::Volunteer, Resource::Points, Action::Read),
    (Role::Volunteer, Resource::Badge, Action::Read),
    (Role::Volunteer, Resource::Reward, Action::Read),
    (Role::Volunteer, Resource::Redemption, Action::Read),
    (Role::Volunteer, Resource::Redemption, Action::Write),
    (Role::Volunteer, Resource::Engagement, Action::Read),
    (Role::Volunteer, Resource::Schedule, Action::Read),
    (Role::Volunteer, Resource::Department, Action::Read),
    (Role::Leader, Resource::Attendance, Action::Read),
    (Role::Leader, Resource::Attendance, Action::Write),
    (Role::Leader, Resource::Redemption, Action::Approve),
    (Role::Manager, Resource::User, Action::Read),
    (Role::Manager, Resource::Department, Action::Write),
    (Role::Manager, Resource::Schedule, Action::Write),
    (Role::Manager, Resource::Points, Action::ReadAny),
    (Role::Manager, Resource::Badge, Action::ReadAny),
    (Role::Manager, Resource::Engagement, Action::ReadAny),
    (Role::Manager, Resource::Engagement, Action::Write),
    (Role::Manager, Resource::Quota, Action::Read),
    (Role::Manager, Resource::Bonus, Action::Read),
    (Role::Manager, Resource::Bonus, Action::Write),
    (Role::Admin, Resource::User, Action::Write),
    (Role::Admin, Resource::Points, Action::Write),
    (Role::Admin, Resource::Badge, Action::Write),
    (Role::Admin, Resource::Reward, Action::Write),
    (Role::Admin, Resource::Quota, Action::Write),
    (Role::Admin, Resource::Bonus, Action::Approve),
    (Role::Admin, Resource::Audit, Action::Read),
];

/// ## Summary
/// Builds a Casbin enforcer from the embedded model with the role hierarchy
/// and [`ROLE_POLICIES`] loaded into an in-memory adapter.
///
/// ## Errors
/// Returns an error if the model fails to parse or policies cannot be added.
#[tracing::instrument]
pub async fn init_casbin() -> ServiceResult<casbin::Enforcer> {
    tracing::debug!("Initializing Casbin enforcer");

    let model = casbin::DefaultModel::from_str(include_str!("casbin_model.conf")).await?;
    tracing::debug!("Casbin model loaded");

    let adapter = casbin::MemoryAdapter::default();
    let mut enforcer = casbin::Enforcer::new(model, adapter).await?;

    let grouping: Vec<Vec<String>> = Role::ALL
        .iter()
        .filter_map(|role| {
            role.inherits()
                .map(|parent| vec![role.as_str().to_string(), parent.as_str().to_string()])
        })
        .collect();
    enforcer.add_grouping_policies(grouping).await?;

    let policies: Vec<Vec<String>> = ROLE_POLICIES
        .iter()
        .map(|(role, resource, action)| {
            vec![
                role.as_str().to_string(),
                resource.as_casbin_object().to_string(),
                action.as_casbin_action().to_string(),
            ]
        })
        .collect();
    enforcer.add_policies(policies).await?;

    tracing::info!(
        policy_count = enforcer.get_policy().len(),
        grouping_count = enforcer.get_grouping_policy().len(),
        "Casbin enforcer initialized successfully"
    );
    Ok(enforcer)
}

pub struct CasbinEnforcerHandler {
    pub enforcer: Arc<casbin::Enforcer>,
}

#[async_trait]
impl salvo::Handler for CasbinEnforcerHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.enforcer.clone());
    }
}

/// ## Summary
/// Retrieves the Casbin enforcer from the depot.
///
/// ## Errors
/// Returns an error if the Casbin enforcer is not found in the depot.
pub fn get_enforcer_from_depot(depot: &salvo::Depot) -> ServiceResult<Arc<casbin::Enforcer>> {
    depot
        .obtain::<Arc<casbin::Enforcer>>()
        .cloned()
        .map_err(|_err| ServiceError::InvariantViolation("Casbin enforcer not found in depot"))
}
