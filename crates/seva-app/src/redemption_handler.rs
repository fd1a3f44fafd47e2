use std::sync::Arc;

use salvo::async_trait;
use seva_core::error::CoreError;
use seva_service::redemption::RedemptionPolicy;

use crate::error::AppResult;

/// Injects the code signing policy built at startup.
pub struct RedemptionPolicyHandler {
    pub policy: Arc<RedemptionPolicy>,
}

#[async_trait]
impl salvo::Handler for RedemptionPolicyHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.policy));
    }
}

/// ## Errors
/// Returns an error if the policy is not found in the depot.
pub fn get_policy_from_depot(depot: &salvo::Depot) -> AppResult<Arc<RedemptionPolicy>> {
    depot
        .obtain::<Arc<RedemptionPolicy>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Redemption policy not found in depot").into())
}
