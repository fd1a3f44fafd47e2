mod audit;
mod auth;
mod badges;
mod bonus;
mod context;
mod departments;
mod engagements;
mod healthcheck;
mod points;
mod quotas;
mod redemptions;
mod rewards;
mod schedules;
mod users;
mod whoami;

use salvo::Router;

use crate::middleware::auth::AuthMiddleware;

pub use seva_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, APP_ROUTE_COMPONENT, APP_ROUTE_PREFIX,
};

/// ## Summary
/// Constructs the API router. Every route sits behind [`AuthMiddleware`];
/// handlers decide for themselves whether an anonymous caller is enough.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .hoop(AuthMiddleware)
        .push(
            Router::with_path(APP_ROUTE_COMPONENT)
                .push(healthcheck::routes())
                .push(whoami::routes())
                .push(auth::routes())
                .push(users::routes())
                .push(departments::routes())
                .push(schedules::routes())
                .push(points::routes())
                .push(badges::routes())
                .push(rewards::routes())
                .push(redemptions::routes())
                .push(quotas::routes())
                .push(bonus::routes())
                .push(engagements::routes())
                .push(audit::routes()),
        )
}
