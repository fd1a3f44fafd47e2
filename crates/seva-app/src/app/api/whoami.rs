use salvo::prelude::Json;
use salvo::{Depot, Router, handler};
use serde_json::json;

use seva_service::auth::{DepotUser, depot::depot_keys};

/// ## Summary
/// Returns the authenticated user as JSON, or a public marker.
#[handler]
async fn whoami(depot: &Depot) -> Json<serde_json::Value> {
    match depot.get::<DepotUser>(depot_keys::AUTHENTICATED_USER) {
        Ok(DepotUser::User(user)) => Json(serde_json::to_value(user).unwrap_or(json!(null))),
        Ok(DepotUser::Public) | Err(_) => Json(json!({"status": "public"})),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("whoami").get(whoami)
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};

    use super::*;

    #[test_log::test(tokio::test)]
    async fn public_without_a_user() {
        let mut resp = TestClient::get("http://127.0.0.1:5800/whoami")
            .send(routes())
            .await;

        let body: serde_json::Value = resp.take_json().await.unwrap();
        assert_eq!(body, json!({"status": "public"}));
    }
}
