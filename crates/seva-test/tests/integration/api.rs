#![expect(clippy::unwrap_used)]
//! Requests through the full router with proxy authentication.

use std::sync::Arc;

use salvo::http::StatusCode;
use salvo::prelude::*;
use salvo::test::{ResponseExt, TestClient};
use seva_app::config::ConfigHandler;
use seva_app::db_handler::DbProviderHandler;
use seva_app::redemption_handler::RedemptionPolicyHandler;
use seva_core::config::{
    AuthConfig, AuthMethod, BadgeSweepConfig, DatabaseConfig, LoggingConfig, RedemptionConfig,
    ServerConfig, Settings,
};
use seva_db::db::enums::UserRole;
use seva_service::auth::casbin::{CasbinEnforcerHandler, init_casbin};
use seva_service::redemption::RedemptionPolicy;
use seva_test::{TestDb, account};

const BASE: &str = "http://127.0.0.1:5800/api/app";
const IDENTITY_HEADER: &str = "X-Remote-Email";

fn settings(url: &str) -> Settings {
    Settings {
        database: DatabaseConfig {
            url: url.to_string(),
            max_connections: 4,
        },
        auth: AuthConfig {
            method: AuthMethod::Proxy,
            proxy: None,
            single_user: None,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5800,
            serve_origin: None,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        redemption: RedemptionConfig {
            hmac_secret: "api-secret".to_string(),
            code_ttl_hours: Some(24),
        },
        badges: BadgeSweepConfig::default(),
    }
}

async fn service(db: &TestDb) -> Service {
    let settings = settings(&db.url);
    let policy = RedemptionPolicy::from_config(&settings.redemption).unwrap();
    let enforcer = init_casbin().await.unwrap();

    let router = Router::new()
        .hoop(DbProviderHandler {
            provider: db.pool.clone(),
        })
        .hoop(ConfigHandler { settings })
        .hoop(CasbinEnforcerHandler {
            enforcer: Arc::new(enforcer),
        })
        .hoop(RedemptionPolicyHandler {
            policy: Arc::new(policy),
        })
        .push(seva_app::app::api::routes());
    Service::new(router)
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn roles_gate_settlement_routes() {
    let db = TestDb::new("api_roles").await.unwrap();
    let (admin, volunteer) = {
        let mut conn = db.conn().await.unwrap();
        let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
        let volunteer = account(&mut conn, "Uma", UserRole::Volunteer).await.unwrap();
        (admin, volunteer)
    };
    let service = service(&db).await;

    let resp = TestClient::get(format!("{BASE}/points/summary"))
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::UNAUTHORIZED));

    let mut resp = TestClient::post(format!("{BASE}/points/adjustments"))
        .add_header(IDENTITY_HEADER, &admin.email, true)
        .json(&serde_json::json!({"user_id": volunteer.id, "points_delta": 150}))
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::CREATED));
    let body: serde_json::Value = resp.take_json().await.unwrap();
    assert_eq!(body["snapshot"]["total_points"], 150);
    assert_eq!(body["snapshot"]["rank_level"], 2);

    let mut resp = TestClient::get(format!("{BASE}/points/summary"))
        .add_header(IDENTITY_HEADER, &volunteer.email, true)
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::OK));
    let body: serde_json::Value = resp.take_json().await.unwrap();
    assert_eq!(body["user_id"], volunteer.id);

    let resp = TestClient::get(format!("{BASE}/points/summary?user_id={}", admin.id))
        .add_header(IDENTITY_HEADER, &volunteer.email, true)
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::FORBIDDEN));

    let resp = TestClient::post(format!("{BASE}/points/adjustments"))
        .add_header(IDENTITY_HEADER, &volunteer.email, true)
        .json(&serde_json::json!({"user_id": volunteer.id, "points_delta": 1000}))
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::FORBIDDEN));

    let resp = TestClient::get(format!("{BASE}/audit"))
        .add_header(IDENTITY_HEADER, &admin.email, true)
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::OK));
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn redemption_round_trip_over_http() {
    let db = TestDb::new("api_redemption").await.unwrap();
    let (admin, leader, volunteer) = {
        let mut conn = db.conn().await.unwrap();
        let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
        let leader = account(&mut conn, "Leader", UserRole::Leader).await.unwrap();
        let volunteer = account(&mut conn, "Vani", UserRole::Volunteer).await.unwrap();
        seva_test::grant_points(&mut conn, admin.id, volunteer.id, 60).await.unwrap();
        (admin, leader, volunteer)
    };
    let service = service(&db).await;

    let mut resp = TestClient::post(format!("{BASE}/rewards"))
        .add_header(IDENTITY_HEADER, &admin.email, true)
        .json(&serde_json::json!({"title": "Prasad box", "points_cost": 25, "stock": 3}))
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::CREATED));
    let reward: serde_json::Value = resp.take_json().await.unwrap();

    let mut resp = TestClient::post(format!("{BASE}/redemptions"))
        .add_header(IDENTITY_HEADER, &volunteer.email, true)
        .json(&serde_json::json!({"reward_id": reward["id"]}))
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::CREATED));
    let issued: serde_json::Value = resp.take_json().await.unwrap();
    let code = issued["code"].as_str().unwrap().to_string();
    assert_eq!(issued["snapshot"]["total_points"], 35);

    let resp = TestClient::post(format!("{BASE}/redemptions/verify"))
        .add_header(IDENTITY_HEADER, &volunteer.email, true)
        .json(&serde_json::json!({"code": code}))
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::FORBIDDEN));

    let resp = TestClient::post(format!("{BASE}/redemptions/verify"))
        .add_header(IDENTITY_HEADER, &leader.email, true)
        .json(&serde_json::json!({"code": code}))
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::OK));

    let resp = TestClient::post(format!("{BASE}/redemptions/verify"))
        .add_header(IDENTITY_HEADER, &leader.email, true)
        .json(&serde_json::json!({"code": code}))
        .send(&service)
        .await;
    assert_eq!(resp.status_code, Some(StatusCode::CONFLICT));
}
