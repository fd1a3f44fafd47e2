#![expect(clippy::unwrap_used)]
//! Redemption issue and single-use verification.

use chrono::{Duration, Utc};
use seva_core::redemption::RedemptionSigner;
use seva_db::db::enums::{RedeemStatus, UserRole};
use seva_service::error::ServiceError;
use seva_service::redemption::{self, RedemptionPolicy};
use seva_service::reward::{self, RewardSpec};
use seva_service::rank;
use seva_test::{TestDb, account, grant_points};

fn policy() -> RedemptionPolicy {
    RedemptionPolicy::new(
        RedemptionSigner::new("integration-secret").unwrap(),
        Some(Duration::hours(24)),
    )
}

fn spec(title: &str, points_cost: i64, stock: Option<i32>) -> RewardSpec {
    RewardSpec {
        title: title.to_string(),
        description: None,
        points_cost,
        min_level: 1,
        require_join_badge: false,
        required_badges: Vec::new(),
        stock,
    }
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn codes_are_single_use() {
    let db = TestDb::new("redemption_single_use").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let leader = account(&mut conn, "Leader", UserRole::Leader).await.unwrap();
    let volunteer = account(&mut conn, "Gopal", UserRole::Volunteer).await.unwrap();
    grant_points(&mut conn, admin.id, volunteer.id, 120).await.unwrap();
    let tea = reward::create(&mut conn, admin.id, spec("Tea set", 50, Some(1)))
        .await
        .unwrap();
    let policy = policy();

    let issued = redemption::redeem(&mut conn, &policy, volunteer.id, tea.id, Utc::now())
        .await
        .unwrap();
    assert_eq!(issued.order.status, RedeemStatus::Pending);
    assert_eq!(issued.snapshot.total_points, 70);

    let first = redemption::verify(&mut conn, &policy, &issued.code, leader.id, Utc::now())
        .await
        .unwrap();
    assert!(first.newly_used);
    assert_eq!(first.order.status, RedeemStatus::Used);
    assert_eq!(first.order.used_by, Some(leader.id));

    let err = redemption::verify(&mut conn, &policy, &issued.code, leader.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { ref status, .. } if status == "used"));

    let snapshot = rank::summary(&mut conn, volunteer.id).await.unwrap().snapshot;
    assert_eq!(snapshot.total_points, 70);

    let err = redemption::redeem(&mut conn, &policy, volunteer.id, tea.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { entity: "reward", .. }));
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn concurrent_verification_uses_the_code_once() {
    let db = TestDb::new("redemption_race").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let volunteer = account(&mut conn, "Hari", UserRole::Volunteer).await.unwrap();
    grant_points(&mut conn, admin.id, volunteer.id, 40).await.unwrap();
    let pass = reward::create(&mut conn, admin.id, spec("Parking pass", 40, None))
        .await
        .unwrap();
    let policy = policy();
    let issued = redemption::redeem(&mut conn, &policy, volunteer.id, pass.id, Utc::now())
        .await
        .unwrap();

    let mut a = db.conn().await.unwrap();
    let mut b = db.conn().await.unwrap();
    let (left, right) = futures::future::join(
        redemption::verify(&mut a, &policy, &issued.code, admin.id, Utc::now()),
        redemption::verify(&mut b, &policy, &issued.code, admin.id, Utc::now()),
    )
    .await;

    let used = [&left, &right].iter().filter(|r| r.is_ok()).count();
    assert_eq!(used, 1);
    let loser = if left.is_ok() { right } else { left };
    assert!(matches!(loser, Err(ServiceError::Conflict { .. })));
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn refused_redemptions_change_nothing() {
    let db = TestDb::new("redemption_refused").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let volunteer = account(&mut conn, "Indu", UserRole::Volunteer).await.unwrap();
    grant_points(&mut conn, admin.id, volunteer.id, 30).await.unwrap();
    let policy = policy();

    let pricey = reward::create(&mut conn, admin.id, spec("Shawl", 80, Some(5)))
        .await
        .unwrap();
    let err = redemption::redeem(&mut conn, &policy, volunteer.id, pricey.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let mut gated = spec("Badge holder gift", 0, None);
    gated.require_join_badge = true;
    let gated = reward::create(&mut conn, admin.id, gated).await.unwrap();
    let err = redemption::redeem(&mut conn, &policy, volunteer.id, gated.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    assert!(redemption::list_orders(&mut conn, volunteer.id).await.unwrap().is_empty());
    let listing = reward::list_for_user(&mut conn, volunteer.id, false).await.unwrap();
    assert!(listing.iter().all(|l| !l.eligibility.can_redeem));
    let snapshot = rank::summary(&mut conn, volunteer.id).await.unwrap().snapshot;
    assert_eq!(snapshot.total_points, 30);

    let mut tampered = policy
        .signer()
        .issue(1, volunteer.id, policy.expiry(Utc::now()))
        .full_code;
    let last = tampered.pop().unwrap();
    tampered.push(if last == '0' { '1' } else { '0' });
    let err = redemption::verify(&mut conn, &policy, &tampered, admin.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidCode));
}
