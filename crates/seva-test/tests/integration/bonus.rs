#![expect(clippy::unwrap_used)]
//! Quota enforcement across bonus request creation and approval.

use chrono::Utc;
use seva_core::quota::YearMonth;
use seva_db::db::enums::{BonusStatus, UserRole};
use seva_service::bonus::{self, NewBonus};
use seva_service::error::ServiceError;
use seva_service::rank;
use seva_test::{TestDb, account, department};

fn request(department_id: i64, user_id: i64, points: i64) -> NewBonus {
    NewBonus {
        department_id,
        year_month: "2026-03".parse::<YearMonth>().unwrap(),
        user_id,
        points,
        reason: Some("festival week".to_string()),
    }
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn approvals_stop_at_the_quota() {
    let db = TestDb::new("bonus_quota").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let manager = account(&mut conn, "Manager", UserRole::Manager).await.unwrap();
    let volunteer = account(&mut conn, "Devi", UserRole::Volunteer).await.unwrap();
    let dept = department(&mut conn, admin.id, "Hall").await.unwrap();
    let month = "2026-03".parse::<YearMonth>().unwrap();

    bonus::set_quota(&mut conn, admin.id, dept.id, month, 1000, Utc::now())
        .await
        .unwrap();

    let first = bonus::create_request(&mut conn, manager.id, request(dept.id, volunteer.id, 800))
        .await
        .unwrap();
    let too_big = bonus::create_request(&mut conn, manager.id, request(dept.id, volunteer.id, 300))
        .await
        .unwrap();
    let fits = bonus::create_request(&mut conn, manager.id, request(dept.id, volunteer.id, 200))
        .await
        .unwrap();
    assert_eq!(first.status, BonusStatus::Pending);

    let approved = bonus::approve(&mut conn, first.id, admin.id, Utc::now()).await.unwrap();
    assert_eq!(approved.request.status, BonusStatus::AdminApproved);
    assert_eq!(approved.snapshot.as_ref().unwrap().total_points, 800);

    let err = bonus::approve(&mut conn, too_big.id, admin.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::QuotaExceeded {
            quota: 1000,
            approved: 800,
            requested: 300,
        }
    ));

    // 800 + 200 lands exactly on the quota.
    bonus::approve(&mut conn, fits.id, admin.id, Utc::now()).await.unwrap();
    let view = bonus::get_quota(&mut conn, dept.id, month).await.unwrap();
    assert_eq!(view.used_points, 1000);
    assert_eq!(view.remaining_points, 0);

    let still_pending = bonus::list_pending(&mut conn).await.unwrap();
    assert_eq!(still_pending.len(), 1);
    assert_eq!(still_pending[0].id, too_big.id);

    let err = bonus::create_request(&mut conn, manager.id, request(dept.id, volunteer.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::QuotaExceeded { .. }));

    let snapshot = rank::summary(&mut conn, volunteer.id).await.unwrap().snapshot;
    assert_eq!(snapshot.total_points, 1000);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn settled_requests_cannot_be_decided_again() {
    let db = TestDb::new("bonus_settled").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let volunteer = account(&mut conn, "Lata", UserRole::Volunteer).await.unwrap();
    let dept = department(&mut conn, admin.id, "Office").await.unwrap();
    let month = "2026-03".parse::<YearMonth>().unwrap();
    bonus::set_quota(&mut conn, admin.id, dept.id, month, 500, Utc::now())
        .await
        .unwrap();

    let req = bonus::create_request(&mut conn, admin.id, request(dept.id, volunteer.id, 50))
        .await
        .unwrap();
    let rejected = bonus::reject(&mut conn, req.id, admin.id, Utc::now()).await.unwrap();
    assert_eq!(rejected.request.status, BonusStatus::Rejected);
    assert!(rejected.ledger_entry_id.is_none());

    let err = bonus::approve(&mut conn, req.id, admin.id, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Conflict: bonus request is rejected");

    let snapshot = rank::summary(&mut conn, volunteer.id).await.unwrap().snapshot;
    assert_eq!(snapshot.total_points, 0);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn concurrent_approvals_never_overrun_the_quota() {
    let db = TestDb::new("bonus_race").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let volunteer = account(&mut conn, "Meera", UserRole::Volunteer).await.unwrap();
    let dept = department(&mut conn, admin.id, "Kitchen").await.unwrap();
    let month = "2026-03".parse::<YearMonth>().unwrap();
    bonus::set_quota(&mut conn, admin.id, dept.id, month, 1000, Utc::now())
        .await
        .unwrap();

    let mut ids = Vec::new();
    for _ in 0..6 {
        let req = bonus::create_request(&mut conn, admin.id, request(dept.id, volunteer.id, 300))
            .await
            .unwrap();
        ids.push(req.id);
    }

    let admin_id = admin.id;
    let db = &db;
    let results = futures::future::join_all(ids.iter().map(|&id| async move {
        let mut own = db.conn().await.unwrap();
        bonus::approve(&mut own, id, admin_id, Utc::now()).await
    }))
    .await;

    let approved = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(approved, 3);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, ServiceError::QuotaExceeded { quota: 1000, .. }))
    );

    let view = bonus::get_quota(&mut conn, dept.id, month).await.unwrap();
    assert_eq!(view.used_points, 900);
    assert!(view.used_points <= 1000);
    let snapshot = rank::summary(&mut conn, volunteer.id).await.unwrap().snapshot;
    assert_eq!(snapshot.total_points, 900);
}
