#![expect(clippy::unwrap_used)]
//! Attendance settlement, rank resync and join-badge behavior.

use chrono::{Duration, NaiveDate, Utc};
use seva_db::db::enums::{AttendanceStatus, UserRole};
use seva_service::attendance::{self, Confirmation};
use seva_service::badge;
use seva_service::error::ServiceError;
use seva_service::ledger::{self, Adjustment, AdjustmentReason};
use seva_service::rank;
use seva_test::{TestDb, account, department, scheduled_day};

fn confirm(day_id: i64, user_id: i64) -> Confirmation {
    Confirmation {
        schedule_day_id: day_id,
        user_id,
        status: AttendanceStatus::Present,
        minutes_override: None,
        comment: None,
    }
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn twelve_six_hour_shifts_earn_the_join_badge() {
    let db = TestDb::new("join_badge").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let volunteer = account(&mut conn, "Asha", UserRole::Volunteer).await.unwrap();
    let dept = department(&mut conn, admin.id, "Kitchen").await.unwrap();
    let first = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

    for offset in 0..12 {
        let date = first + Duration::days(offset);
        let day = scheduled_day(&mut conn, admin.id, dept.id, date, ("08:00", "14:00"), volunteer.id)
            .await
            .unwrap();
        let outcome = attendance::record(&mut conn, admin.id, confirm(day.id, volunteer.id), Utc::now())
            .await
            .unwrap();

        assert_eq!(outcome.minutes_worked, 360);
        assert_eq!(outcome.points_awarded, 60);
        if offset == 0 {
            let summary = rank::summary(&mut conn, volunteer.id).await.unwrap();
            assert_eq!(summary.snapshot.total_minutes, 360);
            assert_eq!(summary.snapshot.total_points, 60);
            assert_eq!(summary.snapshot.rank_level, 1);
            assert!(!summary.snapshot.join_badge);
        }
        // 11 shifts are 3960 minutes, the 12th crosses 4200.
        assert_eq!(outcome.join_badge_newly_granted, offset == 11);
    }

    let summary = rank::summary(&mut conn, volunteer.id).await.unwrap();
    assert_eq!(summary.snapshot.total_minutes, 4320);
    assert_eq!(summary.snapshot.total_points, 720);
    assert!(summary.snapshot.join_badge);

    let now = Utc::now();
    let outcome = ledger::adjust(
        &mut conn,
        admin.id,
        Adjustment {
            user_id: volunteer.id,
            minutes_delta: Some(-200),
            points_delta: None,
            reason: AdjustmentReason::ManualAdjust,
            service_date: now.date_naive(),
            department_id: None,
            ref_id: None,
            note: Some("double-counted shift".to_string()),
        },
        now,
    )
    .await
    .unwrap();
    assert_eq!(outcome.snapshot.total_minutes, 4120);
    assert!(outcome.snapshot.join_badge);
    assert!(!outcome.join_badge_newly_granted);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn snapshot_matches_ledger_sums() {
    let db = TestDb::new("ledger_consistency").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let volunteer = account(&mut conn, "Ravi", UserRole::Volunteer).await.unwrap();
    let dept = department(&mut conn, admin.id, "Garden").await.unwrap();

    let day = scheduled_day(
        &mut conn,
        admin.id,
        dept.id,
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        ("09:00", "10:30"),
        volunteer.id,
    )
    .await
    .unwrap();
    let outcome = attendance::record(&mut conn, admin.id, confirm(day.id, volunteer.id), Utc::now())
        .await
        .unwrap();
    // 90 minutes truncate to one hour of points.
    assert_eq!(outcome.minutes_worked, 90);
    assert_eq!(outcome.points_awarded, 10);

    for (minutes, points) in [(Some(45), None), (None, Some(-3)), (Some(-15), Some(25))] {
        let now = Utc::now();
        ledger::adjust(
            &mut conn,
            admin.id,
            Adjustment {
                user_id: volunteer.id,
                minutes_delta: minutes,
                points_delta: points,
                reason: AdjustmentReason::AppealResolve,
                service_date: now.date_naive(),
                department_id: Some(dept.id),
                ref_id: None,
                note: None,
            },
            now,
        )
        .await
        .unwrap();
    }

    let hours = ledger::list_hours(&mut conn, volunteer.id, None).await.unwrap();
    let points = ledger::list_points(&mut conn, volunteer.id, None).await.unwrap();
    let snapshot = rank::summary(&mut conn, volunteer.id).await.unwrap().snapshot;
    assert_eq!(snapshot.total_minutes, hours.iter().map(|e| e.minutes_delta).sum::<i64>());
    assert_eq!(snapshot.total_points, points.iter().map(|e| e.points_delta).sum::<i64>());
    assert_eq!(snapshot.total_minutes, 120);
    assert_eq!(snapshot.total_points, 32);

    let again = rank::resync(&mut conn, volunteer.id, Utc::now()).await.unwrap();
    assert_eq!(again.snapshot.total_minutes, snapshot.total_minutes);
    assert_eq!(again.snapshot.total_points, snapshot.total_points);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn attendance_is_confirmed_once() {
    let db = TestDb::new("attendance_once").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let volunteer = account(&mut conn, "Meera", UserRole::Volunteer).await.unwrap();
    let dept = department(&mut conn, admin.id, "Library").await.unwrap();
    let day = scheduled_day(
        &mut conn,
        admin.id,
        dept.id,
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        ("09:00", "12:00"),
        volunteer.id,
    )
    .await
    .unwrap();

    attendance::record(&mut conn, admin.id, confirm(day.id, volunteer.id), Utc::now())
        .await
        .unwrap();
    let err = attendance::record(&mut conn, admin.id, confirm(day.id, volunteer.id), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict { entity: "attendance", .. }));

    let totals = rank::summary(&mut conn, volunteer.id).await.unwrap().snapshot;
    assert_eq!(totals.total_minutes, 180);
    assert_eq!(totals.total_points, 30);
}

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn badge_check_grants_once() {
    let db = TestDb::new("badge_idempotency").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let volunteer = account(&mut conn, "Kiran", UserRole::Volunteer).await.unwrap();

    let now = Utc::now();
    let outcome = ledger::adjust(
        &mut conn,
        admin.id,
        Adjustment {
            user_id: volunteer.id,
            minutes_delta: Some(101 * 60),
            points_delta: None,
            reason: AdjustmentReason::ManualAdjust,
            service_date: now.date_naive(),
            department_id: None,
            ref_id: None,
            note: None,
        },
        now,
    )
    .await
    .unwrap();
    let mut granted = outcome.badges_granted.clone();
    granted.sort();
    assert_eq!(granted, ["hundred_hours", "joy_badge"]);

    assert!(badge::check_and_grant(&mut conn, volunteer.id, Utc::now()).await.unwrap().is_empty());
    assert!(badge::check_and_grant(&mut conn, volunteer.id, Utc::now()).await.unwrap().is_empty());

    let held = badge::held(&mut conn, volunteer.id).await.unwrap();
    let joy = held.iter().filter(|h| h.badge.code == "joy_badge").count();
    assert_eq!(joy, 1);
    assert_eq!(held.len(), 2);
}
