#![expect(clippy::unwrap_used)]
//! Engagement history stays a single chain with one open row.

use chrono::{Duration, Utc};
use seva_db::db::enums::{EngagementType, UserRole};
use seva_service::engagement::{self, EngagementChange};
use seva_test::{TestDb, account, department};

#[test_log::test(tokio::test)]
#[ignore = "requires PostgreSQL (TEST_DATABASE_URL)"]
async fn updates_keep_one_current_engagement() {
    let db = TestDb::new("engagement_history").await.unwrap();
    let mut conn = db.conn().await.unwrap();
    let admin = account(&mut conn, "Admin", UserRole::Admin).await.unwrap();
    let worker = account(&mut conn, "Suresh", UserRole::Volunteer).await.unwrap();
    let kitchen = department(&mut conn, admin.id, "Kitchen").await.unwrap();
    let office = department(&mut conn, admin.id, "Office").await.unwrap();
    let now = Utc::now();

    let steps = [
        (now - Duration::days(400), EngagementType::TempleWorker, kitchen.id, None),
        (
            now - Duration::days(10),
            EngagementType::TempleWorker,
            office.id,
            Some("transferred"),
        ),
        (now, EngagementType::VolunteerShortterm, office.id, Some("reduced hours")),
    ];

    let mut updates = Vec::new();
    for (at, engagement_type, department_id, reason) in steps {
        let update = engagement::update(
            &mut conn,
            admin.id,
            worker.id,
            EngagementChange {
                engagement_type,
                department_id,
                title: None,
                change_reason: reason.map(str::to_string),
            },
            at,
        )
        .await
        .unwrap();
        updates.push(update);
    }

    assert!(updates[0].previous.is_none());
    assert!(updates[0].badges_granted.is_empty());
    // 390 days as a temple worker by the second update.
    assert_eq!(updates[1].badges_granted, ["temple_worker_1year"]);
    assert!(updates[2].badges_granted.is_empty());

    for pair in updates.windows(2) {
        let closed = pair[1].previous.as_ref().unwrap();
        assert_eq!(closed.id, pair[0].current.id);
        assert_eq!(closed.replaced_by, Some(pair[1].current.id));
        assert!(closed.effective_until.is_some());
    }
    assert_eq!(updates[1].current.change_reason.as_deref(), Some("transferred"));

    let history = engagement::history(&mut conn, worker.id).await.unwrap();
    assert_eq!(history.len(), 3);
    let open: Vec<_> = history.iter().filter(|e| e.effective_until.is_none()).collect();
    assert_eq!(open.len(), 1);

    let current = engagement::current(&mut conn, worker.id).await.unwrap().unwrap();
    assert_eq!(current.id, updates[2].current.id);
    assert_eq!(current.engagement_type, EngagementType::VolunteerShortterm);
}
