use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use seva_core::rank::RankSnapshot;

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = schema::user_rank_snapshot)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(Pg))]
#[diesel(treat_none_as_null = true)]
pub struct RankSnapshotRow {
    pub user_id: i64,
    pub total_minutes: i64,
    pub total_points: i64,
    pub rank_level: i32,
    pub join_badge: bool,
    pub join_badge_granted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl RankSnapshotRow {
    #[must_use]
    pub fn new(user_id: i64, snapshot: &RankSnapshot, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            total_minutes: snapshot.total_minutes,
            total_points: snapshot.total_points,
            rank_level: snapshot.rank_level,
            join_badge: snapshot.join_badge,
            join_badge_granted_at: snapshot.join_badge_granted_at,
            updated_at,
        }
    }
}

impl From<&RankSnapshotRow> for RankSnapshot {
    fn from(row: &RankSnapshotRow) -> Self {
        Self {
            total_minutes: row.total_minutes,
            total_points: row.total_points,
            rank_level: row.rank_level,
            join_badge: row.join_badge,
            join_badge_granted_at: row.join_badge_granted_at,
        }
    }
}
