//! Rank engine: rebuilds the cached snapshot from the ledgers.

use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::Serialize;
use seva_core::rank::{LEVEL_RULES, LevelRule, RankSnapshot, Recomputed};
use seva_db::db::connection::DbConnection;
use seva_db::db::query;
use seva_db::model::rank::RankSnapshotRow;

use crate::error::{ServiceError, ServiceResult};
use crate::ledger;

/// ## Summary
/// Recomputes and stores a user's snapshot.
///
/// Totals are summed fresh from the ledgers; the previous row only
/// contributes the one-way join badge. The snapshot row is locked for the
/// duration so concurrent resyncs of one user serialize. Calling this twice
/// with no ledger writes in between yields the same snapshot.
///
/// ## Side Effects
/// Upserts `user_rank_snapshot`.
///
/// ## Errors
/// Returns a database error; the caller's transaction must then roll back.
#[tracing::instrument(skip(conn))]
pub async fn resync(
    conn: &mut DbConnection<'_>,
    user_id: i64,
    now: DateTime<Utc>,
) -> ServiceResult<Recomputed> {
    let recomputed = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let previous = query::rank::find_for_update(tx, user_id)
                    .await?
                    .map(|row| RankSnapshot::from(&row));
                let totals = ledger::totals(tx, user_id).await?;

                let recomputed = RankSnapshot::recompute(previous.as_ref(), totals, now);
                query::rank::upsert(tx, &RankSnapshotRow::new(user_id, &recomputed.snapshot, now))
                    .await?;
                Ok(recomputed)
            }
            .scope_boxed()
        })
        .await?;

    tracing::debug!(
        total_minutes = recomputed.snapshot.total_minutes,
        total_points = recomputed.snapshot.total_points,
        rank_level = recomputed.snapshot.rank_level,
        "Rank snapshot resynced"
    );
    if recomputed.join_badge_newly_granted {
        tracing::info!(user_id, "Join badge granted");
    }

    Ok(recomputed)
}

/// A snapshot with its level's display names and the next threshold.
#[derive(Debug, Clone, Serialize)]
pub struct PointsSummary {
    pub user_id: i64,
    #[serde(flatten)]
    pub snapshot: RankSnapshot,
    pub level: &'static LevelRule,
    pub points_to_next_level: Option<i64>,
}

impl PointsSummary {
    #[must_use]
    pub fn new(user_id: i64, snapshot: RankSnapshot) -> Self {
        let level = snapshot.level_info();
        let points_to_next_level = level
            .max
            .map(|max| (max - snapshot.total_points).max(0));
        Self {
            user_id,
            snapshot,
            level,
            points_to_next_level,
        }
    }
}

/// ## Summary
/// Reads the stored snapshot; a user without one reads as the zero default.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn summary(conn: &mut DbConnection<'_>, user_id: i64) -> ServiceResult<PointsSummary> {
    let snapshot = query::rank::find(conn, user_id)
        .await?
        .map(|row| RankSnapshot::from(&row))
        .unwrap_or_default();
    Ok(PointsSummary::new(user_id, snapshot))
}

/// The static level table.
#[must_use]
pub fn levels() -> &'static [LevelRule] {
    &LEVEL_RULES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn summary_of_default_snapshot() {
        let summary = PointsSummary::new(5, RankSnapshot::default());
        assert_eq!(summary.level.level, 1);
        assert_eq!(summary.level.name_en, "Joyful Ground");
        assert_eq!(summary.points_to_next_level, Some(100));
    }

    #[test_log::test]
    fn top_level_has_no_next_threshold() {
        let snapshot = RankSnapshot {
            total_points: 12_000,
            rank_level: 7,
            ..RankSnapshot::default()
        };
        let summary = PointsSummary::new(5, snapshot);
        assert_eq!(summary.level.level, 7);
        assert_eq!(summary.points_to_next_level, None);
    }

    #[test_log::test]
    fn summary_serializes_flat() {
        let json = serde_json::to_value(PointsSummary::new(5, RankSnapshot::default()))
            .expect("serializable");
        assert_eq!(json["total_points"], 0);
        assert_eq!(json["rank_level"], 1);
        assert_eq!(json["level"]["name_en"], "Joyful Ground");
    }

    #[test_log::test]
    fn level_table_is_contiguous() {
        for pair in levels().windows(2) {
            assert_eq!(pair[0].max, Some(pair[1].min));
        }
    }
}
