use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::user_rank_snapshot;
use crate::model::rank::RankSnapshotRow;

/// ## Errors
/// Returns a database error if the query fails.
pub async fn find(conn: &mut DbConnection<'_>, user_id: i64) -> QueryResult<Option<RankSnapshotRow>> {
    user_rank_snapshot::table
        .find(user_id)
        .select(RankSnapshotRow::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Reads the snapshot row and holds its lock until the transaction ends.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn find_for_update(
    conn: &mut DbConnection<'_>,
    user_id: i64,
) -> QueryResult<Option<RankSnapshotRow>> {
    user_rank_snapshot::table
        .find(user_id)
        .select(RankSnapshotRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Inserts the snapshot, or overwrites every column of the existing row.
///
/// ## Errors
/// Returns a database error if the upsert fails.
pub async fn upsert(conn: &mut DbConnection<'_>, row: &RankSnapshotRow) -> QueryResult<RankSnapshotRow> {
    diesel::insert_into(user_rank_snapshot::table)
        .values(row)
        .on_conflict(user_rank_snapshot::user_id)
        .do_update()
        .set((
            user_rank_snapshot::total_minutes.eq(excluded(user_rank_snapshot::total_minutes)),
            user_rank_snapshot::total_points.eq(excluded(user_rank_snapshot::total_points)),
            user_rank_snapshot::rank_level.eq(excluded(user_rank_snapshot::rank_level)),
            user_rank_snapshot::join_badge.eq(excluded(user_rank_snapshot::join_badge)),
            user_rank_snapshot::join_badge_granted_at
                .eq(excluded(user_rank_snapshot::join_badge_granted_at)),
            user_rank_snapshot::updated_at.eq(excluded(user_rank_snapshot::updated_at)),
        ))
        .returning(RankSnapshotRow::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Inserts an all-zero snapshot unless the user already has one.
///
/// ## Errors
/// Returns a database error if the insert fails.
pub async fn insert_initial(conn: &mut DbConnection<'_>, row: &RankSnapshotRow) -> QueryResult<usize> {
    diesel::insert_into(user_rank_snapshot::table)
        .values(row)
        .on_conflict_do_nothing()
        .execute(conn)
        .await
}
