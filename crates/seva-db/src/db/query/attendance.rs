use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::attendance_daily;
use crate::model::schedule::{Attendance, NewAttendance};

/// ## Summary
/// Records a confirmation. `None` means the user was already confirmed for
/// this schedule day.
///
/// ## Errors
/// Returns a database error if the insert fails for any other reason.
pub async fn insert_if_absent(
    conn: &mut DbConnection<'_>,
    row: &NewAttendance<'_>,
) -> QueryResult<Option<Attendance>> {
    diesel::insert_into(attendance_daily::table)
        .values(row)
        .on_conflict((attendance_daily::schedule_day_id, attendance_daily::user_id))
        .do_nothing()
        .returning(Attendance::as_returning())
        .get_result(conn)
        .await
        .optional()
}

/// ## Errors
/// Returns a database error if the query fails.
pub async fn list_for_day(
    conn: &mut DbConnection<'_>,
    schedule_day_id: i64,
) -> QueryResult<Vec<Attendance>> {
    attendance_daily::table
        .filter(attendance_daily::schedule_day_id.eq(schedule_day_id))
        .order(attendance_daily::id.asc())
        .select(Attendance::as_select())
        .load(conn)
        .await
}
