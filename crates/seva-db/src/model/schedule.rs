use chrono::{DateTime, NaiveDate, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::enums::AttendanceStatus;
use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::schedule_day)]
#[diesel(check_for_backend(Pg))]
pub struct ScheduleDay {
    pub id: i64,
    pub department_id: i64,
    pub service_date: NaiveDate,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    pub required_count: i32,
    pub note: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::schedule_day)]
pub struct NewScheduleDay<'a> {
    pub department_id: i64,
    pub service_date: NaiveDate,
    pub shift_start: Option<&'a str>,
    pub shift_end: Option<&'a str>,
    pub required_count: i32,
    pub note: Option<&'a str>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::schedule_assignment)]
#[diesel(check_for_backend(Pg))]
pub struct ScheduleAssignment {
    pub id: i64,
    pub schedule_day_id: i64,
    pub user_id: i64,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::schedule_assignment)]
pub struct NewScheduleAssignment {
    pub schedule_day_id: i64,
    pub user_id: i64,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::attendance_daily)]
#[diesel(check_for_backend(Pg))]
pub struct Attendance {
    pub id: i64,
    pub schedule_day_id: i64,
    pub user_id: i64,
    pub status: AttendanceStatus,
    pub minutes_worked: i64,
    pub points_awarded: i64,
    pub comment: Option<String>,
    pub confirmed_by: i64,
    pub confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::attendance_daily)]
pub struct NewAttendance<'a> {
    pub schedule_day_id: i64,
    pub user_id: i64,
    pub status: AttendanceStatus,
    pub minutes_worked: i64,
    pub points_awarded: i64,
    pub comment: Option<&'a str>,
    pub confirmed_by: i64,
}
