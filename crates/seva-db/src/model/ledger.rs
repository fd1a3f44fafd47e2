//! Append-only ledger rows. There are insertables and queryables here, but
//! no changesets: ledger rows are never updated.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::enums::{HoursReason, PointReason};
use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::hours_ledger)]
#[diesel(check_for_backend(Pg))]
pub struct HoursLedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub service_date: NaiveDate,
    pub minutes_delta: i64,
    pub reason: HoursReason,
    pub ref_id: Option<i64>,
    pub note: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::hours_ledger)]
pub struct NewHoursLedgerEntry<'a> {
    pub user_id: i64,
    pub service_date: NaiveDate,
    pub minutes_delta: i64,
    pub reason: HoursReason,
    pub ref_id: Option<i64>,
    pub note: Option<&'a str>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::point_ledger)]
#[diesel(check_for_backend(Pg))]
pub struct PointLedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub points_delta: i64,
    pub reason: PointReason,
    pub ref_id: Option<i64>,
    pub department_id: Option<i64>,
    pub note: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::point_ledger)]
pub struct NewPointLedgerEntry<'a> {
    pub user_id: i64,
    pub points_delta: i64,
    pub reason: PointReason,
    pub ref_id: Option<i64>,
    pub department_id: Option<i64>,
    pub note: Option<&'a str>,
    pub created_by: Option<i64>,
}
