use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::enums::BonusStatus;
use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::dept_month_quota)]
#[diesel(check_for_backend(Pg))]
pub struct DeptMonthQuota {
    pub id: i64,
    pub department_id: i64,
    pub year_month: String,
    pub quota_points: i64,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::dept_month_quota)]
pub struct NewDeptMonthQuota<'a> {
    pub department_id: i64,
    pub year_month: &'a str,
    pub quota_points: i64,
    pub updated_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = schema::dept_bonus_request)]
#[diesel(check_for_backend(Pg))]
pub struct BonusRequest {
    pub id: i64,
    pub department_id: i64,
    pub year_month: String,
    pub user_id: i64,
    pub points: i64,
    pub reason_text: Option<String>,
    pub status: BonusStatus,
    pub created_by: i64,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::dept_bonus_request)]
pub struct NewBonusRequest<'a> {
    pub department_id: i64,
    pub year_month: &'a str,
    pub user_id: i64,
    pub points: i64,
    pub reason_text: Option<&'a str>,
    pub status: BonusStatus,
    pub created_by: i64,
}
