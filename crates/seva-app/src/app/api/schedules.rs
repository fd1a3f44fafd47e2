//! Schedule days, assignments and attendance confirmation.

use chrono::{NaiveDate, Utc};
use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use serde::{Deserialize, Serialize};
use seva_db::db::enums::AttendanceStatus;
use seva_db::model::schedule::{Attendance, ScheduleAssignment, ScheduleDay};
use seva_service::attendance::{self, AttendanceOutcome, Confirmation};
use seva_service::auth::{Action, Resource};
use seva_service::schedule::{self, ScheduleDaySpec};

use super::context::{Caller, json_body, path_id, query_required};
use crate::db_handler::get_db_from_depot;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct CreateDayRequest {
    pub department_id: i64,
    pub service_date: NaiveDate,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    #[serde(default = "default_required_count")]
    pub required_count: i32,
    pub note: Option<String>,
}

const fn default_required_count() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    pub user_id: i64,
    pub status: AttendanceStatus,
    pub minutes: Option<i64>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DayDetail {
    #[serde(flatten)]
    pub day: ScheduleDay,
    pub assignments: Vec<ScheduleAssignment>,
}

/// `GET /schedules?department_id=&from=&to=`
#[handler]
async fn list_days(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<ScheduleDay>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Schedule, Action::Read)?;
    let department_id: i64 = query_required(req, "department_id")?;
    let from: NaiveDate = query_required(req, "from")?;
    let to: NaiveDate = query_required(req, "to")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(schedule::list_days(&mut conn, department_id, from, to).await?))
}

#[handler]
async fn create_day(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<ScheduleDay>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Schedule, Action::Write)?;
    let body: CreateDayRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let day = schedule::create_day(
        &mut conn,
        caller.id(),
        ScheduleDaySpec {
            department_id: body.department_id,
            service_date: body.service_date,
            shift_start: body.shift_start,
            shift_end: body.shift_end,
            required_count: body.required_count,
            note: body.note,
        },
    )
    .await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(day))
}

#[handler]
async fn get_day(req: &mut Request, depot: &mut Depot) -> AppResult<Json<DayDetail>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Schedule, Action::Read)?;
    let id = path_id(req, "id")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let day = schedule::get_day(&mut conn, id).await?;
    let assignments = schedule::assignments(&mut conn, id).await?;
    Ok(Json(DayDetail { day, assignments }))
}

#[handler]
async fn assign(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<ScheduleAssignment>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Schedule, Action::Write)?;
    let id = path_id(req, "id")?;
    let body: AssignRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let assignment = schedule::assign(&mut conn, caller.id(), id, body.user_id).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(assignment))
}

#[handler]
async fn list_attendance(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<Attendance>>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Attendance, Action::Read)?;
    let id = path_id(req, "id")?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    Ok(Json(attendance::list_for_day(&mut conn, id).await?))
}

/// ## Summary
/// `POST /schedules/{id}/attendance` - Confirms attendance and settles it into
/// the ledgers.
///
/// ## Errors
/// 404 when the user is not assigned, 409 when already confirmed.
#[handler]
async fn confirm_attendance(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<AttendanceOutcome>> {
    let caller = Caller::from_depot(depot)?;
    caller.require(depot, Resource::Attendance, Action::Write)?;
    let id = path_id(req, "id")?;
    let body: AttendanceRequest = json_body(req).await?;
    let provider = get_db_from_depot(depot)?;
    let mut conn = provider.get_connection().await?;

    let outcome = attendance::record(
        &mut conn,
        caller.id(),
        Confirmation {
            schedule_day_id: id,
            user_id: body.user_id,
            status: body.status,
            minutes_override: body.minutes,
            comment: body.comment,
        },
        Utc::now(),
    )
    .await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(outcome))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("schedules")
        .get(list_days)
        .post(create_day)
        .push(
            Router::with_path("{id}")
                .get(get_day)
                .push(Router::with_path("assignments").post(assign))
                .push(
                    Router::with_path("attendance")
                        .get(list_attendance)
                        .post(confirm_attendance),
                ),
        )
}

#[cfg(test)]
mod tests {
    use salvo::test::TestClient;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn confirmation_requires_authentication() {
        let resp = TestClient::post("http://127.0.0.1:5800/schedules/3/attendance")
            .json(&serde_json::json!({"user_id": 1, "status": "present"}))
            .send(routes())
            .await;

        assert_eq!(resp.status_code, Some(StatusCode::UNAUTHORIZED));
    }

    #[test_log::test]
    fn attendance_body_uses_storage_names() {
        let body: AttendanceRequest =
            serde_json::from_str(r#"{"user_id": 4, "status": "late", "minutes": 90}"#).unwrap();
        assert_eq!(body.status, AttendanceStatus::Late);
        assert_eq!(body.minutes, Some(90));
        assert!(body.comment.is_none());
    }
}
