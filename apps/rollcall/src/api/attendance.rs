//! `/api/attendance` and `/api/breaks`.

use super::extract::{JsonBody, Params};
use super::{ApiError, AppState, Caller};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use rollcall_core::services::attendance::{BulkInput, BulkOutcome, CheckOutInput, OverrideInput, TodayStatus};
use rollcall_core::{Attendance, AttendanceWithUser, Break, DailyEntry, UserId};
use serde::Deserialize;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(today))
        .route("/check-in", post(check_in))
        .route("/check-out", post(check_out))
        .route("/history", get(history))
        .route("/override", post(override_day))
        .route("/daily-status", get(daily_status))
        .route("/bulk", post(bulk))
        .route("/report", get(monthly_report))
        .route("/report/user", get(user_report))
        .route("/export", get(export))
}

pub(super) fn break_routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_break))
        .route("/end", post(end_break))
        .route("/today", get(breaks_today))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct DateQuery {
    date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonthQuery {
    month: u32,
    year: i32,
    #[serde(default)]
    user_id: Option<UserId>,
}

async fn today(State(state): State<AppState>, caller: Caller) -> Result<Json<TodayStatus>, ApiError> {
    state.call(move |p| p.attendance_today(&caller.actor)).await.map(Json)
}

async fn check_in(State(state): State<AppState>, caller: Caller) -> Result<Json<Attendance>, ApiError> {
    state.call(move |p| p.check_in(&caller.actor)).await.map(Json)
}

/// The body is optional; an empty request checks out without notes.
async fn check_out(
    State(state): State<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<Json<Attendance>, ApiError> {
    let input = if body.is_empty() {
        CheckOutInput::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?
    };
    state.call(move |p| p.check_out(&caller.actor, input)).await.map(Json)
}

async fn history(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<HistoryQuery>,
) -> Result<Json<Vec<Attendance>>, ApiError> {
    state
        .call(move |p| p.attendance_history(&caller.actor, q.limit))
        .await
        .map(Json)
}

async fn override_day(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<OverrideInput>,
) -> Result<Json<Attendance>, ApiError> {
    state
        .call(move |p| p.override_attendance(&caller.actor, input, &caller.client))
        .await
        .map(Json)
}

async fn daily_status(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<DateQuery>,
) -> Result<Json<Vec<DailyEntry>>, ApiError> {
    state
        .call(move |p| p.daily_attendance(&caller.actor, q.date))
        .await
        .map(Json)
}

async fn bulk(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<BulkInput>,
) -> Result<Json<Vec<BulkOutcome>>, ApiError> {
    state
        .call(move |p| p.bulk_attendance(&caller.actor, input, &caller.client))
        .await
        .map(Json)
}

async fn monthly_report(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<MonthQuery>,
) -> Result<Json<Vec<AttendanceWithUser>>, ApiError> {
    state
        .call(move |p| p.monthly_report(&caller.actor, q.month, q.year))
        .await
        .map(Json)
}

async fn user_report(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<MonthQuery>,
) -> Result<Json<Vec<Attendance>>, ApiError> {
    state
        .call(move |p| p.user_monthly_report(&caller.actor, q.user_id, q.month, q.year))
        .await
        .map(Json)
}

async fn export(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<MonthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (month, year) = (q.month, q.year);
    let csv = state
        .call(move |p| p.export_attendance_csv(&caller.actor, month, year))
        .await?;
    let disposition = format!("attachment; filename=\"attendance_report_{year}_{month}.csv\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

async fn start_break(State(state): State<AppState>, caller: Caller) -> Result<Json<Break>, ApiError> {
    state.call(move |p| p.start_break(&caller.actor)).await.map(Json)
}

async fn end_break(State(state): State<AppState>, caller: Caller) -> Result<Json<Break>, ApiError> {
    state.call(move |p| p.end_break(&caller.actor)).await.map(Json)
}

async fn breaks_today(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<Break>>, ApiError> {
    state.call(move |p| p.breaks_today(&caller.actor)).await.map(Json)
}
