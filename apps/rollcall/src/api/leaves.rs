//! `/api/leaves` and `/api/payroll`.

use super::extract::{JsonBody, Params};
use super::{ApiError, AppState, Caller};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use rollcall_core::services::leaves::{DecisionInput, LeaveInput};
use rollcall_core::services::payroll::{PayslipQuery, PeriodInput};
use rollcall_core::{LeaveRequest, LeaveWithUser, Payslip, UserId};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(request))
        .route("/me", get(mine))
        .route("/pending", get(pending))
        .route("/{id}/approve", post(decide))
}

pub(super) fn payroll_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(payslip))
        .route("/generate/{user_id}", post(generate))
}

async fn request(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<LeaveInput>,
) -> Result<(StatusCode, Json<LeaveRequest>), ApiError> {
    let leave = state.call(move |p| p.request_leave(&caller.actor, input)).await?;
    Ok((StatusCode::CREATED, Json(leave)))
}

async fn mine(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<LeaveRequest>>, ApiError> {
    state.call(move |p| p.my_leaves(&caller.actor)).await.map(Json)
}

async fn pending(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<LeaveWithUser>>, ApiError> {
    state.call(move |p| p.pending_leaves(&caller.actor)).await.map(Json)
}

async fn decide(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
    JsonBody(input): JsonBody<DecisionInput>,
) -> Result<Json<LeaveRequest>, ApiError> {
    state
        .call(move |p| p.decide_leave(&caller.actor, id, input, &caller.client))
        .await
        .map(Json)
}

async fn generate(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<u64>,
    JsonBody(period): JsonBody<PeriodInput>,
) -> Result<Json<Payslip>, ApiError> {
    state
        .call(move |p| p.generate_payslip(&caller.actor, UserId(user_id), period, &caller.client))
        .await
        .map(Json)
}

async fn payslip(
    State(state): State<AppState>,
    caller: Caller,
    Params(query): Params<PayslipQuery>,
) -> Result<Json<Payslip>, ApiError> {
    state.call(move |p| p.payslip(&caller.actor, query)).await.map(Json)
}
