//! `/api/admin`, `/api/users`, `/api/sessions` and `/api/audit`.

use super::extract::{JsonBody, Params};
use super::{ApiError, AppState, Caller};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use rollcall_core::services::admin::{Alert, CompanyStats, DepartmentStats, PendingApprovals, TrendPoint};
use rollcall_core::services::audit::AuditQuery;
use rollcall_core::services::users::{NewUser, UserQuery, UserUpdate};
use rollcall_core::{AuditEntry, Page, PasswordRequestView, PublicUser, SessionWithUser, UserId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/trends", get(trends))
        .route("/departments", get(departments))
        .route("/pending-approvals", get(pending_approvals))
        .route("/alerts", get(alerts))
        .route("/users", post(create_user))
        .route("/users/{id}/activity", get(user_activity))
        .route("/password-requests/pending", get(password_requests))
        .route("/password-requests/{id}/approve", post(approve_password))
        .route("/password-requests/{id}/reject", post(reject_password))
        .route("/data/reset", delete(reset_data))
}

pub(super) fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", patch(update_user))
}

pub(super) fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sessions))
        .route("/{id}/revoke", post(revoke_session))
        .route("/user/{user_id}/revoke", post(revoke_user_sessions))
}

pub(super) fn audit_routes() -> Router<AppState> {
    Router::new().route("/", get(audit_logs))
}

#[derive(Deserialize)]
struct TrendQuery {
    days: Option<u32>,
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

// =============================================================================
// DASHBOARD
// =============================================================================

async fn stats(State(state): State<AppState>, caller: Caller) -> Result<Json<CompanyStats>, ApiError> {
    state.call(move |p| p.company_stats(&caller.actor)).await.map(Json)
}

async fn trends(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<TrendQuery>,
) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    state
        .call(move |p| p.attendance_trends(&caller.actor, q.days))
        .await
        .map(Json)
}

async fn departments(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<DepartmentStats>>, ApiError> {
    state.call(move |p| p.department_stats(&caller.actor)).await.map(Json)
}

async fn pending_approvals(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<LimitQuery>,
) -> Result<Json<PendingApprovals>, ApiError> {
    state
        .call(move |p| p.pending_approvals(&caller.actor, q.limit))
        .await
        .map(Json)
}

async fn alerts(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<Alert>>, ApiError> {
    state.call(move |p| p.alerts(&caller.actor)).await.map(Json)
}

async fn user_activity(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    state
        .call(move |p| p.user_activity(&caller.actor, UserId(id)))
        .await
        .map(Json)
}

// =============================================================================
// ACCOUNTS
// =============================================================================

async fn create_user(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(new): JsonBody<NewUser>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let user = state
        .call(move |p| p.create_user(&caller.actor, new, &caller.client))
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<UserQuery>,
) -> Result<Json<Page<PublicUser>>, ApiError> {
    state.call(move |p| p.list_users(&caller.actor, &q)).await.map(Json)
}

async fn update_user(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
    JsonBody(update): JsonBody<UserUpdate>,
) -> Result<Json<PublicUser>, ApiError> {
    state
        .call(move |p| p.update_user(&caller.actor, UserId(id), update, &caller.client))
        .await
        .map(Json)
}

async fn password_requests(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<PasswordRequestView>>, ApiError> {
    state
        .call(move |p| p.pending_password_requests(&caller.actor))
        .await
        .map(Json)
}

async fn approve_password(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    state
        .call(move |p| p.approve_password_request(&caller.actor, id, &caller.client))
        .await?;
    Ok(Json(json!({ "message": "Password reset approved" })))
}

async fn reject_password(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    state
        .call(move |p| p.reject_password_request(&caller.actor, id, &caller.client))
        .await?;
    Ok(Json(json!({ "message": "Password reset rejected" })))
}

async fn reset_data(State(state): State<AppState>, caller: Caller) -> Result<Json<Value>, ApiError> {
    let by = caller.actor.user_id;
    state
        .call(move |p| p.reset_data(&caller.actor, &caller.client))
        .await?;
    warn!(by = %by, "system data reset");
    Ok(Json(json!({ "message": "System data has been reset" })))
}

// =============================================================================
// SESSIONS & AUDIT
// =============================================================================

async fn sessions(State(state): State<AppState>, caller: Caller) -> Result<Json<Vec<SessionWithUser>>, ApiError> {
    state.call(move |p| p.active_sessions(&caller.actor)).await.map(Json)
}

async fn revoke_session(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    state
        .call(move |p| p.revoke_session(&caller.actor, id, &caller.client))
        .await?;
    Ok(Json(json!({ "message": "Session revoked" })))
}

async fn revoke_user_sessions(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    let revoked = state
        .call(move |p| p.revoke_all_sessions(&caller.actor, UserId(user_id), &caller.client))
        .await?;
    Ok(Json(json!({ "message": "All sessions revoked for user", "revoked": revoked })))
}

async fn audit_logs(
    State(state): State<AppState>,
    caller: Caller,
    Params(q): Params<AuditQuery>,
) -> Result<Json<Page<AuditEntry>>, ApiError> {
    state.call(move |p| p.audit_logs(&caller.actor, &q)).await.map(Json)
}
