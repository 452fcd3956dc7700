//! `/api/settings`, `/api/holidays` and `/api/announcements`.

use super::extract::JsonBody;
use super::{ApiError, AppState, Caller};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};
use rollcall_core::services::announcements::AnnouncementInput;
use rollcall_core::services::holidays::HolidayInput;
use rollcall_core::services::settings::SettingsUpdate;
use rollcall_core::{Announcement, Holiday, SystemSettings};
use serde_json::{Value, json};

pub(super) fn settings_routes() -> Router<AppState> {
    Router::new().route("/", get(settings).patch(update_settings))
}

pub(super) fn holiday_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(holidays).post(create_holiday))
        .route("/upcoming", get(upcoming_holidays))
        .route("/{id}", delete(delete_holiday))
}

pub(super) fn announcement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(active_announcements).post(create_announcement))
        .route("/all", get(all_announcements))
        .route("/{id}", delete(delete_announcement))
}

// =============================================================================
// SETTINGS
// =============================================================================

async fn settings(State(state): State<AppState>, caller: Caller) -> Result<Json<SystemSettings>, ApiError> {
    state.call(move |p| p.settings(&caller.actor)).await.map(Json)
}

async fn update_settings(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(update): JsonBody<SettingsUpdate>,
) -> Result<Json<SystemSettings>, ApiError> {
    state
        .call(move |p| p.update_settings(&caller.actor, update, &caller.client))
        .await
        .map(Json)
}

// =============================================================================
// HOLIDAYS
// =============================================================================

async fn holidays(State(state): State<AppState>, _caller: Caller) -> Result<Json<Vec<Holiday>>, ApiError> {
    state.call(|p| p.holidays()).await.map(Json)
}

async fn upcoming_holidays(
    State(state): State<AppState>,
    _caller: Caller,
) -> Result<Json<Vec<Holiday>>, ApiError> {
    state.call(|p| p.upcoming_holidays()).await.map(Json)
}

async fn create_holiday(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<HolidayInput>,
) -> Result<Json<Holiday>, ApiError> {
    state
        .call(move |p| p.create_holiday(&caller.actor, input, &caller.client))
        .await
        .map(Json)
}

async fn delete_holiday(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    state
        .call(move |p| p.delete_holiday(&caller.actor, id, &caller.client))
        .await?;
    Ok(Json(json!({ "success": true })))
}

// =============================================================================
// ANNOUNCEMENTS
// =============================================================================

async fn active_announcements(
    State(state): State<AppState>,
    _caller: Caller,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    state.call(|p| p.active_announcements()).await.map(Json)
}

async fn all_announcements(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Announcement>>, ApiError> {
    state.call(move |p| p.all_announcements(&caller.actor)).await.map(Json)
}

async fn create_announcement(
    State(state): State<AppState>,
    caller: Caller,
    JsonBody(input): JsonBody<AnnouncementInput>,
) -> Result<(StatusCode, Json<Announcement>), ApiError> {
    let created = state
        .call(move |p| p.create_announcement(&caller.actor, input, &caller.client))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_announcement(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiError> {
    state
        .call(move |p| p.delete_announcement(&caller.actor, id, &caller.client))
        .await?;
    Ok(Json(json!({ "message": "Deleted" })))
}
