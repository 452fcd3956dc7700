//! `/api/auth`: registration, login, logout, password reset requests.

use super::extract::JsonBody;
use super::{ApiError, AppState, Caller, Client};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use rollcall_core::services::auth::{ForgotPasswordInput, LoginInput, LoginOutcome, Me, RegisterInput};
use serde_json::{Value, json};
use tracing::{info, warn};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user_id = state.call(move |p| p.register(input)).await?;
    info!(user = %user_id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created", "userId": user_id })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    JsonBody(input): JsonBody<LoginInput>,
) -> Result<Json<LoginOutcome>, ApiError> {
    if state.login_limiter.check().is_err() {
        warn!("login rate limit exceeded");
        return Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many login attempts, please try again later",
        ));
    }
    state.call(move |p| p.login(input, &client)).await.map(Json)
}

async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ForgotPasswordInput>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.call(move |p| p.forgot_password(input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Password reset request submitted for approval" })),
    ))
}

async fn logout(State(state): State<AppState>, caller: Caller) -> Result<Json<Value>, ApiError> {
    state.call(move |p| p.logout(&caller.actor, &caller.client)).await?;
    Ok(Json(json!({ "message": "Logged out successfully" })))
}

async fn me(State(state): State<AppState>, caller: Caller) -> Result<Json<Me>, ApiError> {
    state.call(move |p| p.me(&caller.actor)).await.map(Json)
}
