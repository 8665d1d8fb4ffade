//! Account handlers: signup, login, profile, password, customer listing

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::core::error::ApiResult;
use crate::server::AppState;
use crate::server::extractors::{ApiJson, AuthUser};
use crate::services::accounts::{
    ChangePasswordRequest, LoginRequest, SignupRequest, UpdateProfileRequest,
};

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = state.accounts.signup(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "user": user })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let response = state.accounts.login(request).await?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": response.token,
        "user_id": response.user_id,
        "role": response.role,
    })))
}

pub async fn get_user_info(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    let user = state.accounts.profile(&auth.user_id).await?;
    Ok(Json(json!(user)))
}

pub async fn update_user_info(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<Value>> {
    let user = state.accounts.update_profile(&auth.user_id, request).await?;
    Ok(Json(json!({
        "message": "User info updated successfully",
        "user": user,
    })))
}

pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<Value>> {
    state.accounts.change_password(&auth.user_id, request).await?;
    Ok(Json(json!({ "message": "Password updated successfully" })))
}

pub async fn get_all_users(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let users = state.accounts.list_customers().await?;
    Ok(Json(json!({ "users": users })))
}
