//! Registration and login.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use evently_api::{ApiError, ApiResponse, ApiResult};
use evently_auth::password::{hash_password, verify_password};
use evently_core::{NewUser, PublicUser, validate_email, validate_length, validate_min_length};
use metrics::counter;
use serde::{Deserialize, Serialize};

use super::blocking;
use crate::state::AppState;

pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 64;
pub const NAME_MIN: usize = 3;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<PublicUser> {
    let Json(req) = body?;
    validate_email("email", &req.email)?;
    validate_min_length("name", &req.name, NAME_MIN)?;
    validate_length("password", &req.password, PASSWORD_MIN, PASSWORD_MAX)?;

    if state.stores.users.get_user_by_email(&req.email).await?.is_some() {
        return Err(ApiError::conflict("User already exists"));
    }

    let password = req.password;
    let password_hash = blocking(move || hash_password(&password)).await?;

    // A concurrent registration can still win the race; the store reports
    // that as a conflict.
    let user = state
        .stores
        .users
        .create_user(NewUser {
            email: req.email,
            name: req.name,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");
    Ok(ApiResponse::created(user.to_public()).with_message("User created successfully"))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(req) = body?;
    validate_email("email", &req.email)?;
    validate_length("password", &req.password, PASSWORD_MIN, PASSWORD_MAX)?;

    let Some(user) = state.stores.users.get_user_by_email(&req.email).await? else {
        counter!("evently_logins_total", "outcome" => "unknown_user").increment(1);
        return Err(ApiError::bad_request("User does not exist"));
    };

    let password = req.password;
    let hash = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &hash)).await? {
        counter!("evently_logins_total", "outcome" => "bad_password").increment(1);
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let token = state
        .tokens
        .issue(user.id, &user.email)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    counter!("evently_logins_total", "outcome" => "success").increment(1);
    tracing::info!(user_id = user.id, "User logged in");
    Ok(ApiResponse::ok(LoginResponse { token }).with_message("Login successful"))
}
