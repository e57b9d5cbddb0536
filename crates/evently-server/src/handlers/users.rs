//! User endpoints. Every route here sits behind the authentication gate.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use evently_api::{ApiError, ApiResponse, ApiResult};
use evently_auth::CurrentUser;
use evently_auth::password::hash_password;
use evently_core::{
    CoreError, PublicUser, UserId, UserPatch, validate_email, validate_length,
    validate_min_length,
};
use serde::Deserialize;

use super::auth::{NAME_MIN, PASSWORD_MAX, PASSWORD_MIN};
use super::blocking;
use crate::state::AppState;

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<PublicUser>> {
    let users = state.stores.users.list_users().await?;
    Ok(ApiResponse::ok(users.iter().map(PublicUser::from).collect()))
}

pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<PublicUser> {
    Ok(ApiResponse::ok(user))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<PublicUser> {
    let Path(id) = id?;
    let user = state
        .stores
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(ApiResponse::ok(user.to_public()))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    id: Result<Path<UserId>, PathRejection>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<PublicUser> {
    let Path(id) = id?;
    let Json(req) = body?;
    ensure_self(&current, id, "update")?;

    if let Some(email) = &req.email {
        validate_email("email", email)?;
    }
    if let Some(name) = &req.name {
        validate_min_length("name", name, NAME_MIN)?;
    }
    let password_hash = match req.password {
        Some(password) => {
            validate_length("password", &password, PASSWORD_MIN, PASSWORD_MAX)?;
            Some(blocking(move || hash_password(&password)).await?)
        }
        None => None,
    };

    let patch = UserPatch {
        email: req.email,
        name: req.name,
        password_hash,
    };
    if patch.is_empty() {
        return Err(CoreError::EmptyPatch.into());
    }

    let user = state
        .stores
        .users
        .update_user(id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    state.resolver.invalidate(id).await;

    tracing::info!(user_id = id, "User updated");
    Ok(ApiResponse::ok(user.to_public()).with_message("User updated successfully"))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    ensure_self(&current, id, "delete")?;

    if !state.stores.users.delete_user(id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    state.resolver.invalidate(id).await;

    tracing::info!(user_id = id, "User deleted");
    Ok(ApiResponse::ok(()).with_message("User deleted successfully"))
}

fn ensure_self(current: &PublicUser, id: UserId, action: &str) -> Result<(), ApiError> {
    if current.id != id {
        return Err(ApiError::forbidden(format!(
            "You can only {action} your own account"
        )));
    }
    Ok(())
}
