use axum::extract::{Path, State, rejection::PathRejection};
use evently_api::{ApiError, ApiResponse, ApiResult};
use evently_auth::CurrentUser;
use evently_core::{Attendee, AttendeeId, Event, UserId};

use super::events::ensure_owner;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Attendee>> {
    Ok(ApiResponse::ok(state.stores.attendees.list_attendees().await?))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<AttendeeId>, PathRejection>,
) -> ApiResult<Attendee> {
    let Path(id) = id?;
    let attendee = state
        .stores
        .attendees
        .get_attendee(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attendee not found"))?;
    Ok(ApiResponse::ok(attendee))
}

/// `GET /attendees/{id}/events`: the events user `{id}` attends.
pub async fn user_events(
    State(state): State<AppState>,
    id: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Vec<Event>> {
    let Path(user_id) = id?;
    if state.stores.users.get_user(user_id).await?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(ApiResponse::ok(
        state.stores.attendees.list_user_events(user_id).await?,
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    id: Result<Path<AttendeeId>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    let attendee = state
        .stores
        .attendees
        .get_attendee(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attendee not found"))?;
    let event = state
        .stores
        .events
        .get_event(attendee.event_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;
    ensure_owner(&event, &current, "remove attendees from")?;

    if !state.stores.attendees.delete_attendee(id).await? {
        return Err(ApiError::not_found("Attendee not found"));
    }

    tracing::info!(attendee_id = id, event_id = event.id, "Attendee deleted");
    Ok(ApiResponse::ok(()).with_message("Attendee deleted successfully"))
}
