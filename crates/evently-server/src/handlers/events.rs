//! Event endpoints, including attendance management by the event owner.
//!
//! Adding or removing an attendee needs both the event (for the ownership
//! check) and the user (to prove they exist). The two reads are independent,
//! so they run concurrently through [`join_two`].

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use evently_api::{ApiError, ApiResponse, ApiResult};
use evently_auth::CurrentUser;
use evently_core::{
    Attendee, CoreError, Event, EventId, EventPatch, NewAttendee, NewEvent, PublicUser, User,
    UserId, validate_length, validate_min_length,
};
use evently_storage::{JoinError, Slot, StorageError, join_two};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::state::AppState;

pub const NAME_MIN: usize = 3;
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 100;
pub const LOCATION_MIN: usize = 3;

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub location: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    pub location: Option<String>,
}

fn validate_name(name: &str) -> evently_core::Result<()> {
    validate_min_length("name", name, NAME_MIN)
}

fn validate_description(description: &str) -> evently_core::Result<()> {
    validate_length("description", description, DESCRIPTION_MIN, DESCRIPTION_MAX)
}

fn validate_location(location: &str) -> evently_core::Result<()> {
    validate_min_length("location", location, LOCATION_MIN)
}

// -------------------------
// Event CRUD
// -------------------------

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> ApiResult<Event> {
    let Json(req) = body?;
    validate_name(&req.name)?;
    validate_description(&req.description)?;
    validate_location(&req.location)?;

    let event = state
        .stores
        .events
        .create_event(NewEvent {
            user_id: current.id,
            name: req.name,
            description: req.description,
            date: req.date,
            location: req.location,
        })
        .await?;

    tracing::info!(event_id = event.id, user_id = current.id, "Event created");
    Ok(ApiResponse::created(event).with_message("Event created successfully"))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Event>> {
    Ok(ApiResponse::ok(state.stores.events.list_events().await?))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<Event> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(load_event(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    id: Result<Path<EventId>, PathRejection>,
    body: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> ApiResult<Event> {
    let Path(id) = id?;
    let Json(req) = body?;

    let event = load_event(&state, id).await?;
    ensure_owner(&event, &current, "update")?;

    if let Some(name) = &req.name {
        validate_name(name)?;
    }
    if let Some(description) = &req.description {
        validate_description(description)?;
    }
    if let Some(location) = &req.location {
        validate_location(location)?;
    }
    let patch = EventPatch {
        name: req.name,
        description: req.description,
        date: req.date,
        location: req.location,
    };
    if patch.is_empty() {
        return Err(CoreError::EmptyPatch.into());
    }

    let event = state
        .stores
        .events
        .update_event(id, &patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))?;

    tracing::info!(event_id = id, "Event updated");
    Ok(ApiResponse::ok(event).with_message("Event updated successfully"))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<()> {
    let Path(id) = id?;
    let event = load_event(&state, id).await?;
    ensure_owner(&event, &current, "delete")?;

    if !state.stores.events.delete_event(id).await? {
        return Err(ApiError::not_found("Event not found"));
    }

    tracing::info!(event_id = id, "Event deleted");
    Ok(ApiResponse::ok(()).with_message("Event deleted successfully"))
}

// -------------------------
// Attendance
// -------------------------

pub async fn list_attendees(
    State(state): State<AppState>,
    id: Result<Path<EventId>, PathRejection>,
) -> ApiResult<Vec<Attendee>> {
    let Path(id) = id?;
    load_event(&state, id).await?;
    Ok(ApiResponse::ok(
        state.stores.attendees.list_event_attendees(id).await?,
    ))
}

pub async fn add_attendee(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    ids: Result<Path<(EventId, UserId)>, PathRejection>,
) -> ApiResult<Attendee> {
    let Path((event_id, user_id)) = ids?;
    let (event, user) = load_event_and_user(&state, event_id, user_id).await?;
    ensure_owner(&event, &current, "add attendees to")?;

    if state
        .stores
        .attendees
        .find_attendee(event.id, user.id)
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("User is already attending this event"));
    }

    // The unique (event_id, user_id) constraint still catches a concurrent add.
    let attendee = state
        .stores
        .attendees
        .create_attendee(NewAttendee {
            event_id: event.id,
            user_id: user.id,
        })
        .await?;

    tracing::info!(event_id, user_id, attendee_id = attendee.id, "Attendee added");
    Ok(ApiResponse::created(attendee).with_message("Attendee added successfully"))
}

pub async fn remove_attendee(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    ids: Result<Path<(EventId, UserId)>, PathRejection>,
) -> ApiResult<()> {
    let Path((event_id, user_id)) = ids?;
    let (event, user) = load_event_and_user(&state, event_id, user_id).await?;
    ensure_owner(&event, &current, "remove attendees from")?;

    let attendee = state
        .stores
        .attendees
        .find_attendee(event.id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User is not attending this event"))?;
    if !state.stores.attendees.delete_attendee(attendee.id).await? {
        return Err(ApiError::not_found("User is not attending this event"));
    }

    tracing::info!(event_id, user_id, "Attendee removed");
    Ok(ApiResponse::ok(()).with_message("Attendee removed successfully"))
}

// -------------------------
// Helpers
// -------------------------

async fn load_event(state: &AppState, id: EventId) -> Result<Event, ApiError> {
    state
        .stores
        .events
        .get_event(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found"))
}

/// Fetches the event (first slot) and the user (second slot) concurrently.
pub(crate) async fn load_event_and_user(
    state: &AppState,
    event_id: EventId,
    user_id: UserId,
) -> Result<(Event, User), ApiError> {
    join_two(
        state.stores.events.get_event(event_id),
        state.stores.users.get_user(user_id),
    )
    .await
    .map_err(event_user_join_error)
}

fn event_user_join_error(err: JoinError<StorageError>) -> ApiError {
    match err {
        JoinError::NotFound { slot: Slot::FIRST } => ApiError::not_found("Event not found"),
        JoinError::NotFound { .. } => ApiError::not_found("User not found"),
        failed => failed.into(),
    }
}

pub(crate) fn ensure_owner(
    event: &Event,
    current: &PublicUser,
    action: &str,
) -> Result<(), ApiError> {
    if !event.is_owned_by(current.id) {
        return Err(ApiError::forbidden(format!(
            "Only the event owner can {action} this event"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_errors_name_the_missing_record() {
        let event = event_user_join_error(JoinError::NotFound { slot: Slot::FIRST });
        assert_eq!(event.public_message(), "Event not found");

        let user = event_user_join_error(JoinError::NotFound { slot: Slot::SECOND });
        assert_eq!(user.public_message(), "User not found");

        let failed = event_user_join_error(JoinError::Failed {
            slot: Slot::SECOND,
            source: StorageError::connection("refused"),
        });
        assert!(matches!(failed, ApiError::Unavailable(_)));
    }

    #[test]
    fn description_bounds() {
        assert!(validate_description("too short").is_err());
        assert!(validate_description("long enough now").is_ok());
        assert!(validate_description(&"x".repeat(101)).is_err());
    }
}
