//! Store traits implemented by every storage backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evently_core::{
    Attendee, AttendeeId, Event, EventId, EventPatch, NewAttendee, NewEvent, NewUser, User,
    UserId, UserPatch,
};

use crate::error::StorageError;
use crate::timed::Timed;

/// Durable user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Reads a user by id. Returns `Ok(None)` if it does not exist.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Reads a user by email. Returns `Ok(None)` if it does not exist.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    async fn list_users(&self) -> Result<Vec<User>, StorageError>;

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    /// Applies a partial update. Returns `Ok(None)` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the new email belongs to another user.
    async fn update_user(&self, id: UserId, patch: &UserPatch)
    -> Result<Option<User>, StorageError>;

    /// Deletes a user together with their events and attendances.
    /// Returns `false` if the user did not exist.
    async fn delete_user(&self, id: UserId) -> Result<bool, StorageError>;
}

/// Durable event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError>;

    async fn list_events(&self) -> Result<Vec<Event>, StorageError>;

    async fn create_event(&self, event: NewEvent) -> Result<Event, StorageError>;

    async fn update_event(
        &self,
        id: EventId,
        patch: &EventPatch,
    ) -> Result<Option<Event>, StorageError>;

    /// Deletes an event together with its attendees.
    async fn delete_event(&self, id: EventId) -> Result<bool, StorageError>;
}

/// Event membership records and the relational queries over them.
#[async_trait]
pub trait AttendeeStore: Send + Sync {
    async fn get_attendee(&self, id: AttendeeId) -> Result<Option<Attendee>, StorageError>;

    async fn list_attendees(&self) -> Result<Vec<Attendee>, StorageError>;

    /// Attendees of one event.
    async fn list_event_attendees(&self, event_id: EventId)
    -> Result<Vec<Attendee>, StorageError>;

    /// The membership of `user_id` in `event_id`, if any.
    async fn find_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Attendee>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user already attends the event.
    async fn create_attendee(&self, attendee: NewAttendee) -> Result<Attendee, StorageError>;

    async fn delete_attendee(&self, id: AttendeeId) -> Result<bool, StorageError>;

    /// Events the user attends.
    async fn list_user_events(&self, user_id: UserId) -> Result<Vec<Event>, StorageError>;
}

/// The set of stores a request handler works against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub events: Arc<dyn EventStore>,
    pub attendees: Arc<dyn AttendeeStore>,
}

impl Stores {
    /// Uses one backend for all three stores.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserStore + EventStore + AttendeeStore + 'static,
    {
        Self {
            users: backend.clone(),
            events: backend.clone(),
            attendees: backend,
        }
    }

    /// Bounds every operation of every store by `deadline`.
    #[must_use]
    pub fn with_deadline(self, deadline: Duration) -> Self {
        Self {
            users: Arc::new(Timed::new(self.users, deadline)),
            events: Arc::new(Timed::new(self.events, deadline)),
            attendees: Arc::new(Timed::new(self.attendees, deadline)),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
