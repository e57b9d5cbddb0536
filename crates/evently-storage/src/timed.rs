//! Deadline-bound store wrapper.
//!
//! Every call through [`Timed`] gets its own fresh deadline. When it elapses
//! the inner future is dropped and the caller sees `StorageError::Timeout`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evently_core::{
    Attendee, AttendeeId, Event, EventId, EventPatch, NewAttendee, NewEvent, NewUser, User,
    UserId, UserPatch,
};
use tracing::warn;

use crate::error::StorageError;
use crate::traits::{AttendeeStore, EventStore, UserStore};

/// Default per-operation store deadline.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// A store wrapper that bounds each operation by a deadline.
pub struct Timed<S: ?Sized> {
    inner: Arc<S>,
    deadline: Duration,
}

impl<S: ?Sized> Timed<S> {
    pub fn new(inner: Arc<S>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }

    /// Get a reference to the inner store.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Store operation exceeded its deadline"
                );
                Err(StorageError::timeout(operation, self.deadline))
            }
        }
    }
}

#[async_trait]
impl<S: UserStore + ?Sized> UserStore for Timed<S> {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        self.bounded("get_user", self.inner.get_user(id)).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        self.bounded("get_user_by_email", self.inner.get_user_by_email(email))
            .await
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        self.bounded("list_users", self.inner.list_users()).await
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        self.bounded("create_user", self.inner.create_user(user)).await
    }

    async fn update_user(
        &self,
        id: UserId,
        patch: &UserPatch,
    ) -> Result<Option<User>, StorageError> {
        self.bounded("update_user", self.inner.update_user(id, patch))
            .await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StorageError> {
        self.bounded("delete_user", self.inner.delete_user(id)).await
    }
}

#[async_trait]
impl<S: EventStore + ?Sized> EventStore for Timed<S> {
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        self.bounded("get_event", self.inner.get_event(id)).await
    }

    async fn list_events(&self) -> Result<Vec<Event>, StorageError> {
        self.bounded("list_events", self.inner.list_events()).await
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, StorageError> {
        self.bounded("create_event", self.inner.create_event(event))
            .await
    }

    async fn update_event(
        &self,
        id: EventId,
        patch: &EventPatch,
    ) -> Result<Option<Event>, StorageError> {
        self.bounded("update_event", self.inner.update_event(id, patch))
            .await
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StorageError> {
        self.bounded("delete_event", self.inner.delete_event(id)).await
    }
}

#[async_trait]
impl<S: AttendeeStore + ?Sized> AttendeeStore for Timed<S> {
    async fn get_attendee(&self, id: AttendeeId) -> Result<Option<Attendee>, StorageError> {
        self.bounded("get_attendee", self.inner.get_attendee(id)).await
    }

    async fn list_attendees(&self) -> Result<Vec<Attendee>, StorageError> {
        self.bounded("list_attendees", self.inner.list_attendees())
            .await
    }

    async fn list_event_attendees(
        &self,
        event_id: EventId,
    ) -> Result<Vec<Attendee>, StorageError> {
        self.bounded(
            "list_event_attendees",
            self.inner.list_event_attendees(event_id),
        )
        .await
    }

    async fn find_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Attendee>, StorageError> {
        self.bounded("find_attendee", self.inner.find_attendee(event_id, user_id))
            .await
    }

    async fn create_attendee(&self, attendee: NewAttendee) -> Result<Attendee, StorageError> {
        self.bounded("create_attendee", self.inner.create_attendee(attendee))
            .await
    }

    async fn delete_attendee(&self, id: AttendeeId) -> Result<bool, StorageError> {
        self.bounded("delete_attendee", self.inner.delete_attendee(id))
            .await
    }

    async fn list_user_events(&self, user_id: UserId) -> Result<Vec<Event>, StorageError> {
        self.bounded("list_user_events", self.inner.list_user_events(user_id))
            .await
    }
}
