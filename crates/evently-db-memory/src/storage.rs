use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use evently_core::{
    Attendee, AttendeeId, Event, EventId, EventPatch, NewAttendee, NewEvent, NewUser, User,
    UserId, UserPatch, now_utc,
};
use evently_storage::{AttendeeStore, EventStore, StorageError, UserStore};
use papaya::HashMap as PapayaHashMap;
use tracing::debug;

/// In-memory Evently storage backend using papaya lock-free HashMaps.
///
/// Ids are allocated from a single counter shared by all record kinds, so
/// they are unique and increasing across the whole store.
#[derive(Debug)]
pub struct InMemoryStore {
    users: PapayaHashMap<UserId, User>,
    events: PapayaHashMap<EventId, Event>,
    attendees: PapayaHashMap<AttendeeId, Attendee>,
    id_counter: AtomicI64,
    /// Serializes writers so uniqueness checks and cascades are atomic.
    write_lock: Mutex<()>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: PapayaHashMap::new(),
            events: PapayaHashMap::new(),
            attendees: PapayaHashMap::new(),
            id_counter: AtomicI64::new(1),
            write_lock: Mutex::new(()),
        }
    }

    fn next_id(&self) -> i64 {
        self.id_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .pin()
            .iter()
            .any(|(id, u)| Some(*id) != except && u.email.eq_ignore_ascii_case(email))
    }

    fn insert_user(&self, new: NewUser) -> Result<User, StorageError> {
        let _guard = self.lock_writes();
        if self.email_taken(&new.email, None) {
            return Err(StorageError::conflict("email already registered"));
        }
        let user = User {
            id: self.next_id(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            created_at: now_utc(),
            updated_at: None,
        };
        self.users.pin().insert(user.id, user.clone());
        Ok(user)
    }

    fn patch_user(&self, id: UserId, patch: &UserPatch) -> Result<Option<User>, StorageError> {
        let _guard = self.lock_writes();
        let users = self.users.pin();
        let Some(mut user) = users.get(&id).cloned() else {
            return Ok(None);
        };
        if let Some(email) = &patch.email {
            if self.email_taken(email, Some(id)) {
                return Err(StorageError::conflict("email already registered"));
            }
        }
        patch.apply(&mut user, now_utc());
        users.insert(id, user.clone());
        Ok(Some(user))
    }

    fn remove_user(&self, id: UserId) -> bool {
        let _guard = self.lock_writes();
        if self.users.pin().remove(&id).is_none() {
            return false;
        }
        let owned: Vec<EventId> = self
            .events
            .pin()
            .iter()
            .filter(|(_, e)| e.user_id == id)
            .map(|(eid, _)| *eid)
            .collect();
        for event_id in &owned {
            self.remove_event_cascade(*event_id);
        }
        self.remove_attendees_where(|a| a.user_id == id);
        debug!(user_id = id, events = owned.len(), "Deleted user and owned events");
        true
    }

    fn remove_event_cascade(&self, id: EventId) -> bool {
        let removed = self.events.pin().remove(&id).is_some();
        if removed {
            self.remove_attendees_where(|a| a.event_id == id);
        }
        removed
    }

    fn remove_attendees_where(&self, pred: impl Fn(&Attendee) -> bool) {
        let attendees = self.attendees.pin();
        let doomed: Vec<AttendeeId> = attendees
            .iter()
            .filter(|(_, a)| pred(a))
            .map(|(id, _)| *id)
            .collect();
        for id in doomed {
            attendees.remove(&id);
        }
    }

    fn insert_event(&self, new: NewEvent) -> Event {
        let _guard = self.lock_writes();
        let event = Event {
            id: self.next_id(),
            user_id: new.user_id,
            name: new.name,
            description: new.description,
            date: new.date,
            location: new.location,
            created_at: now_utc(),
            updated_at: None,
        };
        self.events.pin().insert(event.id, event.clone());
        event
    }

    fn patch_event(&self, id: EventId, patch: &EventPatch) -> Option<Event> {
        let _guard = self.lock_writes();
        let events = self.events.pin();
        let mut event = events.get(&id).cloned()?;
        patch.apply(&mut event, now_utc());
        events.insert(id, event.clone());
        Some(event)
    }

    fn insert_attendee(&self, new: NewAttendee) -> Result<Attendee, StorageError> {
        let _guard = self.lock_writes();
        if self.find(new.event_id, new.user_id).is_some() {
            return Err(StorageError::conflict("user already attends this event"));
        }
        let attendee = Attendee {
            id: self.next_id(),
            user_id: new.user_id,
            event_id: new.event_id,
            created_at: now_utc(),
        };
        self.attendees.pin().insert(attendee.id, attendee.clone());
        Ok(attendee)
    }

    fn find(&self, event_id: EventId, user_id: UserId) -> Option<Attendee> {
        self.attendees
            .pin()
            .iter()
            .find(|(_, a)| a.event_id == event_id && a.user_id == user_id)
            .map(|(_, a)| a.clone())
    }

    fn sorted<K, V: Clone>(map: &PapayaHashMap<K, V>, key: impl Fn(&V) -> i64) -> Vec<V>
    where
        K: std::hash::Hash + Eq,
    {
        let mut values: Vec<V> = map.pin().iter().map(|(_, v)| v.clone()).collect();
        values.sort_by_key(|v| key(v));
        values
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.users.pin().get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(self
            .users
            .pin()
            .iter()
            .find(|(_, u)| u.email.eq_ignore_ascii_case(email))
            .map(|(_, u)| u.clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        Ok(Self::sorted(&self.users, |u| u.id))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        self.insert_user(user)
    }

    async fn update_user(
        &self,
        id: UserId,
        patch: &UserPatch,
    ) -> Result<Option<User>, StorageError> {
        self.patch_user(id, patch)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StorageError> {
        Ok(self.remove_user(id))
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, StorageError> {
        Ok(self.events.pin().get(&id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StorageError> {
        Ok(Self::sorted(&self.events, |e| e.id))
    }

    async fn create_event(&self, event: NewEvent) -> Result<Event, StorageError> {
        Ok(self.insert_event(event))
    }

    async fn update_event(
        &self,
        id: EventId,
        patch: &EventPatch,
    ) -> Result<Option<Event>, StorageError> {
        Ok(self.patch_event(id, patch))
    }

    async fn delete_event(&self, id: EventId) -> Result<bool, StorageError> {
        let _guard = self.lock_writes();
        Ok(self.remove_event_cascade(id))
    }
}

#[async_trait]
impl AttendeeStore for InMemoryStore {
    async fn get_attendee(&self, id: AttendeeId) -> Result<Option<Attendee>, StorageError> {
        Ok(self.attendees.pin().get(&id).cloned())
    }

    async fn list_attendees(&self) -> Result<Vec<Attendee>, StorageError> {
        Ok(Self::sorted(&self.attendees, |a| a.id))
    }

    async fn list_event_attendees(
        &self,
        event_id: EventId,
    ) -> Result<Vec<Attendee>, StorageError> {
        let mut attendees: Vec<Attendee> = self
            .attendees
            .pin()
            .iter()
            .filter(|(_, a)| a.event_id == event_id)
            .map(|(_, a)| a.clone())
            .collect();
        attendees.sort_by_key(|a| a.id);
        Ok(attendees)
    }

    async fn find_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<Attendee>, StorageError> {
        Ok(self.find(event_id, user_id))
    }

    async fn create_attendee(&self, attendee: NewAttendee) -> Result<Attendee, StorageError> {
        self.insert_attendee(attendee)
    }

    async fn delete_attendee(&self, id: AttendeeId) -> Result<bool, StorageError> {
        Ok(self.attendees.pin().remove(&id).is_some())
    }

    async fn list_user_events(&self, user_id: UserId) -> Result<Vec<Event>, StorageError> {
        let event_ids: Vec<EventId> = self
            .attendees
            .pin()
            .iter()
            .filter(|(_, a)| a.user_id == user_id)
            .map(|(_, a)| a.event_id)
            .collect();
        let events = self.events.pin();
        let mut attended: Vec<Event> = event_ids
            .iter()
            .filter_map(|id| events.get(id).cloned())
            .collect();
        attended.sort_by_key(|e| e.id);
        Ok(attended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use time::macros::datetime;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: "Tester".into(),
            password_hash: "hash".into(),
        }
    }

    fn new_event(owner: UserId) -> NewEvent {
        NewEvent {
            user_id: owner,
            name: "Meetup".into(),
            description: "Monthly Rust meetup".into(),
            date: datetime!(2025-01-15 18:00 UTC),
            location: "Berlin".into(),
        }
    }

    #[tokio::test]
    async fn create_and_read_user() {
        let store = InMemoryStore::new();
        let user = store.create_user(new_user("a@example.com")).await.unwrap();
        assert_eq!(store.get_user(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(
            store
                .get_user_by_email("A@Example.com")
                .await
                .unwrap()
                .map(|u| u.id),
            Some(user.id)
        );
        assert_eq!(store.get_user(999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let err = store
            .create_user(new_user("a@example.com"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn update_to_taken_email_conflicts() {
        let store = InMemoryStore::new();
        store.create_user(new_user("a@example.com")).await.unwrap();
        let b = store.create_user(new_user("b@example.com")).await.unwrap();
        let patch = UserPatch {
            email: Some("a@example.com".into()),
            ..Default::default()
        };
        assert!(store.update_user(b.id, &patch).await.unwrap_err().is_conflict());

        let own = UserPatch {
            email: Some("b@example.com".into()),
            name: Some("Bea".into()),
            ..Default::default()
        };
        let updated = store.update_user(b.id, &own).await.unwrap().unwrap();
        assert_eq!(updated.name, "Bea");
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn concurrent_registrations_allow_one_winner() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_user(new_user("race@example.com")).await
            }));
        }
        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn attendee_pair_is_unique() {
        let store = InMemoryStore::new();
        let owner = store.create_user(new_user("o@example.com")).await.unwrap();
        let event = store.create_event(new_event(owner.id)).await.unwrap();
        let pair = NewAttendee {
            event_id: event.id,
            user_id: owner.id,
        };
        store.create_attendee(pair).await.unwrap();
        assert!(store.create_attendee(pair).await.unwrap_err().is_conflict());
        assert!(store
            .find_attendee(event.id, owner.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn user_events_are_attended_events() {
        let store = InMemoryStore::new();
        let owner = store.create_user(new_user("o@example.com")).await.unwrap();
        let guest = store.create_user(new_user("g@example.com")).await.unwrap();
        let attended = store.create_event(new_event(owner.id)).await.unwrap();
        let _skipped = store.create_event(new_event(owner.id)).await.unwrap();
        store
            .create_attendee(NewAttendee {
                event_id: attended.id,
                user_id: guest.id,
            })
            .await
            .unwrap();

        let events = store.list_user_events(guest.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, attended.id);
        assert!(store.list_user_events(owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_user_cascades() {
        let store = InMemoryStore::new();
        let owner = store.create_user(new_user("o@example.com")).await.unwrap();
        let guest = store.create_user(new_user("g@example.com")).await.unwrap();
        let event = store.create_event(new_event(owner.id)).await.unwrap();
        store
            .create_attendee(NewAttendee {
                event_id: event.id,
                user_id: guest.id,
            })
            .await
            .unwrap();

        assert!(store.delete_user(owner.id).await.unwrap());
        assert!(store.get_event(event.id).await.unwrap().is_none());
        assert!(store.list_attendees().await.unwrap().is_empty());
        assert!(!store.delete_user(owner.id).await.unwrap());
    }

    #[tokio::test]
    async fn event_patch_and_delete() {
        let store = InMemoryStore::new();
        let owner = store.create_user(new_user("o@example.com")).await.unwrap();
        let event = store.create_event(new_event(owner.id)).await.unwrap();
        let patch = EventPatch {
            location: Some("Hamburg".into()),
            ..Default::default()
        };
        let updated = store.update_event(event.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.location, "Hamburg");
        assert_eq!(updated.name, event.name);
        assert!(store.update_event(999, &patch).await.unwrap().is_none());
        assert!(store.delete_event(event.id).await.unwrap());
        assert_eq!(store.list_events().await.unwrap(), vec![]);
    }
}
