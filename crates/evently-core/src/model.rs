//! Domain records and the store-level inputs that create or patch them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub type UserId = i64;
pub type EventId = i64;
pub type AttendeeId = i64;

// ============================================================================
// Users
// ============================================================================

/// A stored user, including the password hash.
///
/// `User` deliberately does not implement `Serialize`; anything leaving the
/// process goes through [`PublicUser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

impl User {
    /// Public snapshot of this user.
    pub fn to_public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// Read-only view of a user that is safe to return to clients and to cache.
///
/// The default value is the empty principal (id 0).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl PublicUser {
    /// True for the default placeholder principal.
    pub fn is_empty(&self) -> bool {
        self.id == 0 && self.email.is_empty()
    }
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            created_at: Some(user.created_at),
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Partial update of a user. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none() && self.password_hash.is_none()
    }

    pub fn apply(&self, user: &mut User, now: OffsetDateTime) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        user.updated_at = Some(now);
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    /// Owner of the event.
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub location: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl Event {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub date: OffsetDateTime,
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<OffsetDateTime>,
    pub location: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.location.is_none()
    }

    pub fn apply(&self, event: &mut Event, now: OffsetDateTime) {
        if let Some(name) = &self.name {
            event.name = name.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(location) = &self.location {
            event.location = location.clone();
        }
        event.updated_at = Some(now);
    }
}

// ============================================================================
// Attendees
// ============================================================================

/// Membership of a user in an event. `(event_id, user_id)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: AttendeeId,
    pub user_id: UserId,
    pub event_id: EventId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAttendee {
    pub event_id: EventId,
    pub user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn user() -> User {
        User {
            id: 7,
            email: "ada@example.com".into(),
            name: "Ada".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            created_at: datetime!(2024-05-01 10:00 UTC),
            updated_at: None,
        }
    }

    #[test]
    fn public_user_drops_password_hash() {
        let json = serde_json::to_string(&user().to_public()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.to_lowercase().contains("password"));
        assert!(json.contains("\"createdAt\":\"2024-05-01T10:00:00Z\""));
    }

    #[test]
    fn default_public_user_is_empty() {
        assert!(PublicUser::default().is_empty());
        assert!(!user().to_public().is_empty());
    }

    #[test]
    fn user_patch_only_touches_given_fields() {
        let mut u = user();
        let now = datetime!(2024-06-01 00:00 UTC);
        let patch = UserPatch {
            name: Some("Ada Lovelace".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut u, now);
        assert_eq!(u.name, "Ada Lovelace");
        assert_eq!(u.email, "ada@example.com");
        assert_eq!(u.updated_at, Some(now));
        assert!(UserPatch::default().is_empty());
    }

    #[test]
    fn event_ownership() {
        let event = Event {
            id: 1,
            user_id: 7,
            name: "RustConf".into(),
            description: "Annual Rust conference".into(),
            date: datetime!(2024-09-10 09:00 UTC),
            location: "Montreal".into(),
            created_at: datetime!(2024-05-01 10:00 UTC),
            updated_at: None,
        };
        assert!(event.is_owned_by(7));
        assert!(!event.is_owned_by(8));
    }
}
