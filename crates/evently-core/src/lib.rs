//! # evently-core
//!
//! Domain types shared by every Evently crate: users (principals), events and
//! attendees, the store-level inputs used to create and patch them, and the
//! field validation rules applied at the API boundary.

pub mod error;
pub mod model;
pub mod redact;
pub mod validate;

pub use error::{CoreError, Result};
pub use model::{
    Attendee, AttendeeId, Event, EventId, EventPatch, NewAttendee, NewEvent, NewUser, PublicUser,
    User, UserId, UserPatch,
};
pub use redact::redact_url;
pub use validate::{validate_email, validate_length, validate_min_length};

/// Current UTC time, truncated to whole microseconds so values survive a
/// round trip through PostgreSQL `TIMESTAMPTZ` unchanged.
pub fn now_utc() -> time::OffsetDateTime {
    let now = time::OffsetDateTime::now_utc();
    let micros = now.microsecond();
    now.replace_microsecond(micros).unwrap_or(now)
}
