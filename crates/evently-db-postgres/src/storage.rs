//! `PgStore`: the sqlx implementation of the Evently store traits.

use std::time::Duration;

use async_trait::async_trait;
use evently_core::{
    Attendee, AttendeeId, Event, EventId, EventPatch, NewAttendee, NewEvent, NewUser, User,
    UserId, UserPatch,
};
use evently_storage::{AttendeeStore, EventStore, StorageError, UserStore};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::{Result, map_sqlx_error};
use crate::migrations;

// =============================================================================
// Rows
// =============================================================================

type UserRow = (
    i64,
    String,
    String,
    String,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

type EventRow = (
    i64,
    i64,
    String,
    String,
    OffsetDateTime,
    String,
    OffsetDateTime,
    Option<OffsetDateTime>,
);

type AttendeeRow = (i64, i64, i64, OffsetDateTime);

const USER_COLUMNS: &str = "id, email, name, password_hash, created_at, updated_at";
const EVENT_COLUMNS: &str = "id, user_id, name, description, date, location, created_at, updated_at";
const ATTENDEE_COLUMNS: &str = "id, user_id, event_id, created_at";

fn user_from_row(row: UserRow) -> User {
    User {
        id: row.0,
        email: row.1,
        name: row.2,
        password_hash: row.3,
        created_at: row.4,
        updated_at: row.5,
    }
}

fn event_from_row(row: EventRow) -> Event {
    Event {
        id: row.0,
        user_id: row.1,
        name: row.2,
        description: row.3,
        date: row.4,
        location: row.5,
        created_at: row.6,
        updated_at: row.7,
    }
}

fn attendee_from_row(row: AttendeeRow) -> Attendee {
    Attendee {
        id: row.0,
        user_id: row.1,
        event_id: row.2,
        created_at: row.3,
    }
}

// =============================================================================
// Store
// =============================================================================

/// PostgreSQL-backed store for users, events and attendees.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the pool, checks it with a round trip and, if configured, runs
    /// the embedded migrations.
    ///
    /// `operation_timeout` is the storage deadline; it also bounds how long a
    /// call may wait for a pooled connection.
    #[instrument(skip_all, fields(url = %config.redacted_url()))]
    pub async fn connect(config: &PostgresConfig, operation_timeout: Duration) -> Result<Self> {
        info!(
            pool_size = config.pool_size,
            acquire_timeout = ?operation_timeout,
            "Connecting to PostgreSQL"
        );
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(config.pool_size)
            .acquire_timeout(operation_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&config.url)
            .await?;

        let store = Self::new(pool);
        store.ping().await?;
        if config.run_migrations {
            migrations::run(&store.pool).await?;
        }
        debug!("PostgreSQL store ready");
        Ok(store)
    }

    /// Round-trips `SELECT 1`.
    pub async fn ping(&self) -> Result<()> {
        query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    #[instrument(skip(self))]
    async fn get_user(&self, id: UserId) -> std::result::Result<Option<User>, StorageError> {
        let row: Option<UserRow> =
            query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(user_from_row))
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> std::result::Result<Option<User>, StorageError> {
        let row: Option<UserRow> = query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(user_from_row))
    }

    async fn list_users(&self) -> std::result::Result<Vec<User>, StorageError> {
        let rows: Vec<UserRow> = query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(user_from_row).collect())
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> std::result::Result<User, StorageError> {
        let row: UserRow = query_as(&format!(
            "INSERT INTO users (email, name, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(user_from_row(row))
    }

    #[instrument(skip(self, patch))]
    async fn update_user(
        &self,
        id: UserId,
        patch: &UserPatch,
    ) -> std::result::Result<Option<User>, StorageError> {
        let row: Option<UserRow> = query_as(&format!(
            "UPDATE users SET \
                 email = COALESCE($2, email), \
                 name = COALESCE($3, name), \
                 password_hash = COALESCE($4, password_hash), \
                 updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.email.as_deref())
        .bind(patch.name.as_deref())
        .bind(patch.password_hash.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(user_from_row))
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, id: UserId) -> std::result::Result<bool, StorageError> {
        let result = query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl EventStore for PgStore {
    #[instrument(skip(self))]
    async fn get_event(&self, id: EventId) -> std::result::Result<Option<Event>, StorageError> {
        let row: Option<EventRow> =
            query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(event_from_row))
    }

    async fn list_events(&self) -> std::result::Result<Vec<Event>, StorageError> {
        let rows: Vec<EventRow> =
            query_as(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(event_from_row).collect())
    }

    #[instrument(skip(self, event), fields(owner = event.user_id))]
    async fn create_event(&self, event: NewEvent) -> std::result::Result<Event, StorageError> {
        let row: EventRow = query_as(&format!(
            "INSERT INTO events (user_id, name, description, date, location) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.user_id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(event_from_row(row))
    }

    #[instrument(skip(self, patch))]
    async fn update_event(
        &self,
        id: EventId,
        patch: &EventPatch,
    ) -> std::result::Result<Option<Event>, StorageError> {
        let row: Option<EventRow> = query_as(&format!(
            "UPDATE events SET \
                 name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 date = COALESCE($4, date), \
                 location = COALESCE($5, location), \
                 updated_at = now() \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.date)
        .bind(patch.location.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(event_from_row))
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, id: EventId) -> std::result::Result<bool, StorageError> {
        let result = query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AttendeeStore for PgStore {
    #[instrument(skip(self))]
    async fn get_attendee(
        &self,
        id: AttendeeId,
    ) -> std::result::Result<Option<Attendee>, StorageError> {
        let row: Option<AttendeeRow> =
            query_as(&format!("SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(attendee_from_row))
    }

    async fn list_attendees(&self) -> std::result::Result<Vec<Attendee>, StorageError> {
        let rows: Vec<AttendeeRow> =
            query_as(&format!("SELECT {ATTENDEE_COLUMNS} FROM attendees ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(attendee_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn list_event_attendees(
        &self,
        event_id: EventId,
    ) -> std::result::Result<Vec<Attendee>, StorageError> {
        let rows: Vec<AttendeeRow> = query_as(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = $1 ORDER BY id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(attendee_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn find_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> std::result::Result<Option<Attendee>, StorageError> {
        let row: Option<AttendeeRow> = query_as(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = $1 AND user_id = $2"
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(attendee_from_row))
    }

    #[instrument(skip(self))]
    async fn create_attendee(
        &self,
        attendee: NewAttendee,
    ) -> std::result::Result<Attendee, StorageError> {
        let row: AttendeeRow = query_as(&format!(
            "INSERT INTO attendees (event_id, user_id) VALUES ($1, $2) \
             RETURNING {ATTENDEE_COLUMNS}"
        ))
        .bind(attendee.event_id)
        .bind(attendee.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(attendee_from_row(row))
    }

    #[instrument(skip(self))]
    async fn delete_attendee(&self, id: AttendeeId) -> std::result::Result<bool, StorageError> {
        let result = query("DELETE FROM attendees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_user_events(
        &self,
        user_id: UserId,
    ) -> std::result::Result<Vec<Event>, StorageError> {
        let rows: Vec<EventRow> = query_as(
            "SELECT e.id, e.user_id, e.name, e.description, e.date, e.location, \
                    e.created_at, e.updated_at \
             FROM events e JOIN attendees a ON a.event_id = e.id \
             WHERE a.user_id = $1 ORDER BY e.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(event_from_row).collect())
    }
}
