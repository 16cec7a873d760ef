//! Record and blob storage seams.
//!
//! Every collection is reached through a repository trait so the services
//! run unchanged against Postgres or the in-memory tables.

pub mod blob;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{
    Blog, BlogStatus, Event, EventRegistration, EventStatus, GalleryCollection,
    PasswordResetRequest, Role, SeatReservation, User,
};

pub use blob::{BlobError, BlobRef, BlobStore, FsBlobStore};
#[cfg(test)]
pub use blob::MemoryBlobStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field (email, slug) already exists.
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlogFilter {
    All,
    Status(BlogStatus),
    Author(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryFilter {
    All,
    Featured,
    Category(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;

    async fn set_role(
        &self,
        id: Uuid,
        role: Role,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Promotes `id` to admin only while no admin exists. Returns whether
    /// the promotion happened.
    async fn promote_if_no_admin(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn count_admins(&self) -> Result<u64, StoreError>;

    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait ResetRepository: Send + Sync {
    async fn get(&self, email: &str) -> Result<Option<PasswordResetRequest>, StoreError>;

    /// Replaces any previous request for the same email.
    async fn put(&self, request: &PasswordResetRequest) -> Result<(), StoreError>;

    /// Returns the new attempt count, or `None` without an active request.
    async fn increment_attempts(&self, email: &str) -> Result<Option<u32>, StoreError>;

    /// Marks the request for `email` consumed if it still carries `code`
    /// and is unconsumed. Returns `false` when another caller got there first.
    async fn consume(&self, email: &str, code: &str) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait BlogRepository: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the slug is taken.
    async fn insert(&self, blog: &Blog) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Blog>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Blog>, StoreError>;

    async fn save(&self, blog: &Blog) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Newest first.
    async fn list(&self, filter: BlogFilter) -> Result<Vec<Blog>, StoreError>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: &Event) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError>;

    async fn save(&self, event: &Event) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Newest first.
    async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>, StoreError>;

    /// Increments the registration count unless capacity is reached.
    async fn reserve_seat(&self, id: Uuid, at: DateTime<Utc>)
        -> Result<SeatReservation, StoreError>;

    async fn insert_registration(&self, registration: &EventRegistration)
        -> Result<(), StoreError>;

    async fn list_registrations(&self, event_id: Uuid)
        -> Result<Vec<EventRegistration>, StoreError>;

    async fn delete_registrations(&self, event_id: Uuid) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait GalleryRepository: Send + Sync {
    async fn insert(&self, collection: &GalleryCollection) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<GalleryCollection>, StoreError>;

    async fn save(&self, collection: &GalleryCollection) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list(&self, filter: GalleryFilter) -> Result<Vec<GalleryCollection>, StoreError>;
}

/// Handles to every collection, backed by one store.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub resets: Arc<dyn ResetRepository>,
    pub blogs: Arc<dyn BlogRepository>,
    pub events: Arc<dyn EventRepository>,
    pub gallery: Arc<dyn GalleryRepository>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + ResetRepository
            + BlogRepository
            + EventRepository
            + GalleryRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            resets: store.clone(),
            blogs: store.clone(),
            events: store.clone(),
            gallery: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    pub fn postgres(pool: Arc<sqlx::PgPool>) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }
}
