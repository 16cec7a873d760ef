//! Postgres-backed repositories.
//!
//! Uniqueness comes from the indexes created in `db::run_migrations`;
//! conditional updates keep the admin, reset-code and seat invariants in a
//! single statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    BlobRef, BlogFilter, BlogRepository, EventRepository, GalleryFilter, GalleryRepository,
    ResetRepository, StoreError, UserRepository,
};
use crate::db::models::{
    Blog, Event, EventRegistration, EventStatus, GalleryCollection, GalleryImage,
    PasswordResetRequest, Role, SeatReservation, User,
};

pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }
}

/// Maps a unique-index violation onto [`StoreError::Duplicate`].
fn unique_violation(err: sqlx::Error, field: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Duplicate(field)
        }
        _ => StoreError::Database(err),
    }
}

// ============================================================================
// Row types
// ============================================================================

/// Advisory lock key held while checking for and promoting the first admin.
const PROMOTE_LOCK_KEY: i64 = 0x6164_6d69_6e;

const USER_COLUMNS: &str = "id, email, name, password_hash, role, created_at, updated_at";

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ResetRow {
    email: String,
    code: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    attempts: i32,
    consumed: bool,
}

impl From<ResetRow> for PasswordResetRequest {
    fn from(row: ResetRow) -> Self {
        PasswordResetRequest {
            email: row.email,
            code: row.code,
            created_at: row.created_at,
            expires_at: row.expires_at,
            attempts: row.attempts.max(0) as u32,
            consumed: row.consumed,
        }
    }
}

const BLOG_COLUMNS: &str = "id, title, slug, excerpt, content, content_storage_id, author_id, \
     author_name, featured_image, featured_image_storage_id, tags, status, published_at, \
     created_at, updated_at";

#[derive(FromRow)]
struct BlogRow {
    id: Uuid,
    title: String,
    slug: String,
    excerpt: String,
    content: Option<String>,
    content_storage_id: Option<String>,
    author_id: Uuid,
    author_name: Option<String>,
    featured_image: Option<String>,
    featured_image_storage_id: Option<String>,
    tags: Vec<String>,
    status: String,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BlogRow> for Blog {
    type Error = StoreError;

    fn try_from(row: BlogRow) -> Result<Self, Self::Error> {
        Ok(Blog {
            id: row.id,
            title: row.title,
            slug: row.slug,
            excerpt: row.excerpt,
            content: row.content,
            content_storage_id: row.content_storage_id.map(BlobRef::new),
            author_id: row.author_id,
            author_name: row.author_name,
            featured_image: row.featured_image,
            featured_image_storage_id: row.featured_image_storage_id.map(BlobRef::new),
            tags: row.tags,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const EVENT_COLUMNS: &str = "id, title, slug, description, start_date, end_date, location, \
     image, image_storage_id, capacity, registrations, status, organizer_id, created_at, updated_at";

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    slug: String,
    description: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    location: String,
    image: Option<String>,
    image_storage_id: Option<String>,
    capacity: Option<i32>,
    registrations: i32,
    status: String,
    organizer_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            title: row.title,
            slug: row.slug,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            location: row.location,
            image: row.image,
            image_storage_id: row.image_storage_id.map(BlobRef::new),
            capacity: row.capacity,
            registrations: row.registrations,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            organizer_id: row.organizer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct RegistrationRow {
    id: Uuid,
    event_id: Uuid,
    user_name: String,
    user_email: String,
    phone: Option<String>,
    registered_at: DateTime<Utc>,
}

impl From<RegistrationRow> for EventRegistration {
    fn from(row: RegistrationRow) -> Self {
        EventRegistration {
            id: row.id,
            event_id: row.event_id,
            user_name: row.user_name,
            user_email: row.user_email,
            phone: row.phone,
            registered_at: row.registered_at,
        }
    }
}

const GALLERY_COLUMNS: &str =
    "id, title, description, category, images, featured, created_by, created_at, updated_at";

#[derive(FromRow)]
struct GalleryRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    category: String,
    images: Json<Vec<GalleryImage>>,
    featured: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<GalleryRow> for GalleryCollection {
    fn from(row: GalleryRow) -> Self {
        GalleryCollection {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            images: row.images.0,
            featured: row.featured,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// ============================================================================
// Users
// ============================================================================

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| unique_violation(e, "email"))?;
        Ok(())
    }

    async fn set_role(
        &self,
        id: Uuid,
        role: Role,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(at)
        .fetch_optional(self.pool())
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .bind(at)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Concurrent callers are serialised on [`PROMOTE_LOCK_KEY`].
    async fn promote_if_no_admin(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(PROMOTE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query(
            r#"
            UPDATE users SET role = 'admin', updated_at = $2
            WHERE id = $1
              AND NOT EXISTS (SELECT 1 FROM users WHERE role = 'admin')
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count_admins(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(self.pool())
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }
}

// ============================================================================
// Password resets
// ============================================================================

#[async_trait]
impl ResetRepository for PgStore {
    async fn get(&self, email: &str) -> Result<Option<PasswordResetRequest>, StoreError> {
        let row = sqlx::query_as::<_, ResetRow>(
            r#"
            SELECT email, code, created_at, expires_at, attempts, consumed
            FROM password_resets WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(PasswordResetRequest::from))
    }

    async fn put(&self, request: &PasswordResetRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (email, code, created_at, expires_at, attempts, consumed)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO UPDATE SET
                code = EXCLUDED.code,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at,
                attempts = EXCLUDED.attempts,
                consumed = EXCLUDED.consumed
            "#,
        )
        .bind(&request.email)
        .bind(&request.code)
        .bind(request.created_at)
        .bind(request.expires_at)
        .bind(request.attempts as i32)
        .bind(request.consumed)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn increment_attempts(&self, email: &str) -> Result<Option<u32>, StoreError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE password_resets SET attempts = attempts + 1 WHERE email = $1 RETURNING attempts",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|(attempts,)| attempts.max(0) as u32))
    }

    async fn consume(&self, email: &str, code: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE password_resets SET consumed = true
            WHERE email = $1 AND code = $2 AND consumed = false
            "#,
        )
        .bind(email)
        .bind(code)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

// ============================================================================
// Blogs
// ============================================================================

#[async_trait]
impl BlogRepository for PgStore {
    async fn insert(&self, blog: &Blog) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO blogs ({BLOG_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(blog.id)
        .bind(&blog.title)
        .bind(&blog.slug)
        .bind(&blog.excerpt)
        .bind(&blog.content)
        .bind(blog.content_storage_id.as_ref().map(BlobRef::as_str))
        .bind(blog.author_id)
        .bind(&blog.author_name)
        .bind(&blog.featured_image)
        .bind(blog.featured_image_storage_id.as_ref().map(BlobRef::as_str))
        .bind(&blog.tags)
        .bind(blog.status.as_str())
        .bind(blog.published_at)
        .bind(blog.created_at)
        .bind(blog.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| unique_violation(e, "slug"))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Blog>, StoreError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Blog::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Blog>, StoreError> {
        let row = sqlx::query_as::<_, BlogRow>(&format!(
            "SELECT {BLOG_COLUMNS} FROM blogs WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await?;
        row.map(Blog::try_from).transpose()
    }

    async fn save(&self, blog: &Blog) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE blogs SET
                title = $2, slug = $3, excerpt = $4, content = $5, content_storage_id = $6,
                author_name = $7, featured_image = $8, featured_image_storage_id = $9,
                tags = $10, status = $11, published_at = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(blog.id)
        .bind(&blog.title)
        .bind(&blog.slug)
        .bind(&blog.excerpt)
        .bind(&blog.content)
        .bind(blog.content_storage_id.as_ref().map(BlobRef::as_str))
        .bind(&blog.author_name)
        .bind(&blog.featured_image)
        .bind(blog.featured_image_storage_id.as_ref().map(BlobRef::as_str))
        .bind(&blog.tags)
        .bind(blog.status.as_str())
        .bind(blog.published_at)
        .bind(blog.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| unique_violation(e, "slug"))?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, filter: BlogFilter) -> Result<Vec<Blog>, StoreError> {
        let rows = match filter {
            BlogFilter::All => {
                sqlx::query_as::<_, BlogRow>(&format!(
                    "SELECT {BLOG_COLUMNS} FROM blogs ORDER BY created_at DESC"
                ))
                .fetch_all(self.pool())
                .await?
            }
            BlogFilter::Status(status) => {
                sqlx::query_as::<_, BlogRow>(&format!(
                    "SELECT {BLOG_COLUMNS} FROM blogs WHERE status = $1 ORDER BY created_at DESC"
                ))
                .bind(status.as_str())
                .fetch_all(self.pool())
                .await?
            }
            BlogFilter::Author(author_id) => {
                sqlx::query_as::<_, BlogRow>(&format!(
                    "SELECT {BLOG_COLUMNS} FROM blogs WHERE author_id = $1 ORDER BY created_at DESC"
                ))
                .bind(author_id)
                .fetch_all(self.pool())
                .await?
            }
        };
        rows.into_iter().map(Blog::try_from).collect()
    }
}

// ============================================================================
// Events
// ============================================================================

#[async_trait]
impl EventRepository for PgStore {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.slug)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location)
        .bind(&event.image)
        .bind(event.image_storage_id.as_ref().map(BlobRef::as_str))
        .bind(event.capacity)
        .bind(event.registrations)
        .bind(event.status.as_str())
        .bind(event.organizer_id)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| unique_violation(e, "slug"))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn save(&self, event: &Event) -> Result<(), StoreError> {
        // The registration counter is owned by reserve_seat.
        sqlx::query(
            r#"
            UPDATE events SET
                title = $2, slug = $3, description = $4, start_date = $5, end_date = $6,
                location = $7, image = $8, image_storage_id = $9, capacity = $10,
                status = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.slug)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.location)
        .bind(&event.image)
        .bind(event.image_storage_id.as_ref().map(BlobRef::as_str))
        .bind(event.capacity)
        .bind(event.status.as_str())
        .bind(event.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| unique_violation(e, "slug"))?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>, StoreError> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, EventRow>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE status = $1 ORDER BY created_at DESC"
                ))
                .bind(status.as_str())
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, EventRow>(&format!(
                    "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at DESC"
                ))
                .fetch_all(self.pool())
                .await?
            }
        };
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn reserve_seat(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SeatReservation, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE events SET registrations = registrations + 1, updated_at = $2
            WHERE id = $1 AND (capacity IS NULL OR registrations < capacity)
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 1 {
            return Ok(SeatReservation::Reserved);
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(match exists {
            Some(_) => SeatReservation::Full,
            None => SeatReservation::NoSuchEvent,
        })
    }

    async fn insert_registration(
        &self,
        registration: &EventRegistration,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO event_registrations (id, event_id, user_name, user_email, phone, registered_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(registration.id)
        .bind(registration.event_id)
        .bind(&registration.user_name)
        .bind(&registration.user_email)
        .bind(&registration.phone)
        .bind(registration.registered_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn list_registrations(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<EventRegistration>, StoreError> {
        let rows = sqlx::query_as::<_, RegistrationRow>(
            r#"
            SELECT id, event_id, user_name, user_email, phone, registered_at
            FROM event_registrations WHERE event_id = $1
            ORDER BY registered_at ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(EventRegistration::from).collect())
    }

    async fn delete_registrations(&self, event_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM event_registrations WHERE event_id = $1")
            .bind(event_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Gallery
// ============================================================================

#[async_trait]
impl GalleryRepository for PgStore {
    async fn insert(&self, collection: &GalleryCollection) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO gallery_collections ({GALLERY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(collection.id)
        .bind(&collection.title)
        .bind(&collection.description)
        .bind(&collection.category)
        .bind(Json(&collection.images))
        .bind(collection.featured)
        .bind(collection.created_by)
        .bind(collection.created_at)
        .bind(collection.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<GalleryCollection>, StoreError> {
        let row = sqlx::query_as::<_, GalleryRow>(&format!(
            "SELECT {GALLERY_COLUMNS} FROM gallery_collections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(GalleryCollection::from))
    }

    async fn save(&self, collection: &GalleryCollection) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE gallery_collections SET
                title = $2, description = $3, category = $4, images = $5,
                featured = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(collection.id)
        .bind(&collection.title)
        .bind(&collection.description)
        .bind(&collection.category)
        .bind(Json(&collection.images))
        .bind(collection.featured)
        .bind(collection.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM gallery_collections WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list(&self, filter: GalleryFilter) -> Result<Vec<GalleryCollection>, StoreError> {
        let rows = match filter {
            GalleryFilter::All => {
                sqlx::query_as::<_, GalleryRow>(&format!(
                    "SELECT {GALLERY_COLUMNS} FROM gallery_collections ORDER BY created_at DESC"
                ))
                .fetch_all(self.pool())
                .await?
            }
            GalleryFilter::Featured => {
                sqlx::query_as::<_, GalleryRow>(&format!(
                    "SELECT {GALLERY_COLUMNS} FROM gallery_collections \
                     WHERE featured = true ORDER BY created_at DESC"
                ))
                .fetch_all(self.pool())
                .await?
            }
            GalleryFilter::Category(category) => {
                sqlx::query_as::<_, GalleryRow>(&format!(
                    "SELECT {GALLERY_COLUMNS} FROM gallery_collections \
                     WHERE category = $1 ORDER BY created_at DESC"
                ))
                .bind(category)
                .fetch_all(self.pool())
                .await?
            }
        };
        Ok(rows.into_iter().map(GalleryCollection::from).collect())
    }
}
