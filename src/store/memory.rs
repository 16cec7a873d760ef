//! In-memory record store, used when no database is configured and in tests.
//!
//! All tables sit behind one lock, so check-then-write sequences inside a
//! single method are atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    BlogFilter, BlogRepository, EventRepository, GalleryFilter, GalleryRepository,
    ResetRepository, StoreError, UserRepository,
};
use crate::db::models::{
    Blog, Event, EventRegistration, EventStatus, GalleryCollection, PasswordResetRequest, Role,
    SeatReservation, User,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    resets: HashMap<String, PasswordResetRequest>,
    blogs: HashMap<Uuid, Blog>,
    events: HashMap<Uuid, Event>,
    registrations: Vec<EventRegistration>,
    gallery: HashMap<Uuid, GalleryCollection>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn set_role(
        &self,
        id: Uuid,
        role: Role,
        at: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.role = role;
            user.updated_at = at;
            user.clone()
        }))
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn promote_if_no_admin(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.role == Role::Admin) {
            return Ok(false);
        }
        match tables.users.get_mut(&id) {
            Some(user) => {
                user.role = Role::Admin;
                user.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_admins(&self) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().filter(|u| u.role == Role::Admin).count() as u64)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let users = self.tables.read().await.users.values().cloned().collect();
        Ok(newest_first(users, |u: &User| u.created_at))
    }
}

#[async_trait]
impl ResetRepository for MemoryStore {
    async fn get(&self, email: &str) -> Result<Option<PasswordResetRequest>, StoreError> {
        Ok(self.tables.read().await.resets.get(email).cloned())
    }

    async fn put(&self, request: &PasswordResetRequest) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .resets
            .insert(request.email.clone(), request.clone());
        Ok(())
    }

    async fn increment_attempts(&self, email: &str) -> Result<Option<u32>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.resets.get_mut(email).map(|request| {
            request.attempts += 1;
            request.attempts
        }))
    }

    async fn consume(&self, email: &str, code: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.resets.get_mut(email) {
            Some(request) if request.code == code && !request.consumed => {
                request.consumed = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl BlogRepository for MemoryStore {
    async fn insert(&self, blog: &Blog) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.blogs.values().any(|b| b.slug == blog.slug) {
            return Err(StoreError::Duplicate("slug"));
        }
        tables.blogs.insert(blog.id, blog.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Blog>, StoreError> {
        Ok(self.tables.read().await.blogs.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Blog>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.blogs.values().find(|b| b.slug == slug).cloned())
    }

    async fn save(&self, blog: &Blog) -> Result<(), StoreError> {
        self.tables.write().await.blogs.insert(blog.id, blog.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.blogs.remove(&id).is_some())
    }

    async fn list(&self, filter: BlogFilter) -> Result<Vec<Blog>, StoreError> {
        let tables = self.tables.read().await;
        let blogs = tables
            .blogs
            .values()
            .filter(|b| match &filter {
                BlogFilter::All => true,
                BlogFilter::Status(status) => b.status == *status,
                BlogFilter::Author(author) => b.author_id == *author,
            })
            .cloned()
            .collect();
        Ok(newest_first(blogs, |b: &Blog| b.created_at))
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn insert(&self, event: &Event) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.events.values().any(|e| e.slug == event.slug) {
            return Err(StoreError::Duplicate("slug"));
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.events.values().find(|e| e.slug == slug).cloned())
    }

    async fn save(&self, event: &Event) -> Result<(), StoreError> {
        self.tables.write().await.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.events.remove(&id).is_some())
    }

    async fn list(&self, status: Option<EventStatus>) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        let events = tables
            .events
            .values()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        Ok(newest_first(events, |e: &Event| e.created_at))
    }

    async fn reserve_seat(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<SeatReservation, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(SeatReservation::NoSuchEvent);
        };
        if let Some(capacity) = event.capacity {
            if event.registrations >= capacity {
                return Ok(SeatReservation::Full);
            }
        }
        event.registrations += 1;
        event.updated_at = at;
        Ok(SeatReservation::Reserved)
    }

    async fn insert_registration(
        &self,
        registration: &EventRegistration,
    ) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .registrations
            .push(registration.clone());
        Ok(())
    }

    async fn list_registrations(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<EventRegistration>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn delete_registrations(&self, event_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.registrations.len();
        tables.registrations.retain(|r| r.event_id != event_id);
        Ok((before - tables.registrations.len()) as u64)
    }
}

#[async_trait]
impl GalleryRepository for MemoryStore {
    async fn insert(&self, collection: &GalleryCollection) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .gallery
            .insert(collection.id, collection.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<GalleryCollection>, StoreError> {
        Ok(self.tables.read().await.gallery.get(&id).cloned())
    }

    async fn save(&self, collection: &GalleryCollection) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .gallery
            .insert(collection.id, collection.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.gallery.remove(&id).is_some())
    }

    async fn list(&self, filter: GalleryFilter) -> Result<Vec<GalleryCollection>, StoreError> {
        let tables = self.tables.read().await;
        let collections = tables
            .gallery
            .values()
            .filter(|g| match &filter {
                GalleryFilter::All => true,
                GalleryFilter::Featured => g.featured,
                GalleryFilter::Category(category) => g.category == *category,
            })
            .cloned()
            .collect();
        Ok(newest_first(collections, |g: &GalleryCollection| g.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Test".to_string(),
            password_hash: "digest".to_string(),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, &user("a@example.org", Role::User))
            .await
            .unwrap();
        let err = UserRepository::insert(&store, &user("a@example.org", Role::User)).await;
        assert!(matches!(err, Err(StoreError::Duplicate("email"))));
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let store = MemoryStore::new();
        UserRepository::insert(&store, &user("Case@example.org", Role::User))
            .await
            .unwrap();
        assert!(store.find_by_email("case@example.org").await.unwrap().is_none());
        assert!(store.find_by_email("Case@example.org").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_promote_if_no_admin_only_once() {
        let store = MemoryStore::new();
        let first = user("first@example.org", Role::User);
        let second = user("second@example.org", Role::User);
        UserRepository::insert(&store, &first).await.unwrap();
        UserRepository::insert(&store, &second).await.unwrap();

        assert!(store.promote_if_no_admin(first.id, Utc::now()).await.unwrap());
        assert!(!store.promote_if_no_admin(second.id, Utc::now()).await.unwrap());
        assert_eq!(store.count_admins().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .put(&PasswordResetRequest {
                email: "a@example.org".to_string(),
                code: "123456".to_string(),
                created_at: now,
                expires_at: now,
                attempts: 0,
                consumed: false,
            })
            .await
            .unwrap();

        assert!(!store.consume("a@example.org", "000000").await.unwrap());
        assert!(store.consume("a@example.org", "123456").await.unwrap());
        assert!(!store.consume("a@example.org", "123456").await.unwrap());
    }
}
