//! Events and public registrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::auth::require_admin;
use super::blogs::validate_slug;
use super::content::{assert_within_limit, release_blob};
use super::{resolve_url, SharedBlobs};
use crate::db::models::{Event, EventRegistration, EventStatus, SeatReservation};
use crate::error::AppError;
use crate::store::{BlobRef, EventRepository, StoreError, UserRepository};

const SIZE_KIND: &str = "Event";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: String,
    pub image: Option<String>,
    pub image_storage_id: Option<BlobRef>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub image: Option<String>,
    pub image_storage_id: Option<BlobRef>,
    pub capacity: Option<i32>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationInput {
    pub user_name: String,
    pub user_email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub image_url: Option<String>,
}

fn validate_capacity(capacity: Option<i32>) -> Result<(), AppError> {
    match capacity {
        Some(c) if c < 1 => Err(AppError::Validation(
            "Capacity must be at least 1".to_string(),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct EventService {
    users: Arc<dyn UserRepository>,
    events: Arc<dyn EventRepository>,
    blobs: SharedBlobs,
}

impl EventService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        events: Arc<dyn EventRepository>,
        blobs: SharedBlobs,
    ) -> Self {
        Self {
            users,
            events,
            blobs,
        }
    }

    pub async fn create_event(
        &self,
        actor_email: &str,
        input: CreateEventInput,
    ) -> Result<EventView, AppError> {
        let organizer = require_admin(self.users.as_ref(), actor_email, "create events").await?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        validate_slug(&input.slug)?;
        validate_capacity(input.capacity)?;
        if self.events.find_by_slug(&input.slug).await?.is_some() {
            return Err(AppError::Conflict(
                "An event with this slug already exists".to_string(),
            ));
        }

        let (image, image_storage_id) = match input.image_storage_id {
            Some(blob) => (None, Some(blob)),
            None => (input.image.filter(|url| !url.is_empty()), None),
        };
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: input.slug,
            description: input.description,
            start_date: input.start_date,
            end_date: input.end_date,
            location: input.location,
            image,
            image_storage_id,
            capacity: input.capacity,
            registrations: 0,
            status: EventStatus::Upcoming,
            organizer_id: organizer.id,
            created_at: now,
            updated_at: now,
        };

        assert_within_limit(SIZE_KIND, &event)?;
        match self.events.insert(&event).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(AppError::Conflict(
                    "An event with this slug already exists".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(event_id = %event.id, slug = %event.slug, "event created");
        Ok(self.view(event).await)
    }

    pub async fn update_event(
        &self,
        actor_email: &str,
        event_id: Uuid,
        patch: UpdateEventInput,
    ) -> Result<EventView, AppError> {
        require_admin(self.users.as_ref(), actor_email, "update events").await?;
        let mut event = self.find(event_id).await?;
        let mut stale: Option<BlobRef> = None;

        if let Some(title) = patch.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::Validation("Title is required".to_string()));
            }
            event.title = title.to_string();
        }
        if let Some(description) = patch.description {
            event.description = description;
        }
        if let Some(start_date) = patch.start_date {
            event.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            event.end_date = Some(end_date);
        }
        if let Some(location) = patch.location {
            event.location = location;
        }
        if let Some(capacity) = patch.capacity {
            validate_capacity(Some(capacity))?;
            event.capacity = Some(capacity);
        }
        if let Some(status) = patch.status {
            event.status = status;
        }

        if let Some(blob) = patch.image_storage_id {
            if event.image_storage_id.as_ref() != Some(&blob) {
                stale = event.image_storage_id.replace(blob);
            }
            event.image = None;
        } else if let Some(url) = patch.image {
            stale = event.image_storage_id.take();
            event.image = Some(url).filter(|url| !url.is_empty());
        }
        event.updated_at = Utc::now();

        assert_within_limit(SIZE_KIND, &event)?;
        self.events.save(&event).await?;
        if let Some(old) = stale.as_ref() {
            release_blob(self.blobs.as_ref(), old).await;
        }

        tracing::info!(event_id = %event.id, "event updated");
        Ok(self.view(event).await)
    }

    /// Releases the image, drops registrations, then removes the event.
    pub async fn delete_event(&self, actor_email: &str, event_id: Uuid) -> Result<Uuid, AppError> {
        require_admin(self.users.as_ref(), actor_email, "delete events").await?;
        let event = self.find(event_id).await?;

        if let Some(blob) = event.image_storage_id.as_ref() {
            release_blob(self.blobs.as_ref(), blob).await;
        }
        let removed = self.events.delete_registrations(event_id).await?;
        self.events.delete(event_id).await?;

        tracing::info!(event_id = %event_id, registrations = removed, "event deleted");
        Ok(event_id)
    }

    /// Upcoming events, newest first.
    pub async fn get_public_events(&self) -> Result<Vec<EventView>, AppError> {
        self.views(Some(EventStatus::Upcoming)).await
    }

    pub async fn get_event_by_slug(&self, slug: &str) -> Result<Option<EventView>, AppError> {
        match self.events.find_by_slug(slug).await? {
            Some(event) => Ok(Some(self.view(event).await)),
            None => Ok(None),
        }
    }

    pub async fn get_all_events(&self, actor_email: &str) -> Result<Vec<EventView>, AppError> {
        require_admin(self.users.as_ref(), actor_email, "view all events").await?;
        self.views(None).await
    }

    /// Public. The seat is claimed atomically before the registration is
    /// recorded.
    pub async fn register_for_event(
        &self,
        event_id: Uuid,
        input: RegistrationInput,
    ) -> Result<EventRegistration, AppError> {
        let user_name = input.user_name.trim();
        if user_name.is_empty() {
            return Err(AppError::Validation("Name is required".to_string()));
        }
        if !input.user_email.contains('@') {
            return Err(AppError::Validation("A valid email is required".to_string()));
        }

        let now = Utc::now();
        match self.events.reserve_seat(event_id, now).await? {
            SeatReservation::Reserved => {}
            SeatReservation::Full => {
                return Err(AppError::Conflict("Event is at full capacity".to_string()))
            }
            SeatReservation::NoSuchEvent => {
                return Err(AppError::NotFound("Event not found".to_string()))
            }
        }

        let registration = EventRegistration {
            id: Uuid::new_v4(),
            event_id,
            user_name: user_name.to_string(),
            user_email: input.user_email,
            phone: input.phone.filter(|p| !p.is_empty()),
            registered_at: now,
        };
        self.events.insert_registration(&registration).await?;

        tracing::info!(event_id = %event_id, registration_id = %registration.id, "event registration");
        Ok(registration)
    }

    pub async fn get_event_registrations(
        &self,
        actor_email: &str,
        event_id: Uuid,
    ) -> Result<Vec<EventRegistration>, AppError> {
        require_admin(self.users.as_ref(), actor_email, "view registrations").await?;
        Ok(self.events.list_registrations(event_id).await?)
    }

    async fn find(&self, event_id: Uuid) -> Result<Event, AppError> {
        self.events
            .get(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    async fn views(&self, status: Option<EventStatus>) -> Result<Vec<EventView>, AppError> {
        let events = self.events.list(status).await?;
        let mut views = Vec::with_capacity(events.len());
        for event in events {
            views.push(self.view(event).await);
        }
        Ok(views)
    }

    async fn view(&self, mut event: Event) -> EventView {
        let image_url = match event.image_storage_id.as_ref() {
            Some(blob) => resolve_url(self.blobs.as_ref(), Some(blob), None).await,
            None => None,
        };
        if image_url.is_some() {
            event.image = image_url.clone();
        }
        EventView { event, image_url }
    }
}
