/**
 * Routes Module
 * API route handlers and the state they share
 */
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    AuthService, BlogService, EventService, GalleryService, Mailer, PasswordHasher,
    PasswordResetService, SharedBlobs,
};
use crate::store::{Repositories, UserRepository};

pub mod auth;
pub mod blog;
pub mod events;
pub mod gallery;
pub mod health;
pub mod password_reset;
pub mod public;
pub mod upload;

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Success response
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response for deletions: the id that was removed.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub id: uuid::Uuid,
}

/// Query string carrying the acting admin for read-only admin endpoints.
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub admin_email: String,
}

/// JSON body carrying the acting admin next to the operation's own fields.
#[derive(Debug, Deserialize)]
pub struct AdminRequest<T> {
    pub admin_email: String,
    #[serde(flatten)]
    pub body: T,
}

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub resets: PasswordResetService,
    pub blogs: BlogService,
    pub events: EventService,
    pub gallery: GalleryService,
    pub users: Arc<dyn UserRepository>,
    pub blobs: SharedBlobs,
    pub mailer: Mailer,
    /// Directory backing the blob store, when it is local.
    pub blob_root: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        blobs: SharedBlobs,
        hasher: PasswordHasher,
        bootstrap_secret: Option<String>,
        mailer: Mailer,
    ) -> Self {
        Self {
            auth: AuthService::new(repos.users.clone(), hasher, bootstrap_secret),
            resets: PasswordResetService::new(repos.users.clone(), repos.resets.clone(), hasher),
            blogs: BlogService::new(repos.users.clone(), repos.blogs.clone(), blobs.clone()),
            events: EventService::new(repos.users.clone(), repos.events.clone(), blobs.clone()),
            gallery: GalleryService::new(repos.users.clone(), repos.gallery.clone(), blobs.clone()),
            users: repos.users,
            blobs,
            mailer,
            blob_root: None,
        }
    }

    pub fn from_config(repos: Repositories, blobs: SharedBlobs, config: &AppConfig) -> Self {
        let mut state = Self::new(
            repos,
            blobs,
            PasswordHasher::new(config.bcrypt_cost),
            config.admin_bootstrap_secret.clone(),
            Mailer::new(config.mailer.clone()),
        );
        state.blob_root = Some(config.blob_dir.clone());
        state
    }
}
