//! Domain services. Handlers in `routes` stay thin and delegate here.

pub mod auth;
pub mod blogs;
pub mod content;
pub mod events;
pub mod gallery;
pub mod notify;
pub mod password;
pub mod password_reset;

pub use auth::AuthService;
pub use blogs::BlogService;
pub use events::EventService;
pub use gallery::GalleryService;
pub use notify::{Mailer, MailerConfig};
pub use password::PasswordHasher;
pub use password_reset::PasswordResetService;

use std::sync::Arc;

use crate::store::BlobRef;
use crate::store::BlobStore;

/// Public URL for an optional blob, falling back to `inline` when the blob
/// is missing or its URL cannot be resolved.
pub(crate) async fn resolve_url(
    blobs: &dyn BlobStore,
    blob: Option<&BlobRef>,
    inline: Option<&String>,
) -> Option<String> {
    if let Some(blob) = blob {
        match blobs.url(blob).await {
            Ok(Some(url)) => return Some(url),
            Ok(None) => tracing::debug!(blob = %blob, "referenced blob is missing"),
            Err(e) => tracing::warn!(blob = %blob, error = %e, "failed to resolve blob url"),
        }
    }
    inline.cloned()
}

pub type SharedBlobs = Arc<dyn BlobStore>;
