/**
 * Public Routes
 * Read-only content for the public site and the reset-email relay.
 * Served with a permissive CORS policy, separate from the admin API.
 */
use axum::{
    extract::{Query, State},
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::db::models::{BlogStatus, EventStatus};
use crate::error::AppError;
use crate::routes::{AppState, SuccessResponse};
use crate::services::blogs::BlogView;
use crate::services::events::EventView;
use crate::services::password_reset::RESET_CODE_LEN;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PublicBlogSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub featured_image: Option<String>,
    pub featured_image_url: Option<String>,
    pub content_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicBlog {
    #[serde(flatten)]
    pub summary: PublicBlogSummary,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicEvent {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: String,
    pub status: EventStatus,
    pub image: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicBlogListResponse {
    pub blogs: Vec<PublicBlogSummary>,
}

#[derive(Debug, Serialize)]
pub struct PublicBlogResponse {
    pub blog: PublicBlog,
}

#[derive(Debug, Serialize)]
pub struct PublicEventListResponse {
    pub events: Vec<PublicEvent>,
}

#[derive(Debug, Deserialize)]
pub struct SlugQuery {
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendResetEmailRequest {
    pub email: String,
    pub code: String,
}

fn split_blog(view: BlogView) -> (PublicBlogSummary, Option<String>) {
    let blog = view.blog;
    let summary = PublicBlogSummary {
        id: blog.id,
        title: blog.title,
        slug: blog.slug,
        excerpt: blog.excerpt,
        author: blog.author_name.unwrap_or_default(),
        published_at: blog.published_at.unwrap_or(blog.created_at),
        featured_image: blog.featured_image,
        featured_image_url: view.featured_image_url,
        content_url: view.content_url,
    };
    (summary, blog.content)
}

impl From<EventView> for PublicEvent {
    fn from(view: EventView) -> Self {
        let event = view.event;
        Self {
            id: event.id,
            title: event.title,
            slug: event.slug,
            description: event.description,
            date: event.start_date,
            end_date: event.end_date,
            location: event.location,
            status: event.status,
            image: event.image,
            image_url: view.image_url,
        }
    }
}

fn is_reset_code(code: &str) -> bool {
    code.len() == RESET_CODE_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /public/blogs
pub async fn list_blogs(
    State(state): State<AppState>,
) -> Result<Json<PublicBlogListResponse>, AppError> {
    let blogs = state
        .blogs
        .get_published_blogs()
        .await?
        .into_iter()
        .map(|view| split_blog(view).0)
        .collect();
    Ok(Json(PublicBlogListResponse { blogs }))
}

/// GET /public/blog?slug= - published posts only
pub async fn get_blog(
    State(state): State<AppState>,
    Query(query): Query<SlugQuery>,
) -> Result<Json<PublicBlogResponse>, AppError> {
    let slug = query
        .slug
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing slug".to_string()))?;

    let view = state
        .blogs
        .get_blog_by_slug(slug.trim())
        .await?
        .filter(|view| view.blog.status == BlogStatus::Published)
        .ok_or_else(|| AppError::NotFound("Not found".to_string()))?;

    let (summary, content) = split_blog(view);
    Ok(Json(PublicBlogResponse {
        blog: PublicBlog { summary, content },
    }))
}

/// GET /public/events - upcoming events
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<PublicEventListResponse>, AppError> {
    let events = state
        .events
        .get_public_events()
        .await?
        .into_iter()
        .map(PublicEvent::from)
        .collect();
    Ok(Json(PublicEventListResponse { events }))
}

/// POST /send-reset-email
pub async fn send_reset_email(
    State(state): State<AppState>,
    Json(payload): Json<SendResetEmailRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let email = payload.email.trim();
    if email.is_empty() || !email.contains('@') || !is_reset_code(payload.code.trim()) {
        return Err(AppError::Validation("Missing email or code".to_string()));
    }

    state
        .mailer
        .send_reset_code(email, payload.code.trim())
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub fn public_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/public/blogs", get(list_blogs))
        .route("/public/blog", get(get_blog))
        .route("/public/events", get(list_events))
        .route("/send-reset-email", post(send_reset_email))
        .layer(public_cors())
}
