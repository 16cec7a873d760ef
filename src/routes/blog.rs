/**
 * Blog Routes
 * Admin CRUD endpoints for blog posts
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::{AdminQuery, AdminRequest, AppState, DeletedResponse};
use crate::services::blogs::{BlogView, CreateBlogInput, UpdateBlogInput};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BlogResponse {
    pub blog: BlogView,
}

#[derive(Debug, Serialize)]
pub struct BlogListResponse {
    pub blogs: Vec<BlogView>,
    pub total: usize,
}

impl From<Vec<BlogView>> for BlogListResponse {
    fn from(blogs: Vec<BlogView>) -> Self {
        let total = blogs.len();
        Self { blogs, total }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/blogs?admin_email= - every post, any status
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<BlogListResponse>, AppError> {
    let blogs = state.blogs.get_all_blogs(&query.admin_email).await?;
    Ok(Json(blogs.into()))
}

/// GET /api/blogs/by-author/{author_id}?admin_email=
pub async fn list_by_author(
    State(state): State<AppState>,
    Path(author_id): Path<Uuid>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<BlogListResponse>, AppError> {
    let blogs = state
        .blogs
        .get_blogs_by_author(&query.admin_email, author_id)
        .await?;
    Ok(Json(blogs.into()))
}

/// POST /api/blogs
pub async fn create_blog(
    State(state): State<AppState>,
    Json(payload): Json<AdminRequest<CreateBlogInput>>,
) -> Result<impl IntoResponse, AppError> {
    let blog = state
        .blogs
        .create_blog(&payload.admin_email, payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(BlogResponse { blog })))
}

/// PATCH /api/blogs/{id}
pub async fn update_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
    Json(payload): Json<AdminRequest<UpdateBlogInput>>,
) -> Result<Json<BlogResponse>, AppError> {
    let blog = state
        .blogs
        .update_blog(&payload.admin_email, blog_id, payload.body)
        .await?;
    Ok(Json(BlogResponse { blog }))
}

/// DELETE /api/blogs/{id}?admin_email=
pub async fn delete_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = state.blogs.delete_blog(&query.admin_email, blog_id).await?;
    Ok(Json(DeletedResponse { success: true, id }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/blogs", get(list_blogs).post(create_blog))
        .route("/api/blogs/{id}", patch(update_blog).delete(delete_blog))
        .route("/api/blogs/by-author/{author_id}", get(list_by_author))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::routes::test_support::{get_request, json_request, send, test_app, TestApp};
    use crate::services::content::MAX_INLINE_FIELD_BYTES;
    use crate::services::test_support::seed_user;
    use axum::http::Method;
    use serde_json::{json, Value};

    const ADMIN: &str = "admin@example.org";

    fn app(t: &TestApp) -> Router {
        routes().with_state(t.state.clone())
    }

    async fn create(t: &TestApp, body: Value) -> (StatusCode, Value) {
        send(app(t), json_request(Method::POST, "/api/blogs", body)).await
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let t = test_app();
        seed_user(&t.store, "user@example.org", "secret1", Role::User).await;

        let (status, body) = create(
            &t,
            json!({"admin_email": "user@example.org", "title": "Hi", "slug": "hi"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized: Only admins can create blogs");
    }

    #[tokio::test]
    async fn test_create_update_delete_flow() {
        let t = test_app();
        let admin = seed_user(&t.store, ADMIN, "secret1", Role::Admin).await;

        let (status, body) = create(
            &t,
            json!({
                "admin_email": ADMIN,
                "title": "First post",
                "slug": "first-post",
                "excerpt": "Intro",
                "content": "<p>Hello</p>",
                "status": "published"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["blog"]["slug"], "first-post");
        assert_eq!(body["blog"]["author_id"], admin.id.to_string());
        assert!(!body["blog"]["published_at"].is_null());
        let id = body["blog"]["id"].as_str().unwrap().to_string();

        let (status, _) = create(
            &t,
            json!({"admin_email": ADMIN, "title": "Again", "slug": "first-post"}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            app(&t),
            json_request(
                Method::PATCH,
                &format!("/api/blogs/{}", id),
                json!({"admin_email": ADMIN, "title": "Renamed"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blog"]["title"], "Renamed");
        assert_eq!(body["blog"]["content"], "<p>Hello</p>");

        let (status, body) = send(
            app(&t),
            get_request(&format!("/api/blogs?admin_email={}", ADMIN)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let (status, body) = send(
            app(&t),
            get_request(&format!(
                "/api/blogs/by-author/{}?admin_email={}",
                admin.id, ADMIN
            )),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);

        let delete = axum::http::Request::delete(format!("/api/blogs/{}?admin_email={}", id, ADMIN))
            .body(axum::body::Body::empty())
            .unwrap();
        let (status, body) = send(app(&t), delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);

        let (status, _) = send(
            app(&t),
            json_request(
                Method::PATCH,
                &format!("/api/blogs/{}", id),
                json!({"admin_email": ADMIN, "title": "Gone"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_large_content_is_spilled_and_served_by_url() {
        let t = test_app();
        seed_user(&t.store, ADMIN, "secret1", Role::Admin).await;

        let content = "x".repeat(MAX_INLINE_FIELD_BYTES + 1);
        let (status, body) = create(
            &t,
            json!({"admin_email": ADMIN, "title": "Long", "slug": "long", "content": content}),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert!(body["blog"]["content"].is_null());
        assert!(body["blog"]["content_url"]
            .as_str()
            .unwrap()
            .starts_with("memory://"));
        assert_eq!(t.blobs.len().await, 1);

        let id = body["blog"]["id"].as_str().unwrap();
        let delete = axum::http::Request::delete(format!("/api/blogs/{}?admin_email={}", id, ADMIN))
            .body(axum::body::Body::empty())
            .unwrap();
        let (status, _) = send(app(&t), delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(t.blobs.len().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_slug_is_bad_request() {
        let t = test_app();
        seed_user(&t.store, ADMIN, "secret1", Role::Admin).await;

        let (status, body) = create(
            &t,
            json!({"admin_email": ADMIN, "title": "Bad", "slug": "Not A Slug"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
