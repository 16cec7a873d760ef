/**
 * Gallery Routes
 * Collections of images, managed by admins and listed publicly
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::{AdminQuery, AdminRequest, AppState, DeletedResponse};
use crate::services::gallery::{
    CreateGalleryInput, GalleryImageInput, GalleryView, UpdateGalleryInput,
};

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub gallery: GalleryView,
}

#[derive(Debug, Serialize)]
pub struct GalleryListResponse {
    pub galleries: Vec<GalleryView>,
    pub total: usize,
}

impl From<Vec<GalleryView>> for GalleryListResponse {
    fn from(galleries: Vec<GalleryView>) -> Self {
        let total = galleries.len();
        Self { galleries, total }
    }
}

/// GET /api/gallery?admin_email=
pub async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<GalleryListResponse>, AppError> {
    Ok(Json(state.gallery.get_all(&query.admin_email).await?.into()))
}

/// GET /api/gallery/featured
pub async fn list_featured(
    State(state): State<AppState>,
) -> Result<Json<GalleryListResponse>, AppError> {
    Ok(Json(state.gallery.get_featured().await?.into()))
}

/// GET /api/gallery/category/{category}
pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<GalleryListResponse>, AppError> {
    Ok(Json(state.gallery.get_by_category(&category).await?.into()))
}

/// POST /api/gallery
pub async fn create_collection(
    State(state): State<AppState>,
    Json(payload): Json<AdminRequest<CreateGalleryInput>>,
) -> Result<impl IntoResponse, AppError> {
    let gallery = state
        .gallery
        .create_collection(&payload.admin_email, payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(GalleryResponse { gallery })))
}

/// PATCH /api/gallery/{id}
pub async fn update_collection(
    State(state): State<AppState>,
    Path(gallery_id): Path<Uuid>,
    Json(payload): Json<AdminRequest<UpdateGalleryInput>>,
) -> Result<Json<GalleryResponse>, AppError> {
    let gallery = state
        .gallery
        .update_collection(&payload.admin_email, gallery_id, payload.body)
        .await?;
    Ok(Json(GalleryResponse { gallery }))
}

/// DELETE /api/gallery/{id}?admin_email=
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(gallery_id): Path<Uuid>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = state
        .gallery
        .delete_collection(&query.admin_email, gallery_id)
        .await?;
    Ok(Json(DeletedResponse { success: true, id }))
}

/// POST /api/gallery/{id}/images
pub async fn add_image(
    State(state): State<AppState>,
    Path(gallery_id): Path<Uuid>,
    Json(payload): Json<AdminRequest<GalleryImageInput>>,
) -> Result<Json<GalleryResponse>, AppError> {
    let gallery = state
        .gallery
        .add_image(&payload.admin_email, gallery_id, payload.body)
        .await?;
    Ok(Json(GalleryResponse { gallery }))
}

/// DELETE /api/gallery/{id}/images/{index}?admin_email=
pub async fn remove_image(
    State(state): State<AppState>,
    Path((gallery_id, index)): Path<(Uuid, usize)>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<GalleryResponse>, AppError> {
    let gallery = state
        .gallery
        .remove_image(&query.admin_email, gallery_id, index)
        .await?;
    Ok(Json(GalleryResponse { gallery }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/gallery", get(list_all).post(create_collection))
        .route("/api/gallery/featured", get(list_featured))
        .route("/api/gallery/category/{category}", get(list_by_category))
        .route(
            "/api/gallery/{id}",
            patch(update_collection).delete(delete_collection),
        )
        .route("/api/gallery/{id}/images", post(add_image))
        .route("/api/gallery/{id}/images/{index}", delete(remove_image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::routes::test_support::{get_request, json_request, send, test_app, TestApp};
    use crate::services::test_support::seed_user;
    use crate::store::BlobStore;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use bytes::Bytes;
    use serde_json::json;

    const ADMIN: &str = "admin@example.org";

    fn app(t: &TestApp) -> Router {
        routes().with_state(t.state.clone())
    }

    #[tokio::test]
    async fn test_featured_and_category_listings() {
        let t = test_app();
        seed_user(&t.store, ADMIN, "secret1", Role::Admin).await;

        for (title, category, featured) in [("Spring", "events", true), ("Team", "people", false)] {
            let (status, _) = send(
                app(&t),
                json_request(
                    Method::POST,
                    "/api/gallery",
                    json!({
                        "admin_email": ADMIN,
                        "title": title,
                        "category": category,
                        "featured": featured,
                        "images": [{"url": "https://cdn.example.org/a.jpg", "alt_text": "A"}]
                    }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = send(app(&t), get_request("/api/gallery/featured")).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["galleries"][0]["title"], "Spring");

        let (_, body) = send(app(&t), get_request("/api/gallery/category/people")).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["galleries"][0]["title"], "Team");

        let (status, body) = send(
            app(&t),
            get_request(&format!("/api/gallery?admin_email={}", ADMIN)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
    }

    #[tokio::test]
    async fn test_add_and_remove_images() {
        let t = test_app();
        seed_user(&t.store, ADMIN, "secret1", Role::Admin).await;
        let blob = t
            .blobs
            .store(Bytes::from_static(b"\x89PNG...."), "image/png")
            .await
            .unwrap();

        let (_, body) = send(
            app(&t),
            json_request(
                Method::POST,
                "/api/gallery",
                json!({"admin_email": ADMIN, "title": "Album", "category": "misc"}),
            ),
        )
        .await;
        let id = body["gallery"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            app(&t),
            json_request(
                Method::POST,
                &format!("/api/gallery/{}/images", id),
                json!({"admin_email": ADMIN, "alt_text": "Stored", "storage_id": blob}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gallery"]["images"].as_array().unwrap().len(), 1);

        let remove = |index: usize| {
            Request::delete(format!(
                "/api/gallery/{}/images/{}?admin_email={}",
                id, index, ADMIN
            ))
            .body(Body::empty())
            .unwrap()
        };

        let (status, body) = send(app(&t), remove(3)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid image index");

        let (status, body) = send(app(&t), remove(0)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["gallery"]["images"].as_array().unwrap().is_empty());
        assert!(!t.blobs.contains(&blob).await);
    }

    #[tokio::test]
    async fn test_delete_collection_releases_stored_images() {
        let t = test_app();
        seed_user(&t.store, ADMIN, "secret1", Role::Admin).await;
        let blob = t
            .blobs
            .store(Bytes::from_static(b"\x89PNG...."), "image/png")
            .await
            .unwrap();

        let (status, body) = send(
            app(&t),
            json_request(
                Method::POST,
                "/api/gallery",
                json!({
                    "admin_email": ADMIN,
                    "title": "Album",
                    "category": "misc",
                    "images": [
                        {"alt_text": "Stored", "storage_id": blob},
                        {"url": "https://cdn.example.org/a.jpg", "alt_text": "Linked"}
                    ]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["gallery"]["id"].as_str().unwrap().to_string();

        let delete = Request::delete(format!("/api/gallery/{}?admin_email={}", id, ADMIN))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(&t), delete).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
        assert!(!t.blobs.contains(&blob).await);

        let (_, body) = send(app(&t), get_request("/api/gallery/category/misc")).await;
        assert_eq!(body["total"], 0);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_collection() {
        let t = test_app();
        seed_user(&t.store, ADMIN, "secret1", Role::Admin).await;
        let missing = Uuid::new_v4();

        let (status, _) = send(
            app(&t),
            json_request(
                Method::PATCH,
                &format!("/api/gallery/{}", missing),
                json!({"admin_email": ADMIN, "title": "Nope"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let delete = Request::delete(format!("/api/gallery/{}?admin_email={}", missing, ADMIN))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(&t), delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
