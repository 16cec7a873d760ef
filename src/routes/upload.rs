/**
 * Upload Routes
 * Admin image uploads into the blob store
 */
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::routes::AppState;
use crate::services::auth::require_admin;
use crate::store::BlobRef;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub storage_id: BlobRef,
    pub url: Option<String>,
    pub size: usize,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageUrlQuery {
    pub storage_id: String,
}

#[derive(Debug, Serialize)]
pub struct StorageUrlResponse {
    pub url: Option<String>,
}

fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 ... 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Checks name, size and content of an uploaded image and returns its
/// detected MIME type.
fn validate_image(filename: &str, bytes: &[u8]) -> Result<&'static str, AppError> {
    if !ALLOWED_EXTENSIONS.contains(&extension_of(filename).as_str()) {
        return Err(AppError::Validation(
            "Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.".to_string(),
        ));
    }
    if bytes.is_empty() {
        return Err(AppError::Validation("Empty file".to_string()));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::PayloadTooLarge {
            kind: "File",
            actual: bytes.len(),
            limit: MAX_FILE_SIZE,
        });
    }
    validate_image_magic_bytes(bytes).ok_or_else(|| {
        AppError::Validation("File content does not match an allowed image type.".to_string())
    })
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    tracing::warn!(error = %e, "multipart error");
    AppError::Validation("Invalid multipart data".to_string())
}

/// POST /api/uploads
///
/// Multipart body: an `admin_email` text field, then the `file` field. The
/// admin check runs before the file is read.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut admin_checked = false;
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("admin_email") => {
                let email = field.text().await.map_err(multipart_error)?;
                require_admin(state.users.as_ref(), email.trim(), "upload files").await?;
                admin_checked = true;
            }
            Some("file") => {
                if !admin_checked {
                    return Err(AppError::Auth(
                        "Unauthorized: Only admins can upload files".to_string(),
                    ));
                }
                let filename = field.file_name().unwrap_or("unknown").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                upload = Some((filename, bytes));
                break;
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;
    let mime_type = validate_image(&filename, &bytes)?;

    let size = bytes.len();
    let storage_id = state.blobs.store(bytes, mime_type).await?;
    let url = state.blobs.url(&storage_id).await?;
    tracing::info!(storage_id = %storage_id, size, mime_type, "image uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            storage_id,
            url,
            size,
            mime_type: mime_type.to_string(),
        }),
    ))
}

/// GET /api/storage-url?storage_id=
pub async fn storage_url(
    State(state): State<AppState>,
    Query(query): Query<StorageUrlQuery>,
) -> Result<Json<StorageUrlResponse>, AppError> {
    let url = match state.blobs.url(&BlobRef::new(query.storage_id)).await {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(error = %e, "storage url lookup failed");
            None
        }
    };
    Ok(Json(StorageUrlResponse { url }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/uploads", post(upload_image))
        .route("/api/storage-url", get(storage_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::routes::test_support::{get_request, send, test_app, TestApp};
    use crate::services::test_support::seed_user;
    use axum::body::Body;
    use axum::http::{header, Request};

    const ADMIN: &str = "admin@example.org";
    const BOUNDARY: &str = "X-TEST-BOUNDARY";
    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    fn app(t: &TestApp) -> Router {
        routes().with_state(t.state.clone())
    }

    fn multipart_request(admin_email: Option<&str>, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(email) = admin_email {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"admin_email\"\r\n\r\n{email}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/api/uploads")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_magic_bytes_detection() {
        assert_eq!(validate_image_magic_bytes(PNG), Some("image/png"));
        assert_eq!(
            validate_image_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("image/jpeg")
        );
        assert_eq!(validate_image_magic_bytes(b"GIF89a"), Some("image/gif"));
        assert_eq!(validate_image_magic_bytes(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(validate_image_magic_bytes(b"%PDF-1.7"), None);
        assert_eq!(validate_image_magic_bytes(b"ab"), None);
    }

    #[test]
    fn test_validate_image_rules() {
        assert!(matches!(
            validate_image("notes.txt", PNG),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_image("fake.png", b"not an image"),
            Err(AppError::Validation(_))
        ));
        let big = vec![0x89u8; MAX_FILE_SIZE + 1];
        assert!(matches!(
            validate_image("big.png", &big),
            Err(AppError::PayloadTooLarge { .. })
        ));
        assert_eq!(validate_image("Photo.PNG", PNG).unwrap(), "image/png");
    }

    #[tokio::test]
    async fn test_admin_upload_is_stored() {
        let t = test_app();
        seed_user(&t.store, ADMIN, "secret1", Role::Admin).await;

        let (status, body) = send(app(&t), multipart_request(Some(ADMIN), "logo.png", PNG)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["mime_type"], "image/png");
        assert_eq!(body["size"], PNG.len());
        let storage_id = body["storage_id"].as_str().unwrap().to_string();
        assert!(t.blobs.contains(&BlobRef::new(storage_id.clone())).await);

        let (status, body) = send(
            app(&t),
            get_request(&format!("/api/storage-url?storage_id={}", storage_id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], format!("memory://{}", storage_id));
    }

    #[tokio::test]
    async fn test_upload_without_admin_is_rejected() {
        let t = test_app();
        seed_user(&t.store, "user@example.org", "secret1", Role::User).await;

        let (status, _) = send(app(&t), multipart_request(None, "logo.png", PNG)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app(&t),
            multipart_request(Some("user@example.org"), "logo.png", PNG),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(t.blobs.len().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_storage_id_has_null_url() {
        let t = test_app();
        let (status, body) = send(app(&t), get_request("/api/storage-url?storage_id=missing.png")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["url"].is_null());
    }
}
