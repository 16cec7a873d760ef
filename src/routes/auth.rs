/**
 * Auth Routes
 * Account creation, sign-in and admin role management
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::UserPublicView;
use crate::error::AppError;
use crate::routes::{AdminQuery, AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct BootstrapRequest {
    pub email: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub admin_email: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentUserQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserPublicView,
}

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: Option<UserPublicView>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserPublicView>,
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .signup(payload.email.trim(), &payload.name, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

/// POST /api/auth/signin
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SigninRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .auth
        .signin(payload.email.trim(), &payload.password)
        .await?;
    Ok(Json(UserResponse { user }))
}

/// POST /api/auth/bootstrap
pub async fn bootstrap(
    State(state): State<AppState>,
    Json(payload): Json<BootstrapRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .auth
        .bootstrap_admin(payload.email.trim(), &payload.secret)
        .await?;
    Ok(Json(UserResponse { user }))
}

/// GET /api/auth/me?email=
pub async fn current_user(
    State(state): State<AppState>,
    Query(query): Query<CurrentUserQuery>,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let user = state.auth.get_current_user(query.email.trim()).await?;
    Ok(Json(CurrentUserResponse { user }))
}

/// GET /api/users?admin_email=
///
/// Password digests never leave the service layer; only public views are
/// returned.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    let users: Vec<UserPublicView> = state
        .auth
        .list_all_users(&query.admin_email)
        .await?
        .iter()
        .map(UserPublicView::from)
        .collect();
    let total = users.len();
    Ok(Json(UserListResponse { users, total }))
}

/// POST /api/users/{id}/promote
pub async fn promote(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RoleChangeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .auth
        .promote_to_admin(&payload.admin_email, user_id)
        .await?;
    Ok(Json(UserResponse { user }))
}

/// POST /api/users/{id}/demote
pub async fn demote(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RoleChangeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .auth
        .demote_from_admin(&payload.admin_email, user_id)
        .await?;
    Ok(Json(UserResponse { user }))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/bootstrap", post(bootstrap))
        .route("/api/auth/me", get(current_user))
        .route("/api/users", get(list_users))
        .route("/api/users/{id}/promote", post(promote))
        .route("/api/users/{id}/demote", post(demote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::routes::test_support::{get_request, json_request, send, test_app, BOOTSTRAP_SECRET};
    use crate::services::test_support::seed_user;
    use axum::http::Method;
    use serde_json::json;

    fn app(state: AppState) -> Router {
        routes().with_state(state)
    }

    #[tokio::test]
    async fn test_signup_returns_created_admin_without_digest() {
        let t = test_app();
        let (status, body) = send(
            app(t.state),
            json_request(
                Method::POST,
                "/api/auth/signup",
                json!({"email": "ada@example.org", "name": "Ada", "password": "secret1"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["role"], "admin");
        assert!(body["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_signup_short_password_is_bad_request() {
        let t = test_app();
        let (status, body) = send(
            app(t.state),
            json_request(
                Method::POST,
                "/api/auth/signup",
                json!({"email": "ada@example.org", "name": "Ada", "password": "123"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_signin_errors_map_to_status() {
        let t = test_app();
        seed_user(&t.store, "ada@example.org", "secret1", Role::Admin).await;

        let (status, _) = send(
            app(t.state.clone()),
            json_request(
                Method::POST,
                "/api/auth/signin",
                json!({"email": "nobody@example.org", "password": "secret1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            app(t.state.clone()),
            json_request(
                Method::POST,
                "/api/auth/signin",
                json!({"email": "ada@example.org", "password": "wrong-password"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid password");

        let (status, body) = send(
            app(t.state),
            json_request(
                Method::POST,
                "/api/auth/signin",
                json!({"email": "ada@example.org", "password": "secret1"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "ada@example.org");
    }

    #[tokio::test]
    async fn test_list_users_requires_admin_and_redacts() {
        let t = test_app();
        seed_user(&t.store, "admin@example.org", "secret1", Role::Admin).await;
        seed_user(&t.store, "user@example.org", "secret1", Role::User).await;

        let (status, _) = send(
            app(t.state.clone()),
            get_request("/api/users?admin_email=user@example.org"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            app(t.state),
            get_request("/api/users?admin_email=admin@example.org"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        for user in body["users"].as_array().unwrap() {
            assert!(user.get("password_hash").is_none());
        }
    }

    #[tokio::test]
    async fn test_promote_and_demote() {
        let t = test_app();
        seed_user(&t.store, "admin@example.org", "secret1", Role::Admin).await;
        let target = seed_user(&t.store, "user@example.org", "secret1", Role::User).await;

        let (status, body) = send(
            app(t.state.clone()),
            json_request(
                Method::POST,
                &format!("/api/users/{}/promote", target.id),
                json!({"admin_email": "admin@example.org"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "admin");

        let (status, body) = send(
            app(t.state.clone()),
            json_request(
                Method::POST,
                &format!("/api/users/{}/demote", target.id),
                json!({"admin_email": "admin@example.org"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "user");

        let (status, _) = send(
            app(t.state),
            json_request(
                Method::POST,
                &format!("/api/users/{}/promote", Uuid::new_v4()),
                json!({"admin_email": "admin@example.org"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bootstrap_checks_secret() {
        let t = test_app();
        seed_user(&t.store, "user@example.org", "secret1", Role::User).await;

        let (status, _) = send(
            app(t.state.clone()),
            json_request(
                Method::POST,
                "/api/auth/bootstrap",
                json!({"email": "user@example.org", "secret": "guess"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            app(t.state),
            json_request(
                Method::POST,
                "/api/auth/bootstrap",
                json!({"email": "user@example.org", "secret": BOOTSTRAP_SECRET}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn test_current_user_is_null_for_unknown_email() {
        let t = test_app();
        seed_user(&t.store, "ada@example.org", "secret1", Role::User).await;

        let (status, body) = send(
            app(t.state.clone()),
            get_request("/api/auth/me?email=ada@example.org"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "ada@example.org");

        let (_, body) = send(app(t.state), get_request("/api/auth/me?email=nobody@example.org")).await;
        assert!(body["user"].is_null());
    }
}
