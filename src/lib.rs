//! Foundation Backend - accounts, password reset and site content

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod routes;
pub mod services;
pub mod store;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use config::AppConfig;
use routes::AppState;
use store::{FsBlobStore, Repositories};

/// Global request body cap. Uploads are checked against their own, lower
/// limit after parsing.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Configure CORS for the admin API from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, falling back
/// to the local frontend dev server.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Create and configure the application router.
///
/// The admin API gets the configured CORS policy; public routes carry their
/// own permissive one.
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::auth::routes())
        .merge(routes::password_reset::routes())
        .merge(routes::blog::routes())
        .merge(routes::events::routes())
        .merge(routes::gallery::routes())
        .merge(routes::upload::routes())
        .layer(configure_cors());
    tracing::info!("CORS configured");

    let mut app = Router::new()
        .merge(api)
        .merge(routes::public::routes())
        .merge(routes::health::routes());

    if let Some(root) = state.blob_root.clone() {
        app = app.nest_service("/storage", ServeDir::new(root));
    }

    app.with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Postgres when DATABASE_URL is set and reachable, otherwise in-memory.
async fn open_repositories(config: &AppConfig) -> Repositories {
    if config.database_url.is_none() {
        tracing::info!("DATABASE_URL not set. Using the in-memory store; data is lost on restart.");
        return Repositories::in_memory();
    }

    match db::init_pool(None).await {
        Ok(pool) => {
            if let Err(e) = db::run_migrations(&pool).await {
                tracing::error!("Failed to run database migrations: {}", e);
            }
            Repositories::postgres(pool)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Falling back to the in-memory store.",
                e
            );
            Repositories::in_memory()
        }
    }
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init(&config.log);

    routes::health::init_start_time();

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        panic!("FATAL: {}. Refusing to start.", e);
    }

    let repos = open_repositories(&config).await;
    let blobs = Arc::new(FsBlobStore::new(
        config.blob_dir.clone(),
        config.public_base_url.clone(),
    ));
    tracing::info!(dir = %blobs.root().display(), "blob storage ready");

    let state = AppState::from_config(repos, blobs, &config);
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{get_request, send, test_app};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_create_app_serves_health_with_request_id() {
        let app = create_app(test_app().state);
        let res = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, _) = send(create_app(test_app().state), get_request("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let app = create_app(test_app().state);
        let body = vec![b'a'; MAX_BODY_BYTES + 1];
        let res = app
            .oneshot(
                Request::post("/api/auth/signin")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_admin_api_cors_rejects_unknown_origin() {
        let app = create_app(test_app().state);
        let res = app
            .oneshot(
                Request::get("/api/storage-url?storage_id=x.png")
                    .header(header::ORIGIN, "https://evil.example.org")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!res
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_stored_blobs_are_served() {
        let root = std::env::temp_dir().join(format!("foundation-storage-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(&root).await.unwrap();
        tokio::fs::write(root.join("hello.txt"), "hi").await.unwrap();

        let mut state = test_app().state;
        state.blob_root = Some(root.clone());
        let res = create_app(state)
            .oneshot(get_request("/storage/hello.txt"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        tokio::fs::remove_dir_all(root).await.ok();
    }
}
