/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::routes::AppState;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceCheck {
    fn healthy(response_time: Option<u64>) -> Self {
        Self {
            status: "healthy".to_string(),
            response_time,
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            response_time: None,
            error: Some(error.into()),
        }
    }

    fn is_unhealthy(&self) -> bool {
        self.status == "unhealthy"
    }
}

/// Detailed health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    pub checks: HealthChecks,
}

/// Health checks for all backing stores
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: ServiceCheck,
    pub storage: ServiceCheck,
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<ReadyChecks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ready checks summary
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyChecks {
    pub database: String,
    pub storage: String,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

/// Without `DATABASE_URL` the in-memory store is in use and the database
/// check reports `disabled`.
async fn check_database() -> ServiceCheck {
    if crate::db::get_pool().is_none() {
        return ServiceCheck {
            status: "disabled".to_string(),
            response_time: None,
            error: None,
        };
    }
    match crate::db::health_check().await {
        Ok(duration) => ServiceCheck::healthy(Some(duration.as_millis() as u64)),
        Err(e) => ServiceCheck::unhealthy(e.to_string()),
    }
}

async fn check_storage(state: &AppState) -> ServiceCheck {
    let Some(root) = state.blob_root.as_ref() else {
        return ServiceCheck::healthy(None);
    };
    let start = Instant::now();
    if let Err(e) = tokio::fs::create_dir_all(root).await {
        return ServiceCheck::unhealthy(format!("{}: {}", root.display(), e));
    }
    match tokio::fs::metadata(root).await {
        Ok(meta) if meta.permissions().readonly() => {
            ServiceCheck::unhealthy(format!("{} is read-only", root.display()))
        }
        Ok(_) => ServiceCheck::healthy(Some(start.elapsed().as_millis() as u64)),
        Err(e) => ServiceCheck::unhealthy(e.to_string()),
    }
}

/// GET /health - Simple health ping
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/detailed - Detailed health with all checks
pub async fn health_detailed(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let database = check_database().await;
    let storage = check_storage(&state).await;

    let overall_status = if database.is_unhealthy() || storage.is_unhealthy() {
        "degraded"
    } else {
        "ok"
    };

    let response = DetailedHealthResponse {
        status: overall_status.to_string(),
        timestamp: Utc::now(),
        uptime: Some(uptime),
        checks: HealthChecks { database, storage },
    };

    (StatusCode::OK, Json(response))
}

/// GET /health/database - Database health check
pub async fn health_database() -> impl IntoResponse {
    (StatusCode::OK, Json(check_database().await))
}

/// GET /health/ready - Readiness check
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let database = check_database().await;
    let storage = check_storage(&state).await;

    let is_ready = !database.is_unhealthy() && !storage.is_unhealthy();
    let status_code = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = ReadyResponse {
        status: if is_ready {
            "ready".to_string()
        } else {
            "not ready".to_string()
        },
        timestamp: Utc::now(),
        uptime: Some(uptime),
        reason: if is_ready {
            None
        } else {
            Some("Database or blob storage is not healthy".to_string())
        },
        checks: Some(ReadyChecks {
            database: database.status,
            storage: storage.status,
        }),
    };

    (status_code, Json(response))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_ping))
        .route("/health/detailed", get(health_detailed))
        .route("/health/database", get(health_database))
        .route("/health/ready", get(health_ready))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::test_app;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router(state: AppState) -> Router {
        routes().with_state(state)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: T = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[test]
    fn test_service_check_omits_empty_fields() {
        let json = serde_json::to_string(&ServiceCheck::healthy(None)).unwrap();
        assert_eq!(json, r#"{"status":"healthy"}"#);
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        init_start_time();
        let (status, body) =
            get_json::<SimpleHealthResponse>(test_router(test_app().state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_health_database_is_disabled_without_pool() {
        let (status, body) =
            get_json::<ServiceCheck>(test_router(test_app().state), "/health/database").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "disabled");
    }

    #[tokio::test]
    async fn test_health_detailed_checks_storage_dir() {
        init_start_time();
        let mut state = test_app().state;
        state.blob_root = Some(std::env::temp_dir().join(format!(
            "foundation-health-{}",
            uuid::Uuid::new_v4()
        )));
        let root = state.blob_root.clone().unwrap();

        let (status, body) =
            get_json::<DetailedHealthResponse>(test_router(state), "/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.storage.status, "healthy");
        assert!(body.uptime.is_some());

        tokio::fs::remove_dir_all(root).await.ok();
    }

    #[tokio::test]
    async fn test_health_ready_returns_ready() {
        init_start_time();
        let (status, body) =
            get_json::<ReadyResponse>(test_router(test_app().state), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
    }
}
