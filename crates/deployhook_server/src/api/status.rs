//! Status and health API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub repositories: usize,
    pub started_at: DateTime<Utc>,
    pub time: DateTime<Utc>,
}

/// GET /
/// Service status and number of tracked repositories
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusResponse>> {
    let repositories = state.store.all()?.len();

    Ok(Json(StatusResponse {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        repositories,
        started_at: state.started_at,
        time: Utc::now(),
    }))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use deployhook_core::{DeployLocks, JsonRegistry, MemoryLogger, RegistryFile, RepositoryRecord};
    use deployhook_runner::MockRunner;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_counts_repositories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("repositories.json");
        let state = AppState::new(
            Arc::new(RegistryFile::new(&path)),
            Arc::new(MockRunner::new()),
            Arc::new(MemoryLogger::new()),
            DeployLocks::new(temp_dir.path().join("locks")),
        );

        let Json(before) = status(State(state.clone())).await.unwrap();
        assert_eq!(before.status, "running");
        assert_eq!(before.repositories, 0);

        JsonRegistry::new(&path)
            .add(RepositoryRecord::new("shop", "git@x:shop.git", "/srv/shop", "main", "simple", "t"))
            .unwrap();

        let Json(after) = status(State(state)).await.unwrap();
        assert_eq!(after.repositories, 1);
    }

    #[tokio::test]
    async fn test_health() {
        let response = health_check().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
