//! Webhook API handler.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use deployhook_core::{Decision, DeploymentOutcome, LogScope, WebhookEvent};
use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Successful webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentOutcome>,
}

impl WebhookResponse {
    fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            deployment: None,
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// POST / and POST /webhook
/// Admit a webhook event and run the deployment it triggers
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookResponse>> {
    let token = header(&headers, &state.token_header);
    let event_name = header(&headers, &state.event_header);

    let event = WebhookEvent::from_gitlab(token, event_name.as_deref(), &body).map_err(|e| {
        state
            .logger
            .error(&LogScope::Global, &format!("Webhook error: {}", e));
        ApiError::from(e)
    })?;

    // Re-read per request so registrations made by the CLI apply immediately.
    let repositories = state.store.all()?;

    let record = match state.gate.admit(&event, &repositories) {
        Decision::Deploy(record) => record,
        Decision::Ignore(reason) => return Ok(Json(WebhookResponse::message(reason.to_string()))),
        Decision::Reject(reason) => return Err(ApiError::Unauthorized(reason.to_string())),
    };

    let Some(guard) = state.locks.try_acquire(&record.name)? else {
        let message = format!("Deployment already in progress for {}", record.name);
        state
            .logger
            .warning(&LogScope::repository(&record.name), &message);
        return Err(ApiError::Conflict(message));
    };

    // A dropped request must not stop the pipeline between its anchor capture
    // and a terminal state, so it runs in a task that owns the lock.
    let deployer = state.deployer.clone();
    let deployment = tokio::spawn(async move {
        let _guard = guard;
        deployer.deploy(&record).await
    });
    let outcome = deployment
        .await
        .map_err(|e| ApiError::Internal(format!("Deployment task failed: {}", e)))??;

    if outcome.succeeded {
        Ok(Json(WebhookResponse {
            success: true,
            message: "Deployment completed successfully".to_string(),
            deployment: Some(outcome),
        }))
    } else {
        Err(ApiError::DeploymentFailed {
            message: format!(
                "Deployment failed at step: {}",
                outcome.failed_step.as_deref().unwrap_or("unknown")
            ),
            outcome: Box::new(outcome),
        })
    }
}
