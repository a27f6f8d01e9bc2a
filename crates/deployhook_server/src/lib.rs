//! # deployhook_server
//!
//! Webhook endpoint for deployhook.
//!
//! Receives GitLab push and merge request hooks, passes them through the
//! admission gate and runs the triggered deployment while holding the
//! repository's deployment lock. The deployment runs in its own task, so a
//! client that hangs up early does not interrupt it.
//!
//! | Route | |
//! |---|---|
//! | `POST /`, `POST /webhook` | webhook |
//! | `GET /` | JSON status |
//! | `GET /health` | `OK` |

pub mod api;
pub mod state;

use std::net::SocketAddr;

pub use api::create_router;
pub use api::error::{ApiError, ApiResult};
pub use state::AppState;

/// Serve the webhook API on `addr` until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
