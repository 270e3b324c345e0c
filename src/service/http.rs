//! HTTP surface: router, CORS, error mapping, and the serve loop.

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument};

use crate::{
    base::types::{Err, Void},
    interaction,
    runtime::Runtime,
};

// Errors.

/// The single error boundary of the HTTP surface.
///
/// Callers can only tell "bad request shape" apart from "everything else".
#[derive(Debug)]
pub enum ApiError {
    /// The body did not match the expected request shape.
    Validation(JsonRejection),
    /// Anything that went wrong while producing the result.
    Invocation(Err),
}

/// JSON error body: `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The rejection text, or the top-level error message.
    pub detail: String,
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection)
    }
}

impl From<Err> for ApiError {
    fn from(err: Err) -> Self {
        ApiError::Invocation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Invocation(err) => {
                error!("Request failed: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}

// Router.

/// Build the application router over a shared runtime.
pub fn router(runtime: Runtime) -> Router {
    Router::new()
        .route("/api/health", get(interaction::health::health))
        .route("/api/lanes", get(interaction::lanes::get_lanes))
        .route("/api/parse-task", post(interaction::quick_add::parse_task))
        .route("/api/process-brain-dump", post(interaction::brain_dump::process_brain_dump))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(runtime)
}

/// Bind the configured address and serve until Ctrl-C.
#[instrument(skip_all)]
pub async fn serve(runtime: Runtime) -> Void {
    let listener = TcpListener::bind(&runtime.config.bind_address).await?;

    info!("Listening on http://{} ...", listener.local_addr()?);

    axum::serve(listener, router(runtime)).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server stopped.");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }

    info!("Shutting down ...");
}
