//! Brain dump processing: free text in, Traffic Light tasks out.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use tracing::{info, instrument, warn};

use crate::{
    base::types::{BrainDumpRequest, BrainDumpResponse},
    runtime::Runtime,
    service::http::ApiError,
};

/// `POST /api/process-brain-dump`.
///
/// Every request is independent: the prompt is built from the request alone
/// and the LLM call is the only await point. Any invocation failure becomes a
/// 500 with the error message as `detail`.
#[instrument(skip_all)]
pub async fn process_brain_dump(State(runtime): State<Runtime>, payload: Result<Json<BrainDumpRequest>, JsonRejection>) -> Result<Json<BrainDumpResponse>, ApiError> {
    let Json(request) = payload?;

    info!("Processing brain dump ({} bytes) ...", request.raw_text.len());

    let response = runtime.llm.get_brain_dump_response(&request.raw_text).await?;

    // The lane limits are advisory: report, but return the tasks untouched.
    for violation in response.limit_violations() {
        warn!(
            "LLM exceeded the {} limit: {} tasks (max {}).",
            violation.category.as_str(),
            violation.count,
            violation.limit
        );
    }

    Ok(Json(response))
}
