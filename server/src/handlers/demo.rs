//! The demo write endpoint.

use crate::error::AppError;
use crate::middleware::RequestId;
use crate::state::AppState;
use crate::types::{CountryId, StateId};
use crate::workflows::demo::run_demo_write;
use axum::{extract::State, Extension, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DemoWriteResponse {
    pub message: String,
    pub country_id: CountryId,
    pub state_id: StateId,
}

/// `POST /api/v1/demo`: runs the transactional demo write and reports the
/// keys it committed. Failures map to real status codes through [`AppError`].
pub async fn demo_write(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> Result<Json<DemoWriteResponse>, AppError> {
    let outcome = run_demo_write(state.manager.as_ref()).await?;
    tracing::info!(
        request_id = %request_id.0,
        txn_id = %outcome.txn_id,
        country_id = %outcome.country_id,
        state_id = %outcome.state_id,
        "demo write committed"
    );
    Ok(Json(DemoWriteResponse {
        message: "demo write committed".to_string(),
        country_id: outcome.country_id,
        state_id: outcome.state_id,
    }))
}
