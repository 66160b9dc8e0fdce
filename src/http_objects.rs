use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use data_model::{BucketOutcome, BucketResult};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

#[derive(Debug, ToSchema, Serialize, Deserialize)]
pub struct AssetsAPIError {
    #[serde(skip)]
    status_code: StatusCode,
    message: String,
}

impl AssetsAPIError {
    pub fn new(status_code: StatusCode, message: &str) -> Self {
        Self {
            status_code,
            message: message.to_string(),
        }
    }

    pub fn internal_error(e: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string().as_str())
    }
}

impl IntoResponse for AssetsAPIError {
    fn into_response(self) -> Response {
        error!("API Error: {} - {}", self.status_code, self.message);
        (self.status_code, self.message).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BucketReconcileStatus {
    pub name: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<BucketResult> for BucketReconcileStatus {
    fn from(result: BucketResult) -> Self {
        Self {
            name: result.name,
            outcome: result.outcome.as_ref().to_string(),
            detail: result.detail,
        }
    }
}

/// Body of the reconciliation endpoint. Per-bucket failures live in
/// `results`, never in the HTTP status; only a failed listing turns into a
/// 500.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    pub success: bool,
    pub results: Vec<BucketReconcileStatus>,
}

impl ReconcileResponse {
    pub fn from_results(results: Vec<BucketResult>) -> Self {
        let success = results
            .iter()
            .all(|r| r.outcome != BucketOutcome::Failed);
        Self {
            success,
            results: results.into_iter().map(Into::into).collect(),
        }
    }
}
