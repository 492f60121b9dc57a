use super::AppState;
use super::form::CUSTOMER_FORM;
use crate::error::{SegmentError, Stage};
use crate::model::CustomerClusterEstimator;
use crate::pipeline::{CustomerData, PredictionPipeline, TrainPipeline};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info, warn};

/// Error envelope returned by every endpoint.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<SegmentError> for ApiError {
    fn from(e: SegmentError) -> Self {
        error!(stage = %e.stage(), error = %e, "Request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "status": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Run `f` on the blocking pool; a panicked task becomes a 500.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, SegmentError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(join) => Err(ApiError::from(SegmentError::rejected(
            Stage::Gateway,
            format!("worker task failed: {join}"),
        ))),
    }
}

pub(super) async fn train(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Training requested");
    let config = state.config.as_ref().clone();
    blocking(move || TrainPipeline::new(config).run_pipeline()).await?;
    Ok(Json(json!({ "status": true, "message": "Training successful!" })))
}

pub(super) async fn form() -> Html<&'static str> {
    Html(CUSTOMER_FORM)
}

pub(super) async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<CustomerData>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(data) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected prediction payload");
        ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: rejection.body_text(),
        }
    })?;

    let pipeline = PredictionPipeline::new(&state.config);
    let labels = blocking(move || pipeline.run_pipeline(&[data])).await?;
    let cluster = labels.first().copied().ok_or_else(|| {
        ApiError::from(SegmentError::invalid_input(
            Stage::Prediction,
            "model returned no label",
        ))
    })?;
    Ok(Json(json!({ "predicted_cluster": cluster })))
}

pub(super) async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let estimator = CustomerClusterEstimator::new(state.config.canonical_model_path());
    Json(json!({
        "status": "ok",
        "model_present": estimator.is_model_present(),
    }))
}
