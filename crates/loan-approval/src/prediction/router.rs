use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::request::PredictRequest;
use super::service::{PredictionError, PredictionService, INVALID_MODEL_MESSAGE};

/// Router builder exposing the liveness message, prediction, and model listing.
pub fn prediction_router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/predict", post(predict_handler))
        .route("/models", get(models_handler))
        .with_state(service)
}

pub(crate) async fn home_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": "Loan approval prediction service is running" }))
}

pub(crate) async fn predict_handler(
    State(service): State<Arc<PredictionService>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let payload = json!({
                "error": rejection.body_text(),
                "field": "body",
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
        }
    };

    match service.handle(&request) {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn models_handler(
    State(service): State<Arc<PredictionService>>,
) -> Json<serde_json::Value> {
    let settings = service.settings();
    Json(json!({
        "models": service.models(),
        "default_model": settings.default_model,
        "default_threshold": settings.default_threshold,
        "simple_threshold": settings.simple_threshold,
    }))
}

impl IntoResponse for PredictionError {
    fn into_response(self) -> Response {
        match self {
            PredictionError::Validation(error) => {
                let payload = json!({
                    "error": error.to_string(),
                    "field": error.field,
                });
                (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
            }
            PredictionError::InvalidSelection(_) => {
                let payload = json!({ "error": INVALID_MODEL_MESSAGE });
                (StatusCode::BAD_REQUEST, Json(payload)).into_response()
            }
            PredictionError::Inference { .. } => {
                let payload = json!({ "error": self.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
            }
        }
    }
}
