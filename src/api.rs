use crate::data_structures::{AppState, ErrorBody, SharedEstimator, SharedViewer, StockQuery};
use axum::{
    Router,
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::Query;
use pricelens::error::EstimateError;
use pricelens::models::FeatureRequest;
use tracing::{debug, error, info, instrument, warn};

/// All routes, without transport layers (CORS, rate limiting)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/form", get(form_options_handler))
        .route("/vocabulary", get(vocabulary_handler))
        .route("/vocabulary/models/{manufacturer}", get(models_handler))
        .route("/predict", post(predict_handler))
        .route("/stocks/{symbol}", get(stock_view_handler))
        .with_state(state)
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[instrument(skip(state))]
pub async fn form_options_handler(State(state): State<SharedEstimator>) -> impl IntoResponse {
    debug!("Received request for form options");

    let options = state.form_options();
    info!(
        manufacturer_count = options.manufacturers.len(),
        year_count = options.years.len(),
        "Returning form options"
    );
    (StatusCode::OK, Json(options))
}

#[instrument(skip(state))]
pub async fn vocabulary_handler(State(state): State<SharedEstimator>) -> impl IntoResponse {
    let vocabulary = state.vocabulary();
    debug!(key_count = vocabulary.len(), "Returning vocabulary document");
    (StatusCode::OK, Json(vocabulary.as_ref().clone()))
}

#[instrument(skip(state))]
pub async fn models_handler(State(state): State<SharedEstimator>, Path(manufacturer): Path<String>) -> Response {
    match state.vocabulary().models_for(&manufacturer) {
        Some(models) => {
            debug!(model_count = models.len(), "Returning models");
            (StatusCode::OK, Json(models.to_vec())).into_response()
        }
        None => {
            debug!("Unknown manufacturer");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorBody::new(format!("unknown manufacturer '{}'", manufacturer))),
            )
                .into_response()
        }
    }
}

#[instrument(skip(state, payload), fields(manufacturer = %payload.manufacturer, model = %payload.model))]
pub async fn predict_handler(State(state): State<SharedEstimator>, Json(payload): Json<FeatureRequest>) -> Response {
    debug!("Received prediction request");

    match state.estimate(&payload) {
        Ok(estimate) => {
            info!(id = %estimate.id, price = estimate.value, "Prediction complete");
            (StatusCode::OK, Json(estimate)).into_response()
        }
        Err(EstimateError::Input(e)) => {
            warn!(error = %e, "Rejected prediction input");
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody::new(e))).into_response()
        }
        Err(EstimateError::Inference(e)) => {
            error!(error = %e, "Prediction failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(e))).into_response()
        }
    }
}

#[instrument(skip(state, query), fields(start = %query.start, end = %query.end))]
pub async fn stock_view_handler(
    State(state): State<SharedViewer>,
    Path(symbol): Path<String>,
    Query(query): Query<StockQuery>,
) -> Response {
    debug!("Received stock view request");

    match state.view(&symbol, query.start, query.end).await {
        Ok(view) => {
            info!(bar_count = view.bars.len(), "Returning stock view");
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Rejected date range");
            (StatusCode::BAD_REQUEST, Json(ErrorBody::new(e))).into_response()
        }
    }
}
