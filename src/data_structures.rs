use axum::extract::FromRef;
use pricelens::api::CarPriceEstimator;
use pricelens::services::StockViewer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// --- Type Aliases for Shared State ---

// Vocabulary plus pipeline, loaded once at startup and never mutated
pub type SharedEstimator = Arc<CarPriceEstimator>;

// Market data lookups; the only interior mutability is the client's rate-limit window
pub type SharedViewer = Arc<StockViewer>;

#[derive(Clone)]
pub struct AppState {
    pub estimator: SharedEstimator,
    pub viewer: SharedViewer,
}

impl FromRef<AppState> for SharedEstimator {
    fn from_ref(app_state: &AppState) -> SharedEstimator {
        app_state.estimator.clone()
    }
}

impl FromRef<AppState> for SharedViewer {
    fn from_ref(app_state: &AppState) -> SharedViewer {
        app_state.viewer.clone()
    }
}

// --- Request / Response Bodies ---

#[derive(Debug, Clone, Deserialize)]
pub struct StockQuery {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
