//! # pricelens - used car price estimation and stock history lookup
//!
//! Library behind the `pricelens` CLI and the web server:
//! - Vocabulary of valid categorical values, built from the cleaned dataset
//! - Validated feature records and a serialized preprocessing/regression pipeline
//! - Top-k feature selection by importance
//! - Daily price history from a chart API, shaped for tables and charts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pricelens::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let estimator = EstimatorBuilder::new().build()?;
//!     let request: FeatureRequest = serde_json::from_str(r#"{
//!         "manufacturer": "TOYOTA", "model": "Prius", "category": "Hatchback",
//!         "leather_interior": "Yes", "fuel_type": "Hybrid", "engine_volume": 1.8,
//!         "turbo": false, "mileage": 120000, "cylinders": 4, "gear_box_type": "Automatic",
//!         "drive_wheels": "Front", "doors": 4, "wheel": "Left wheel", "color": "Silver",
//!         "airbags": 8, "prod_year": 2015, "levy": 950
//!     }"#)?;
//!     println!("{}", estimator.estimate(&request)?.formatted);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Public API for easy library usage
pub mod api;

// Prelude for convenient imports
pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! ```rust
    //! use pricelens::prelude::*;
    //! ```

    pub use crate::api::{CarPriceEstimator, EstimatorBuilder, FormOptions};
    pub use crate::error::{EstimateError, InputError};
    pub use crate::models::{CategoricalField, FeatureRequest, InputLimits, StockView, VocabularyDocument};
    pub use crate::services::{ChartApiClient, MarketDataConfig, MarketDataSource, PriceEstimate, StockViewer};
}

// Re-export some commonly used utilities
pub use utils::{init_logger, Logger, Timer};
