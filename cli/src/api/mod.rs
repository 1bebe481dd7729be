//! High-level API for easy library usage
//!
//! Wraps vocabulary validation and the price pipeline behind one estimator.

pub mod builder;
pub mod estimator;

pub use builder::EstimatorBuilder;
pub use estimator::{CarPriceEstimator, FormOptions};
