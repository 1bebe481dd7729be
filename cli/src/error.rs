use std::path::PathBuf;

use thiserror::Error;

use crate::models::CategoricalField;

/// Errors raised by the top-k feature selector
#[derive(Debug, Error, PartialEq)]
pub enum SelectorError {
    #[error("k must be between 1 and {len}, got {k}")]
    InvalidK { k: usize, len: usize },

    #[error("selector has not been fitted")]
    NotFitted,

    #[error("input has {actual} columns but column index {required} was selected")]
    ShapeMismatch { required: usize, actual: usize },
}

/// Rejections produced while turning a raw request into a validated record
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{field} value '{value}' is not in the vocabulary")]
    UnknownValue { field: CategoricalField, value: String },

    #[error("no models are known for manufacturer '{0}'")]
    UnknownManufacturer(String),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },

    #[error("{field} must be a multiple of {step}, got {value}")]
    OffStep {
        field: &'static str,
        value: f64,
        step: f64,
    },
}

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid vocabulary document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to persist vocabulary document {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read pipeline artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pipeline artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported pipeline artifact version {0}")]
    UnsupportedVersion(u32),

    #[error("incompatible pipeline artifact: {0}")]
    Incompatible(String),

    #[error("unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("column '{column}' expected a {expected} value")]
    WrongKind {
        column: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("pipeline returned no prediction")]
    EmptyPrediction,

    #[error("pipeline returned a non-finite prediction: {0}")]
    NonFinite(f64),
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode chart response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid chart response: {0}")]
    InvalidResponse(String),

    #[error("no data returned for {0}")]
    NoData(String),
}

/// Anything that can stop a request from becoming a price
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}
