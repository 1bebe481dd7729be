use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::error::InferenceError;
use crate::models::feature_record::FeatureRecord;
use crate::services::pipeline::PricePredictor;
use crate::utils::format_currency;

/// Result of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceEstimate {
    pub id: Uuid,
    pub value: f64,
    pub formatted: String,
}

impl PriceEstimate {
    fn new(value: f64) -> Result<Self, InferenceError> {
        if !value.is_finite() {
            return Err(InferenceError::NonFinite(value));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            value,
            formatted: format_currency(value),
        })
    }
}

/// Turns one validated record into a formatted price
pub struct InferenceFacade<P> {
    pipeline: P,
}

impl<P: PricePredictor> InferenceFacade<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Predict a single-row batch and format the first value
    pub fn estimate(&self, record: &FeatureRecord) -> Result<PriceEstimate, InferenceError> {
        let predictions = self.pipeline.predict(std::slice::from_ref(record))?;
        let value = predictions.first().copied().ok_or(InferenceError::EmptyPrediction)?;
        PriceEstimate::new(value)
    }

    /// One estimate per record, in input order. Records are predicted
    /// independently, so one bad row does not fail the rest.
    pub fn estimate_batch(&self, records: &[FeatureRecord]) -> Vec<Result<PriceEstimate, InferenceError>> {
        records.par_iter().map(|record| self.estimate(record)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::models::feature_record::tests::{sample_request, sample_vocabulary};
    use crate::models::feature_record::InputLimits;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPipeline {
        output: Vec<f64>,
        calls: AtomicUsize,
    }

    impl FixedPipeline {
        fn returning(output: Vec<f64>) -> Self {
            Self {
                output,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PricePredictor for FixedPipeline {
        fn predict(&self, records: &[FeatureRecord]) -> Result<Vec<f64>, PipelineError> {
            assert_eq!(records.len(), 1);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    struct FailingPipeline;

    impl PricePredictor for FailingPipeline {
        fn predict(&self, _records: &[FeatureRecord]) -> Result<Vec<f64>, PipelineError> {
            Err(PipelineError::UnknownCategory {
                column: "Model".to_string(),
                value: "Mystery".to_string(),
            })
        }
    }

    fn record() -> FeatureRecord {
        FeatureRecord::from_request(&sample_request(), &sample_vocabulary(), &InputLimits::for_year(2025)).unwrap()
    }

    #[test]
    fn test_estimate_formats_first_prediction() {
        let facade = InferenceFacade::new(FixedPipeline::returning(vec![23456.7]));
        let estimate = facade.estimate(&record()).unwrap();

        assert_eq!(estimate.formatted, "$23,456.70");
        assert_eq!(estimate.value, 23456.7);
        assert_eq!(facade.pipeline().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_each_estimate_is_a_fresh_value() {
        let facade = InferenceFacade::new(FixedPipeline::returning(vec![1000.0]));
        let first = facade.estimate(&record()).unwrap();
        let second = facade.estimate(&record()).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.formatted, second.formatted);
    }

    #[test]
    fn test_pipeline_failures_surface() {
        let facade = InferenceFacade::new(FailingPipeline);
        assert!(matches!(
            facade.estimate(&record()),
            Err(InferenceError::Pipeline(PipelineError::UnknownCategory { .. }))
        ));

        let facade = InferenceFacade::new(FixedPipeline::returning(vec![]));
        assert!(matches!(facade.estimate(&record()), Err(InferenceError::EmptyPrediction)));

        let facade = InferenceFacade::new(FixedPipeline::returning(vec![f64::NAN]));
        assert!(matches!(facade.estimate(&record()), Err(InferenceError::NonFinite(_))));
    }

    #[test]
    fn test_estimate_batch_keeps_order() {
        let facade = InferenceFacade::new(FixedPipeline::returning(vec![42.0]));
        let records = vec![record(), record(), record()];

        let estimates = facade.estimate_batch(&records);
        assert_eq!(estimates.len(), 3);
        assert!(estimates.iter().all(|e| e.as_ref().unwrap().formatted == "$42.00"));
        assert_eq!(facade.pipeline().calls.load(Ordering::SeqCst), 3);
    }
}
