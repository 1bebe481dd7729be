//! Car price estimation entry point
//!
//! Validates raw requests against the vocabulary and the form limits, then
//! hands the record to the inference facade.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{EstimateError, InferenceError, InputError};
use crate::models::{
    CategoricalField, FeatureRecord, FeatureRequest, InputLimits, VocabularyDocument,
};
use crate::services::{InferenceFacade, PriceEstimate, PricePipeline, PricePredictor};

/// Everything a client needs to render the estimator form
#[derive(Debug, Clone, Serialize)]
pub struct FormOptions {
    pub manufacturers: Vec<String>,
    pub models: BTreeMap<String, Vec<String>>,
    pub categories: Vec<String>,
    pub fuel_types: Vec<String>,
    pub gear_box_types: Vec<String>,
    pub drive_wheel_types: Vec<String>,
    pub wheel_types: Vec<String>,
    pub color_types: Vec<String>,
    pub years: Vec<i32>,
    pub limits: InputLimits,
}

pub struct CarPriceEstimator<P = PricePipeline> {
    vocabulary: Arc<VocabularyDocument>,
    facade: InferenceFacade<P>,
    fixed_limits: Option<InputLimits>,
}

impl<P: PricePredictor> CarPriceEstimator<P> {
    pub fn new(vocabulary: Arc<VocabularyDocument>, pipeline: P) -> Self {
        Self {
            vocabulary,
            facade: InferenceFacade::new(pipeline),
            fixed_limits: None,
        }
    }

    /// Pin the limits instead of deriving them from the current year
    pub fn with_limits(mut self, limits: InputLimits) -> Self {
        self.fixed_limits = Some(limits);
        self
    }

    pub fn vocabulary(&self) -> &Arc<VocabularyDocument> {
        &self.vocabulary
    }

    pub fn limits(&self) -> InputLimits {
        self.fixed_limits.clone().unwrap_or_else(InputLimits::current)
    }

    pub fn form_options(&self) -> FormOptions {
        let vocabulary = &self.vocabulary;
        let list = |field: CategoricalField| vocabulary.options(field).to_vec();
        let limits = self.limits();

        let models = vocabulary
            .manufacturers()
            .iter()
            .map(|m| (m.clone(), vocabulary.models_for(m).unwrap_or_default().to_vec()))
            .collect();

        FormOptions {
            manufacturers: list(CategoricalField::Manufacturer),
            models,
            categories: list(CategoricalField::Category),
            fuel_types: list(CategoricalField::FuelType),
            gear_box_types: list(CategoricalField::GearBoxType),
            drive_wheel_types: list(CategoricalField::DriveWheels),
            wheel_types: list(CategoricalField::Wheel),
            color_types: list(CategoricalField::Color),
            years: limits.year_options(),
            limits,
        }
    }

    pub fn record(&self, request: &FeatureRequest) -> Result<FeatureRecord, InputError> {
        FeatureRecord::from_request(request, &self.vocabulary, &self.limits())
    }

    pub fn estimate(&self, request: &FeatureRequest) -> Result<PriceEstimate, EstimateError> {
        let record = self.record(request)?;
        Ok(self.facade.estimate(&record)?)
    }

    /// One result per request, in input order. Valid rows go through the
    /// facade as one batch; rejected rows keep their input error.
    pub fn estimate_batch(&self, requests: &[FeatureRequest]) -> Vec<Result<PriceEstimate, EstimateError>> {
        let limits = self.limits();
        let mut records = Vec::with_capacity(requests.len());
        let rejections: Vec<Option<InputError>> = requests
            .iter()
            .map(|request| match FeatureRecord::from_request(request, &self.vocabulary, &limits) {
                Ok(record) => {
                    records.push(record);
                    None
                }
                Err(e) => Some(e),
            })
            .collect();

        let mut estimates = self.facade.estimate_batch(&records).into_iter();
        rejections
            .into_iter()
            .map(|rejection| match rejection {
                Some(e) => Err(e.into()),
                None => estimates
                    .next()
                    .unwrap_or(Err(InferenceError::EmptyPrediction))
                    .map_err(EstimateError::from),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feature_record::tests::{sample_request, sample_vocabulary};
    use crate::services::pipeline::tests::linear_artifact;

    fn estimator() -> CarPriceEstimator {
        let pipeline = PricePipeline::from_artifact(serde_json::from_value(linear_artifact()).unwrap()).unwrap();
        CarPriceEstimator::new(Arc::new(sample_vocabulary()), pipeline).with_limits(InputLimits::for_year(2025))
    }

    #[test]
    fn test_estimate_end_to_end() {
        let estimate = estimator().estimate(&sample_request()).unwrap();
        assert_eq!(estimate.formatted, "$23,700.00");
    }

    #[test]
    fn test_unknown_value_is_rejected_before_prediction() {
        let mut request = sample_request();
        request.color = "Chartreuse".to_string();

        assert!(matches!(
            estimator().estimate(&request),
            Err(EstimateError::Input(InputError::UnknownValue { field: CategoricalField::Color, .. }))
        ));
    }

    #[test]
    fn test_form_options() {
        let options = estimator().form_options();

        assert_eq!(options.manufacturers, vec!["FORD", "TOYOTA"]);
        assert_eq!(options.models["TOYOTA"], vec!["Camry", "Prius"]);
        assert_eq!(options.years.len(), 100);
        assert_eq!(options.years[0], 2025);
        assert_eq!(options.limits.doors.max, 8);
    }

    #[test]
    fn test_estimate_batch_reports_per_row() {
        let mut bad = sample_request();
        bad.doors = 0;

        let results = estimator().estimate_batch(&[sample_request(), bad, sample_request()]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().formatted, "$23,700.00");
        assert!(matches!(results[1], Err(EstimateError::Input(InputError::OutOfRange { field: "doors", .. }))));
        assert_eq!(results[2].as_ref().unwrap().formatted, "$23,700.00");
    }
}
