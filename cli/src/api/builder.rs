//! Builder pattern for assembling a [`CarPriceEstimator`] from files on disk

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::api::estimator::CarPriceEstimator;
use crate::models::{InputLimits, VocabularyDocument};
use crate::services::{BuildOutcome, PricePipeline, Staleness, VocabularyBuilder};
use crate::utils::Logger;

pub const DEFAULT_VOCABULARY_PATH: &str = "data/strings.json";
pub const DEFAULT_DATASET_PATH: &str = "data/cleaned_data.csv";
pub const DEFAULT_PIPELINE_PATH: &str = "data/final_pipeline.json";

/// Builder for a file-backed estimator
///
/// # Example
/// ```rust,no_run
/// use pricelens::api::EstimatorBuilder;
///
/// let estimator = EstimatorBuilder::new()
///     .with_vocabulary_path("data/strings.json")
///     .with_pipeline_path("data/final_pipeline.json")
///     .with_auto_build(false)
///     .build()
///     .expect("estimator files are present");
/// ```
pub struct EstimatorBuilder {
    vocabulary_path: PathBuf,
    dataset_path: PathBuf,
    pipeline_path: PathBuf,
    auto_build: bool,
    limits: Option<InputLimits>,
}

impl EstimatorBuilder {
    pub fn new() -> Self {
        Self {
            vocabulary_path: PathBuf::from(DEFAULT_VOCABULARY_PATH),
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            pipeline_path: PathBuf::from(DEFAULT_PIPELINE_PATH),
            auto_build: true,
            limits: None,
        }
    }

    pub fn with_vocabulary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vocabulary_path = path.into();
        self
    }

    pub fn with_dataset_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset_path = path.into();
        self
    }

    pub fn with_pipeline_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pipeline_path = path.into();
        self
    }

    /// Build the vocabulary from the dataset when the document is missing
    pub fn with_auto_build(mut self, auto_build: bool) -> Self {
        self.auto_build = auto_build;
        self
    }

    pub fn with_limits(mut self, limits: InputLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Load (and optionally create) the vocabulary, then the pipeline.
    /// Either file being unusable is fatal.
    pub fn build(self) -> anyhow::Result<CarPriceEstimator> {
        let logger = Logger::new("ESTIMATOR");
        let vocabulary_builder = VocabularyBuilder::new(&self.dataset_path, &self.vocabulary_path);

        if self.auto_build {
            let outcome = vocabulary_builder
                .build()
                .with_context(|| format!("building {}", self.vocabulary_path.display()))?;
            if outcome == BuildOutcome::Created {
                logger.info(&format!("Created {}", self.vocabulary_path.display()));
            }
        }

        match vocabulary_builder.status() {
            Ok(Staleness::Stale) => logger.warn("Vocabulary document is older than its dataset"),
            Ok(_) => {}
            Err(e) => logger.debug(&format!("Skipping staleness check: {}", e)),
        }

        let vocabulary = VocabularyDocument::load(&self.vocabulary_path)
            .with_context(|| format!("loading {}", self.vocabulary_path.display()))?;
        let pipeline = PricePipeline::load(&self.pipeline_path)
            .with_context(|| format!("loading {}", self.pipeline_path.display()))?;

        let estimator = CarPriceEstimator::new(Arc::new(vocabulary), pipeline);
        Ok(match self.limits {
            Some(limits) => estimator.with_limits(limits),
            None => estimator,
        })
    }
}

impl Default for EstimatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feature_record::tests::sample_request;
    use crate::services::pipeline::tests::linear_artifact;
    use std::fs;

    const DATASET: &str = "\
Manufacturer,Model,Category,Fuel type,Gear box type,Drive wheels,Wheel,Color
TOYOTA,Prius,Hatchback,Hybrid,Automatic,Front,Left wheel,Silver
FORD,Focus,Sedan,Petrol,Manual,Front,Left wheel,Black
";

    #[test]
    fn test_build_creates_missing_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("cleaned_data.csv");
        let vocabulary = dir.path().join("strings.json");
        let pipeline = dir.path().join("final_pipeline.json");
        fs::write(&dataset, DATASET).unwrap();
        fs::write(&pipeline, linear_artifact().to_string()).unwrap();

        let estimator = EstimatorBuilder::new()
            .with_dataset_path(&dataset)
            .with_vocabulary_path(&vocabulary)
            .with_pipeline_path(&pipeline)
            .with_limits(InputLimits::for_year(2025))
            .build()
            .unwrap();

        assert!(vocabulary.exists());
        assert_eq!(estimator.vocabulary().manufacturers(), &["FORD", "TOYOTA"]);
        assert_eq!(estimator.estimate(&sample_request()).unwrap().formatted, "$23,700.00");
    }

    #[test]
    fn test_missing_files_are_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let result = EstimatorBuilder::new()
            .with_dataset_path(dir.path().join("none.csv"))
            .with_vocabulary_path(dir.path().join("strings.json"))
            .with_pipeline_path(dir.path().join("final_pipeline.json"))
            .with_auto_build(false)
            .build();
        assert!(result.is_err());

        fs::write(dir.path().join("strings.json"), "{}").unwrap();
        let result = EstimatorBuilder::new()
            .with_vocabulary_path(dir.path().join("strings.json"))
            .with_pipeline_path(dir.path().join("final_pipeline.json"))
            .with_auto_build(false)
            .build();
        assert!(result.is_err());
    }
}
