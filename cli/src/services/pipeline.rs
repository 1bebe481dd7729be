use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::error::PipelineError;
use crate::models::feature_record::{ColumnKind, FeatureRecord, FieldValue};
use crate::models::pipeline::{
    HandleUnknown, PipelineArtifact, PreprocessorParams, RegressionTree, RegressorParams, TargetTransform,
    PIPELINE_ARTIFACT_VERSION,
};
use crate::utils::{FeatureMatrix, Logger, Timer, TopKFeatureSelector};

/// Anything that turns validated records into prices
pub trait PricePredictor: Send + Sync {
    fn predict(&self, records: &[FeatureRecord]) -> Result<Vec<f64>, PipelineError>;
}

/// Executes a [`PipelineArtifact`]: preprocess, select top-k columns, regress
#[derive(Debug)]
pub struct PricePipeline {
    preprocessor: PreprocessorParams,
    selector: TopKFeatureSelector,
    regressor: RegressorParams,
    target_transform: TargetTransform,
}

impl PricePipeline {
    /// Read and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let logger = Logger::new("PIPELINE");
        let timer = Timer::start("pipeline load");

        let content = fs::read_to_string(path).map_err(|source| PipelineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: PipelineArtifact = serde_json::from_str(&content)?;
        let pipeline = Self::from_artifact(artifact)?;

        logger.info(&format!(
            "Loaded pipeline from {} ({} inputs, k={}, {} regressor)",
            path.display(),
            pipeline.selector.input_width(),
            pipeline.selector.k(),
            pipeline.regressor.kind()
        ));
        timer.log_elapsed("PIPELINE");
        Ok(pipeline)
    }

    /// Validate shapes and fit the selector. Every check here runs once, so
    /// prediction only fails on bad records.
    pub fn from_artifact(artifact: PipelineArtifact) -> Result<Self, PipelineError> {
        if artifact.version != PIPELINE_ARTIFACT_VERSION {
            return Err(PipelineError::UnsupportedVersion(artifact.version));
        }

        for numeric in &artifact.preprocessor.numeric {
            if !numeric.scale.is_finite() || numeric.scale == 0.0 || !numeric.mean.is_finite() {
                return Err(PipelineError::Incompatible(format!(
                    "column '{}' has an unusable mean/scale",
                    numeric.column
                )));
            }
        }

        validate_columns(&artifact.preprocessor)?;

        let width = artifact.preprocessor.output_width();
        if artifact.selector.feature_importances.len() != width {
            return Err(PipelineError::Incompatible(format!(
                "selector expects {} features but preprocessing produces {}",
                artifact.selector.feature_importances.len(),
                width
            )));
        }

        let mut selector = TopKFeatureSelector::new(artifact.selector.feature_importances, artifact.selector.k)?;
        selector.fit(&FeatureMatrix::zeros(0, width));

        validate_regressor(&artifact.regressor, selector.k())?;

        Ok(Self {
            preprocessor: artifact.preprocessor,
            selector,
            regressor: artifact.regressor,
            target_transform: artifact.target_transform,
        })
    }

    /// Expand records into the numeric design matrix
    pub fn preprocess(&self, records: &[FeatureRecord]) -> Result<FeatureMatrix, PipelineError> {
        let width = self.preprocessor.output_width();
        let mut matrix = FeatureMatrix::zeros(records.len(), width);

        for (r, record) in records.iter().enumerate() {
            let row = matrix.row_mut(r);
            let mut offset = 0;

            for numeric in &self.preprocessor.numeric {
                let raw = match record.value(numeric.column) {
                    FieldValue::Number(value) => value,
                    FieldValue::Flag(flag) => f64::from(u8::from(flag)),
                    FieldValue::Text(_) => {
                        return Err(PipelineError::WrongKind {
                            column: numeric.column.to_string(),
                            expected: "numeric",
                        })
                    }
                };
                row[offset] = (raw - numeric.mean) / numeric.scale;
                offset += 1;
            }

            for categorical in &self.preprocessor.categorical {
                let FieldValue::Text(value) = record.value(categorical.column) else {
                    return Err(PipelineError::WrongKind {
                        column: categorical.column.to_string(),
                        expected: "text",
                    });
                };

                match categorical.categories.iter().position(|c| c == value) {
                    Some(position) => row[offset + position] = 1.0,
                    None if categorical.handle_unknown == HandleUnknown::Ignore => {}
                    None => {
                        return Err(PipelineError::UnknownCategory {
                            column: categorical.column.to_string(),
                            value: value.to_string(),
                        })
                    }
                }
                offset += categorical.categories.len();
            }
        }

        Ok(matrix)
    }

    fn regress(&self, features: &[f64]) -> f64 {
        let raw = match &self.regressor {
            RegressorParams::Linear { coefficients, intercept } => {
                intercept + coefficients.iter().zip(features).map(|(w, x)| w * x).sum::<f64>()
            }
            RegressorParams::Forest { trees } => {
                trees.iter().map(|tree| evaluate_tree(tree, features)).sum::<f64>() / trees.len() as f64
            }
        };
        self.target_transform.inverse(raw)
    }
}

impl PricePredictor for PricePipeline {
    fn predict(&self, records: &[FeatureRecord]) -> Result<Vec<f64>, PipelineError> {
        let design = self.preprocess(records)?;
        let selected = self.selector.transform(&design)?;

        Ok((0..selected.rows())
            .into_par_iter()
            .map(|r| self.regress(selected.row(r)))
            .collect())
    }
}

// Each column is used once, numeric blocks take numbers or flags, one-hot blocks take text
fn validate_columns(preprocessor: &PreprocessorParams) -> Result<(), PipelineError> {
    let mut seen = HashSet::new();
    let numeric = preprocessor.numeric.iter().map(|c| (c.column, false));
    let categorical = preprocessor.categorical.iter().map(|c| (c.column, true));

    for (column, one_hot) in numeric.chain(categorical) {
        if !seen.insert(column) {
            return Err(PipelineError::Incompatible(format!("column '{}' is encoded twice", column)));
        }
        let is_text = column.kind() == ColumnKind::Text;
        if one_hot != is_text {
            return Err(PipelineError::Incompatible(format!(
                "column '{}' holds {:?} values and cannot be {}",
                column,
                column.kind(),
                if one_hot { "one-hot encoded" } else { "standardized" }
            )));
        }
    }
    Ok(())
}

fn validate_regressor(regressor: &RegressorParams, width: usize) -> Result<(), PipelineError> {
    match regressor {
        RegressorParams::Linear { coefficients, .. } => {
            if coefficients.len() != width {
                return Err(PipelineError::Incompatible(format!(
                    "linear regressor has {} coefficients for {} selected features",
                    coefficients.len(),
                    width
                )));
            }
        }
        RegressorParams::Forest { trees } => {
            if trees.is_empty() {
                return Err(PipelineError::Incompatible("forest has no trees".to_string()));
            }
            for (t, tree) in trees.iter().enumerate() {
                validate_tree(tree, width).map_err(|reason| {
                    PipelineError::Incompatible(format!("tree {}: {}", t, reason))
                })?;
            }
        }
    }
    Ok(())
}

// Children must point forward so evaluation always terminates
fn validate_tree(tree: &RegressionTree, width: usize) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("no nodes".to_string());
    }

    for (i, node) in tree.nodes.iter().enumerate() {
        match (node.left, node.right) {
            (None, None) => {}
            (Some(left), Some(right)) => {
                if node.feature >= width {
                    return Err(format!("node {} splits on feature {} of {}", i, node.feature, width));
                }
                for child in [left, right] {
                    if child <= i || child >= tree.nodes.len() {
                        return Err(format!("node {} has invalid child {}", i, child));
                    }
                }
            }
            _ => return Err(format!("node {} has a single child", i)),
        }
    }
    Ok(())
}

fn evaluate_tree(tree: &RegressionTree, features: &[f64]) -> f64 {
    let mut index = 0;
    loop {
        let node = &tree.nodes[index];
        match (node.left, node.right) {
            (Some(left), Some(right)) => {
                index = if features[node.feature] <= node.threshold { left } else { right };
            }
            _ => return node.value,
        }
    }
}
