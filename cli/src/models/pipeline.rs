use serde::{Deserialize, Serialize};

use crate::models::feature_record::FeatureColumn;

pub const PIPELINE_ARTIFACT_VERSION: u32 = 1;

/// Serialized, pre-trained price pipeline: preprocessing, top-k selection
/// and a regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArtifact {
    pub version: u32,
    pub preprocessor: PreprocessorParams,
    pub selector: SelectorParams,
    pub regressor: RegressorParams,
    #[serde(default)]
    pub target_transform: TargetTransform,
}

/// Numeric columns come first, then one one-hot block per categorical column
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreprocessorParams {
    #[serde(default)]
    pub numeric: Vec<NumericColumn>,
    #[serde(default)]
    pub categorical: Vec<CategoricalColumn>,
}

impl PreprocessorParams {
    /// Number of columns the preprocessor emits
    pub fn output_width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }
}

/// Standardized as `(x - mean) / scale`; flags are read as 0/1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub column: FeatureColumn,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub column: FeatureColumn,
    pub categories: Vec<String>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Emit an all-zero block
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorParams {
    pub feature_importances: Vec<f64>,
    pub k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegressorParams {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Mean over regression trees
    Forest { trees: Vec<RegressionTree> },
}

impl RegressorParams {
    pub fn kind(&self) -> &'static str {
        match self {
            RegressorParams::Linear { .. } => "linear",
            RegressorParams::Forest { .. } => "forest",
        }
    }
}

/// Flat node array, root at index 0. A node without children is a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: usize,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetTransform {
    #[default]
    Identity,
    /// Model was trained on `ln(1 + price)`
    Log1p,
}

impl TargetTransform {
    pub fn inverse(&self, value: f64) -> f64 {
        match self {
            TargetTransform::Identity => value,
            TargetTransform::Log1p => value.exp_m1(),
        }
    }
}
