//! Top-k feature selection by precomputed importance scores.
//!
//! Ties between equal scores go to the lower column index, and NaN ranks
//! below every number, so the selected set is deterministic for any input.

use std::cmp::Ordering;

use crate::error::SelectorError;
use crate::utils::matrix_utils::FeatureMatrix;

/// Descending by score, then ascending by index
fn rank(importances: &[f64], a: usize, b: usize) -> Ordering {
    let (x, y) = (importances[a], importances[b]);
    let by_score = match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
    };
    by_score.then(a.cmp(&b))
}

/// Positions of the `k` largest scores, returned in ascending index order.
///
/// Uses a partial selection (average O(n)) and only sorts the `k` winners.
pub fn indices_of_top_k(importances: &[f64], k: usize) -> Vec<usize> {
    let k = k.min(importances.len());
    if k == 0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..importances.len()).collect();
    if k < indices.len() {
        indices.select_nth_unstable_by(k - 1, |&a, &b| rank(importances, a, b));
        indices.truncate(k);
    }
    indices.sort_unstable();
    indices
}

/// Keeps the `k` input columns with the highest importance scores
#[derive(Debug, Clone, PartialEq)]
pub struct TopKFeatureSelector {
    feature_importances: Vec<f64>,
    k: usize,
    feature_indices: Option<Vec<usize>>,
}

impl TopKFeatureSelector {
    pub fn new(feature_importances: Vec<f64>, k: usize) -> Result<Self, SelectorError> {
        if k == 0 || k > feature_importances.len() {
            return Err(SelectorError::InvalidK {
                k,
                len: feature_importances.len(),
            });
        }

        Ok(Self {
            feature_importances,
            k,
            feature_indices: None,
        })
    }

    /// Compute the selected column set. The content of `_x` is not used.
    pub fn fit(&mut self, _x: &FeatureMatrix) -> &mut Self {
        self.feature_indices = Some(indices_of_top_k(&self.feature_importances, self.k));
        self
    }

    pub fn transform(&self, x: &FeatureMatrix) -> Result<FeatureMatrix, SelectorError> {
        let indices = self.feature_indices.as_deref().ok_or(SelectorError::NotFitted)?;

        if let Some(&max_index) = indices.last() {
            if max_index >= x.columns() {
                return Err(SelectorError::ShapeMismatch {
                    required: max_index,
                    actual: x.columns(),
                });
            }
        }

        Ok(x.select_columns(indices))
    }

    pub fn fit_transform(&mut self, x: &FeatureMatrix) -> Result<FeatureMatrix, SelectorError> {
        self.fit(x).transform(x)
    }

    /// Selected positions, ascending; `None` before `fit`
    pub fn feature_indices(&self) -> Option<&[usize]> {
        self.feature_indices.as_deref()
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn input_width(&self) -> usize {
        self.feature_importances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(columns: usize) -> FeatureMatrix {
        let rows = (0..3)
            .map(|r| (0..columns).map(|c| (r * 100 + c) as f64).collect())
            .collect();
        FeatureMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_selects_largest_scores_in_index_order() {
        let importances = vec![0.05, 0.40, 0.10, 0.30, 0.15];
        let mut selector = TopKFeatureSelector::new(importances, 3).unwrap();
        let x = matrix(5);

        let out = selector.fit_transform(&x).unwrap();

        assert_eq!(selector.feature_indices(), Some(&[1, 3, 4][..]));
        assert_eq!(out.shape, (3, 3));
        // Column order follows input positions, not the importance rank
        assert_eq!(out.row(0), &[1.0, 3.0, 4.0]);
        assert_eq!(out.row(2), &[201.0, 203.0, 204.0]);
    }

    #[test]
    fn test_k_equal_to_width_is_identity() {
        let importances = vec![0.3, 0.1, 0.2, 0.4];
        let mut selector = TopKFeatureSelector::new(importances, 4).unwrap();
        let x = matrix(4);

        assert_eq!(selector.fit_transform(&x).unwrap(), x);
    }

    #[test]
    fn test_ties_prefer_lower_index() {
        assert_eq!(indices_of_top_k(&[0.2, 0.5, 0.2, 0.2, 0.5], 3), vec![0, 1, 4]);
        assert_eq!(indices_of_top_k(&[1.0, 1.0, 1.0, 1.0], 2), vec![0, 1]);
    }

    #[test]
    fn test_nan_ranks_last() {
        assert_eq!(indices_of_top_k(&[f64::NAN, 0.1, 0.2], 2), vec![1, 2]);
    }

    #[test]
    fn test_matches_full_sort_for_many_widths() {
        // Compare the partial selection against a plain stable sort
        let importances: Vec<f64> = (0..40).map(|i| ((i * 37) % 11) as f64 / 10.0).collect();
        for k in 1..=importances.len() {
            let mut expected: Vec<usize> = (0..importances.len()).collect();
            expected.sort_by(|&a, &b| rank(&importances, a, b));
            expected.truncate(k);
            expected.sort_unstable();

            assert_eq!(indices_of_top_k(&importances, k), expected, "k = {}", k);
        }
    }

    #[test]
    fn test_invalid_k_is_rejected() {
        assert_eq!(
            TopKFeatureSelector::new(vec![0.1, 0.2], 0),
            Err(SelectorError::InvalidK { k: 0, len: 2 })
        );
        assert_eq!(
            TopKFeatureSelector::new(vec![0.1, 0.2], 3),
            Err(SelectorError::InvalidK { k: 3, len: 2 })
        );
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let selector = TopKFeatureSelector::new(vec![0.1, 0.2], 1).unwrap();
        assert_eq!(selector.transform(&matrix(2)), Err(SelectorError::NotFitted));
    }

    #[test]
    fn test_transform_with_too_few_columns_fails() {
        let mut selector = TopKFeatureSelector::new(vec![0.1, 0.2, 0.9], 1).unwrap();
        selector.fit(&matrix(3));

        assert_eq!(
            selector.transform(&matrix(2)),
            Err(SelectorError::ShapeMismatch { required: 2, actual: 2 })
        );
    }
}
