use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};

/// Random-access collection of samples.
pub trait Dataset {
    type Sample: Clone;

    fn len(&self) -> usize;

    /// Sample at `index`; callers guarantee `index < len()`.
    fn sample(&self, index: usize) -> Self::Sample;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> Dataset for Vec<T> {
    type Sample = T;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn sample(&self, index: usize) -> T {
        self[index].clone()
    }
}

/// One feature vector with its class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub features: Vec<f64>,
    pub label: usize,
}

/// Labelled samples held in memory, with a consistent feature width.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationDataset {
    samples: Vec<LabeledSample>,
    n_features: usize,
    n_classes: usize,
}

impl ClassificationDataset {
    /// Checks that every row has the same width and a label below `n_classes`.
    pub fn new(samples: Vec<LabeledSample>, n_classes: usize) -> Result<Self> {
        let n_features = samples.first().map(|s| s.features.len()).unwrap_or(0);
        for (i, s) in samples.iter().enumerate() {
            if s.features.len() != n_features {
                return Err(TrainError::dataset(format!(
                    "Row {}: feature count {} does not match first row's {}",
                    i + 1,
                    s.features.len(),
                    n_features
                )));
            }
            if s.label >= n_classes {
                return Err(TrainError::dataset(format!(
                    "Row {}: class index {} >= n_classes {}",
                    i + 1,
                    s.label,
                    n_classes
                )));
            }
        }
        Ok(ClassificationDataset { samples, n_features, n_classes })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }
}

impl Dataset for ClassificationDataset {
    type Sample = LabeledSample;

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn sample(&self, index: usize) -> LabeledSample {
        self.samples[index].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(features: &[f64], label: usize) -> LabeledSample {
        LabeledSample { features: features.to_vec(), label }
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = ClassificationDataset::new(vec![s(&[1.0, 2.0], 0), s(&[1.0], 1)], 2);
        assert!(matches!(err, Err(TrainError::Dataset(_))));
    }

    #[test]
    fn test_rejects_label_out_of_range() {
        let err = ClassificationDataset::new(vec![s(&[1.0], 2)], 2);
        assert!(matches!(err, Err(TrainError::Dataset(_))));
    }

    #[test]
    fn test_shape_accessors() {
        let ds = ClassificationDataset::new(vec![s(&[1.0, 2.0, 3.0], 1)], 4).unwrap();
        assert_eq!(ds.n_features(), 3);
        assert_eq!(ds.n_classes(), 4);
        assert_eq!(ds.len(), 1);
    }
}
