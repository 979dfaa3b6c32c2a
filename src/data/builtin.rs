//! Small deterministic 2D datasets for smoke runs and demos.
//!
//! Every generator takes an `offset` so a validation split can be drawn
//! from the same distribution without repeating training points.

use std::f64::consts::PI;

use crate::data::dataset::{ClassificationDataset, LabeledSample};
use crate::error::Result;

/// The four XOR points, two classes.
pub fn xor() -> Result<ClassificationDataset> {
    let samples = [
        ([0.0, 0.0], 0),
        ([0.0, 1.0], 1),
        ([1.0, 0.0], 1),
        ([1.0, 1.0], 0),
    ]
    .into_iter()
    .map(|(features, label)| LabeledSample { features: features.to_vec(), label })
    .collect();
    ClassificationDataset::new(samples, 2)
}

/// `n` points on two concentric rings (class 0 = inner, class 1 = outer).
pub fn circles(n: usize, offset: usize) -> Result<ClassificationDataset> {
    let samples = (offset..offset + n)
        .map(|i| {
            let label = i % 2;
            let angle = (i as f64 / (n + offset).max(1) as f64) * 2.0 * PI * 10.0;
            let radius = if label == 0 { 0.3 } else { 0.8 };
            // Deterministic jitter from a second sinusoid.
            let noise = 0.05 * (i as f64 * 7.3).sin();
            let x = (radius + noise) * angle.cos();
            let y = (radius + noise) * angle.sin();
            LabeledSample {
                features: vec![(x + 1.0) / 2.0, (y + 1.0) / 2.0],
                label,
            }
        })
        .collect();
    ClassificationDataset::new(samples, 2)
}

/// `n` points around two centres, (0.3, 0.3) and (0.7, 0.7).
pub fn blobs(n: usize, offset: usize) -> Result<ClassificationDataset> {
    let centers = [(0.3f64, 0.3f64), (0.7f64, 0.7f64)];
    let samples = (offset..offset + n)
        .map(|i| {
            let label = i % 2;
            let (cx, cy) = centers[label];
            let angle = i as f64 * 2.399;
            let r = 0.12 * (i as f64 * 0.31).sin().abs();
            LabeledSample {
                features: vec![
                    (cx + r * angle.cos()).clamp(0.0, 1.0),
                    (cy + r * angle.sin()).clamp(0.0, 1.0),
                ],
                label,
            }
        })
        .collect();
    ClassificationDataset::new(samples, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Dataset;

    #[test]
    fn test_sizes_and_balance() {
        let ds = blobs(10, 0).unwrap();
        assert_eq!(ds.len(), 10);
        assert_eq!(ds.samples().iter().filter(|s| s.label == 1).count(), 5);
        assert_eq!(circles(7, 3).unwrap().len(), 7);
        assert_eq!(xor().unwrap().len(), 4);
    }

    #[test]
    fn test_offset_gives_disjoint_points() {
        let train = blobs(20, 0).unwrap();
        let valid = blobs(20, 20).unwrap();
        assert_ne!(train.sample(0), valid.sample(0));
    }
}
