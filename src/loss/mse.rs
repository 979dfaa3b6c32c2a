/// Mean-squared error between the network output and a one-hot target.
pub struct MseLoss;

impl MseLoss {
    /// mean((predicted - onehot(class))²)
    pub fn loss(predicted: &[f64], class: usize) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().enumerate()
            .map(|(i, p)| (p - target(i, class)).powi(2))
            .sum::<f64>() / n
    }

    /// Per-output gradient: predicted - onehot(class)
    pub fn derivative(predicted: &[f64], class: usize) -> Vec<f64> {
        predicted.iter().enumerate()
            .map(|(i, p)| p - target(i, class))
            .collect()
    }
}

fn target(i: usize, class: usize) -> f64 {
    if i == class { 1.0 } else { 0.0 }
}
