/// Binary cross-entropy; pair with a Sigmoid output layer.
pub struct BceLoss;

const EPS: f64 = 1e-12;

impl BceLoss {
    /// Scalar BCE: -mean(y·log(p+ε) + (1-y)·log(1-p+ε))
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| -(y * (p + EPS).ln() + (1.0 - y) * (1.0 - p + EPS).ln()))
            .sum::<f64>() / n
    }

    /// Per-output gradient ∂L/∂p: (p - y) / ((p + ε) · (1 - p + ε)) / n
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected.iter())
            .map(|(p, y)| (p - y) / ((p + EPS) * (1.0 - p + EPS)) / n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_correct_prediction_has_low_loss() {
        assert!(BceLoss::loss(&[0.99], &[1.0]) < 0.02);
        assert!(BceLoss::loss(&[0.01], &[1.0]) > 4.0);
    }

    #[test]
    fn gradient_through_sigmoid_is_p_minus_y() {
        // dL/dp · σ'(z) with σ'(z) = p(1-p) collapses to p - y.
        let p = 0.73;
        let grad = BceLoss::derivative(&[p], &[0.0])[0] * p * (1.0 - p);
        assert!((grad - p).abs() < 1e-9);
    }
}
