use serde::{Serialize, Deserialize};

use crate::loss::{bce::BceLoss, mse::MseLoss};

/// Selects which loss function the training loop uses.
///
/// - `BinaryCrossEntropy` — pair with a Sigmoid output.
/// - `Mse`                — pair with Identity or Sigmoid output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    BinaryCrossEntropy,
    Mse,
}

impl LossType {
    /// Scalar loss for one sample.
    pub fn loss(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        match self {
            LossType::BinaryCrossEntropy => BceLoss::loss(predicted, expected),
            LossType::Mse => MseLoss::loss(predicted, expected),
        }
    }

    /// ∂L/∂output for one sample.
    pub fn derivative(&self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        match self {
            LossType::BinaryCrossEntropy => BceLoss::derivative(predicted, expected),
            LossType::Mse => MseLoss::derivative(predicted, expected),
        }
    }
}
