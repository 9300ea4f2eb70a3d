//! The XOR task: fixed dataset, fixed architecture and hyperparameters, and
//! the train / convert steps the binaries run.

use std::path::Path;

use rand::Rng;
use tracing::info;

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::lite::converter::Converter;
use crate::loss::loss_type::LossType;
use crate::network::network::Network;
use crate::network::spec::{LayerSpec, NetworkSpec};
use crate::optim::sgd::Sgd;
use crate::train::loop_fn::train_loop;
use crate::train::train_config::TrainConfig;

/// Trainer output, converter input.
pub const MODEL_PATH: &str = "xor_model.json";
/// Converter output.
pub const LITE_MODEL_PATH: &str = "xor_model.xlite";

pub const XOR_INPUTS: [[f64; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
pub const XOR_LABELS: [f64; 4] = [0.0, 1.0, 1.0, 0.0];

/// Hyperparameters for the XOR run.
#[derive(Debug, Clone, PartialEq)]
pub struct XorConfig {
    pub hidden_units: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: usize,
    pub loss: LossType,
}

impl Default for XorConfig {
    fn default() -> Self {
        XorConfig {
            hidden_units: 8,
            learning_rate: 0.1,
            batch_size: 1,
            epochs: 1000,
            loss: LossType::BinaryCrossEntropy,
        }
    }
}

impl XorConfig {
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig::new(self.epochs, self.batch_size, self.loss)
    }
}

/// The four truth-table rows as owned `(inputs, labels)`.
pub fn dataset() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let inputs = XOR_INPUTS.iter().map(|x| x.to_vec()).collect();
    let labels = XOR_LABELS.iter().map(|&y| vec![y]).collect();
    (inputs, labels)
}

/// 2 → hidden (tanh) → 1 (sigmoid).
pub fn network_spec(config: &XorConfig) -> NetworkSpec {
    NetworkSpec {
        name: "xor".to_string(),
        layers: vec![
            LayerSpec::new(config.hidden_units, 2, ActivationFunction::Tanh),
            LayerSpec::new(1, config.hidden_units, ActivationFunction::Sigmoid),
        ],
        loss: config.loss,
    }
}

/// Builds and trains a fresh network; returns it with the final epoch's loss.
pub fn train<R: Rng + ?Sized>(config: &XorConfig, rng: &mut R) -> Result<(Network, f64)> {
    let mut network = Network::from_spec(&network_spec(config), &mut *rng);
    let (inputs, labels) = dataset();
    let optimizer = Sgd::new(config.learning_rate);

    info!(
        epochs = config.epochs,
        learning_rate = config.learning_rate,
        batch_size = config.batch_size,
        "training XOR network"
    );
    let loss = train_loop(
        &mut network,
        &inputs,
        &labels,
        &optimizer,
        &config.train_config(),
        rng,
    )?;
    Ok((network, loss))
}

/// Predicted probability for each XOR input row, in `XOR_INPUTS` order.
pub fn predictions(network: &Network) -> Vec<f64> {
    let (inputs, _) = dataset();
    network.predict_batch(&inputs).into_iter().map(|p| p[0]).collect()
}

/// Trains, saves to `model_path`, and returns the trained network.
pub fn train_and_save<R: Rng + ?Sized>(
    config: &XorConfig,
    model_path: impl AsRef<Path>,
    rng: &mut R,
) -> Result<Network> {
    let (network, loss) = train(config, rng)?;
    info!(loss, "training finished");
    network.save(model_path)?;
    Ok(network)
}

/// Converts the model file at `model_path` and writes the result to
/// `lite_path`. Nothing is written unless loading and conversion succeed.
pub fn convert_file(model_path: impl AsRef<Path>, lite_path: impl AsRef<Path>) -> Result<usize> {
    let lite_path = lite_path.as_ref();
    let bytes = Converter::from_model_file(model_path)?.convert()?;
    std::fs::write(lite_path, &bytes).map_err(|e| Error::io(lite_path, e))?;
    info!(path = %lite_path.display(), bytes = bytes.len(), "wrote inference model");
    Ok(bytes.len())
}
