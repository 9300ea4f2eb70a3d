use std::time::Instant;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::optim::sgd::Sgd;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the mean training
/// loss of the **last completed epoch**.
///
/// `rng` drives the per-epoch shuffle, so a seeded generator makes a run
/// reproducible.
///
/// # Errors
/// `Error::Dataset` if the inputs are empty, inputs and labels differ in
/// length, a sample does not match the network's input or output width, or
/// `batch_size == 0`.
pub fn train_loop<R: Rng + ?Sized>(
    network: &mut Network,
    train_inputs: &[Vec<f64>],
    train_labels: &[Vec<f64>],
    optimizer: &Sgd,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<f64> {
    check_dataset(network, train_inputs, train_labels)?;
    if config.batch_size == 0 {
        return Err(Error::Dataset("batch_size must be at least 1".into()));
    }

    let mut last_train_loss = 0.0;

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        let train_loss = run_one_epoch(
            network,
            train_inputs,
            train_labels,
            optimizer,
            config,
            &mut *rng,
        );
        last_train_loss = train_loss;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        debug!(?stats, "epoch finished");

        let milestone = config.log_every > 0 && epoch % config.log_every == 0;
        if milestone || epoch == config.epochs {
            info!(epoch, total = config.epochs, loss = train_loss, "training progress");
        }
    }

    Ok(last_train_loss)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn check_dataset(network: &Network, inputs: &[Vec<f64>], labels: &[Vec<f64>]) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::Dataset("train_inputs must not be empty".into()));
    }
    if inputs.len() != labels.len() {
        return Err(Error::Dataset(format!(
            "{} inputs but {} labels",
            inputs.len(),
            labels.len()
        )));
    }
    let (n_in, n_out) = (network.input_size(), network.output_size());
    if let Some((i, x)) = inputs.iter().enumerate().find(|(_, x)| x.len() != n_in) {
        return Err(Error::Dataset(format!(
            "sample {i} has {} features, network expects {n_in}",
            x.len()
        )));
    }
    if let Some((i, y)) = labels.iter().enumerate().find(|(_, y)| y.len() != n_out) {
        return Err(Error::Dataset(format!(
            "label {i} has {} values, network produces {n_out}",
            y.len()
        )));
    }
    Ok(())
}

/// Runs one full epoch of mini-batch SGD over the training data.
/// Returns the mean loss over all samples.
fn run_one_epoch<R: Rng + ?Sized>(
    network: &mut Network,
    inputs: &[Vec<f64>],
    labels: &[Vec<f64>],
    optimizer: &Sgd,
    config: &TrainConfig,
    rng: &mut R,
) -> f64 {
    let n = inputs.len();
    let mut total_loss = 0.0;

    let mut indices: Vec<usize> = (0..n).collect();
    if config.shuffle {
        indices.shuffle(rng);
    }

    for batch in indices.chunks(config.batch_size) {
        let mut acc_grads: Vec<(Matrix, Matrix)> = network.layers.iter()
            .map(|layer| (
                Matrix::zeros(layer.weights.rows, layer.weights.cols),
                Matrix::zeros(layer.biases.rows, layer.biases.cols),
            ))
            .collect();

        for &idx in batch {
            total_loss += accumulate_sample(
                network,
                &inputs[idx],
                &labels[idx],
                config.loss_type,
                &mut acc_grads,
            );
        }

        let inv_batch = 1.0 / batch.len() as f64;
        for (layer, (w_acc, b_acc)) in network.layers.iter_mut().zip(acc_grads) {
            optimizer.step(layer, &w_acc.scale(inv_batch), &b_acc.scale(inv_batch));
        }
    }

    total_loss / n as f64
}

/// Forward + backward pass for one sample; adds its gradients into `acc_grads`
/// and returns its loss.
fn accumulate_sample(
    network: &mut Network,
    input: &[f64],
    expected: &[f64],
    loss_type: LossType,
    acc_grads: &mut [(Matrix, Matrix)],
) -> f64 {
    let output = network.forward(input);
    let loss = loss_type.loss(&output, expected);

    let mut delta = Matrix::row_vector(&loss_type.derivative(&output, expected));

    for i in (0..network.layers.len()).rev() {
        let input_for_layer = if i == 0 {
            Matrix::row_vector(input)
        } else {
            network.layers[i - 1].neurons.clone()
        };

        let (w_grad, b_grad) = network.layers[i].compute_gradients(&delta, &input_for_layer);

        if i > 0 {
            // Propagate δ_i through the weights to get ∂L/∂a_{i-1}.
            delta = &b_grad * &network.layers[i].weights.transpose();
        }

        let (w_acc, b_acc) = &mut acc_grads[i];
        *w_acc = w_acc.clone() + w_grad;
        *b_acc = b_acc.clone() + b_grad;
    }

    loss
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::activation::ActivationFunction;
    use crate::network::spec::{LayerSpec, NetworkSpec};
    use rand::{rngs::StdRng, SeedableRng};

    fn tiny_network(rng: &mut StdRng) -> Network {
        let spec = NetworkSpec {
            name: "tiny".into(),
            layers: vec![LayerSpec::new(1, 2, ActivationFunction::Sigmoid)],
            loss: LossType::BinaryCrossEntropy,
        };
        Network::from_spec(&spec, rng)
    }

    #[test]
    fn learns_linearly_separable_or() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut net = tiny_network(&mut rng);
        let inputs = vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let labels = vec![vec![0.0], vec![1.0], vec![1.0], vec![1.0]];
        let config = TrainConfig::new(300, 1, LossType::BinaryCrossEntropy);

        let first = train_loop(&mut net, &inputs, &labels, &Sgd::new(0.5), &TrainConfig {
            epochs: 1,
            ..config.clone()
        }, &mut rng).unwrap();
        let last = train_loop(&mut net, &inputs, &labels, &Sgd::new(0.5), &config, &mut rng).unwrap();

        assert!(last < first);
        assert!(net.predict(&[0.0, 0.0])[0] < 0.5);
        assert!(net.predict(&[1.0, 1.0])[0] > 0.5);
    }

    #[test]
    fn full_batch_without_shuffle_is_deterministic() {
        let inputs = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let labels = vec![vec![1.0], vec![0.0]];
        let config = TrainConfig {
            shuffle: false,
            ..TrainConfig::new(10, 2, LossType::Mse)
        };

        let mut a = tiny_network(&mut StdRng::seed_from_u64(8));
        let mut b = a.clone();
        let la = train_loop(&mut a, &inputs, &labels, &Sgd::new(0.1), &config, &mut StdRng::seed_from_u64(1)).unwrap();
        let lb = train_loop(&mut b, &inputs, &labels, &Sgd::new(0.1), &config, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(la, lb);
        assert_eq!(a.layers[0].weights, b.layers[0].weights);
    }

    #[test]
    fn rejects_bad_datasets() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut net = tiny_network(&mut rng);
        let sgd = Sgd::new(0.1);
        let config = TrainConfig::new(1, 1, LossType::Mse);

        let empty: Vec<Vec<f64>> = vec![];
        assert!(matches!(
            train_loop(&mut net, &empty, &empty, &sgd, &config, &mut rng),
            Err(Error::Dataset(_))
        ));

        let inputs = vec![vec![0.0, 1.0]];
        assert!(matches!(
            train_loop(&mut net, &inputs, &[], &sgd, &config, &mut rng),
            Err(Error::Dataset(_))
        ));

        let wide = vec![vec![0.0, 1.0, 2.0]];
        assert!(matches!(
            train_loop(&mut net, &wide, &[vec![1.0]], &sgd, &config, &mut rng),
            Err(Error::Dataset(_))
        ));

        let zero_batch = TrainConfig::new(1, 0, LossType::Mse);
        assert!(matches!(
            train_loop(&mut net, &inputs, &[vec![1.0]], &sgd, &zero_batch, &mut rng),
            Err(Error::Dataset(_))
        ));
    }
}
