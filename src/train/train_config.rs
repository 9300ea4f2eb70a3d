use crate::loss::loss_type::LossType;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`     — total number of full passes over the training data
/// - `batch_size` — samples per mini-batch; use `1` for online SGD
/// - `loss_type`  — which loss function to use
/// - `shuffle`    — reshuffle sample order at the start of every epoch
/// - `log_every`  — emit an `info` progress line every this many epochs
///                  (`0` keeps per-epoch stats at `debug` only)
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub loss_type: LossType,
    pub shuffle: bool,
    pub log_every: usize,
}

impl TrainConfig {
    /// Shuffled training with `info` progress every 100 epochs.
    pub fn new(epochs: usize, batch_size: usize, loss_type: LossType) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            loss_type,
            shuffle: true,
            log_every: 100,
        }
    }
}
