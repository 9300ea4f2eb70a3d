pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod lite;
pub mod xor;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::{Network, NetworkSpec, LayerSpec};
pub use loss::LossType;
pub use optim::sgd::Sgd;
pub use train::{train_loop, TrainConfig, EpochStats};
pub use lite::{Converter, Interpreter, LiteModel};
