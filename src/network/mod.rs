pub mod network;
pub mod spec;

pub use network::{Network, MODEL_FORMAT, MODEL_VERSION};
pub use spec::{NetworkSpec, LayerSpec};
