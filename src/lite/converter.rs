use std::path::Path;

use tracing::{debug, info};

use crate::activation::activation::ActivationFunction;
use crate::error::Result;
use crate::lite::format::{LiteBuilder, LiteModel, OpNode};
use crate::network::network::Network;

const PRODUCER: &str = concat!("xor-lite ", env!("CARGO_PKG_VERSION"));

/// Turns a trained `Network` into the .xlite inference format.
///
/// Each dense layer becomes a `FullyConnected` op followed by the op for its
/// activation; `Identity` emits nothing. Weights are narrowed to f32.
pub struct Converter {
    network: Network,
}

impl Converter {
    pub fn from_network(network: Network) -> Self {
        Converter { network }
    }

    /// Loads and validates a model file written by `Network::save`.
    pub fn from_model_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let network = Network::load(path)?;
        debug!(path = %path.display(), layers = network.layers.len(), "loaded model for conversion");
        Ok(Converter { network })
    }

    pub fn to_lite_model(&self) -> LiteModel {
        let mut builder = LiteBuilder::new(PRODUCER);

        for (i, layer) in self.network.layers.iter().enumerate() {
            let kernel_name = format!("dense_{i}/kernel");
            let bias_name = format!("dense_{i}/bias");

            builder.add_f32(&kernel_name, &[layer.input_size, layer.size], &narrow(&layer.weights.flatten()));
            builder.add_f32(&bias_name, &[layer.size], &narrow(&layer.biases.flatten()));
            builder.add_op(OpNode::FullyConnected {
                weights: kernel_name,
                bias: bias_name,
                in_features: layer.input_size,
                out_features: layer.size,
            });

            match layer.activator {
                ActivationFunction::Tanh => builder.add_op(OpNode::Tanh),
                ActivationFunction::Sigmoid => builder.add_op(OpNode::Logistic),
                ActivationFunction::ReLU => builder.add_op(OpNode::Relu),
                ActivationFunction::Identity => {}
            }
        }

        builder.add_input("input", &[1, self.network.input_size()]);
        builder.add_output("output", &[1, self.network.output_size()]);
        builder.build()
    }

    /// Produces the .xlite file contents.
    pub fn convert(&self) -> Result<Vec<u8>> {
        let model = self.to_lite_model();
        let bytes = model.to_bytes()?;
        info!(
            ops = model.header.ops.len(),
            tensors = model.header.tensors.len(),
            bytes = bytes.len(),
            "converted model"
        );
        Ok(bytes)
    }
}

fn narrow(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}
