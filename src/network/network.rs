use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::layers::dense::Layer;
use crate::loss::loss_type::LossType;
use crate::math::matrix::Matrix;
use crate::network::spec::NetworkSpec;

/// Value of the `format` field in every model file this crate writes.
pub const MODEL_FORMAT: &str = "xor-lite-model";
/// Current model file version; loading any other version fails.
pub const MODEL_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct Network {
    pub layers: Vec<Layer>,
    pub loss: LossType,
}

#[derive(Serialize)]
struct ModelFileRef<'a> {
    format: &'a str,
    version: u32,
    loss: LossType,
    layers: &'a [Layer],
}

#[derive(Deserialize)]
struct ModelFile {
    format: String,
    version: u32,
    loss: LossType,
    layers: Vec<Layer>,
}

impl Network {
    /// Builds a freshly initialized network from an architecture description.
    pub fn from_spec<R: Rng + ?Sized>(spec: &NetworkSpec, rng: &mut R) -> Network {
        let layers = spec.layers.iter()
            .map(|l| Layer::new(l.size, l.input_size, l.activation, &mut *rng))
            .collect();
        Network { layers, loss: spec.loss }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.size)
    }

    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: &[f64]) -> Vec<f64> {
        let mut current = Matrix::row_vector(input);
        for layer in &mut self.layers {
            current = layer.feed_from(&current);
        }
        current.flatten()
    }

    /// Inference-only forward pass.
    pub fn predict(&self, input: &[f64]) -> Vec<f64> {
        self.layers.iter()
            .fold(Matrix::row_vector(input), |current, layer| layer.predict(&current))
            .flatten()
    }

    /// `predict` over each row.
    pub fn predict_batch(&self, inputs: &[Vec<f64>]) -> Vec<Vec<f64>> {
        inputs.iter().map(|input| self.predict(input)).collect()
    }

    /// Writes the architecture, loss and weights as a pretty-printed JSON model file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        let mut writer = BufWriter::new(file);
        let doc = ModelFileRef {
            format: MODEL_FORMAT,
            version: MODEL_VERSION,
            loss: self.loss,
            layers: &self.layers,
        };
        serde_json::to_writer_pretty(&mut writer, &doc)?;
        writer.flush().map_err(|e| Error::io(path, e))?;
        info!(path = %path.display(), layers = self.layers.len(), "saved model");
        Ok(())
    }

    /// Loads a model file previously written by `save`.
    pub fn load(path: impl AsRef<Path>) -> Result<Network> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let doc: ModelFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| Error::ModelParse { path: path.to_path_buf(), source })?;

        if doc.format != MODEL_FORMAT || doc.version != MODEL_VERSION {
            return Err(Error::UnsupportedModel { format: doc.format, version: doc.version });
        }

        let network = Network { layers: doc.layers, loss: doc.loss };
        network.validate()?;
        Ok(network)
    }

    /// Checks that every layer's parameter shapes agree with its declared
    /// sizes and that consecutive layers connect.
    pub fn validate(&self) -> Result<()> {
        if self.layers.is_empty() {
            return Err(Error::Shape { expected: 1, found: 0 });
        }
        let mut expected_input = self.input_size();
        for layer in &self.layers {
            if layer.input_size != expected_input {
                return Err(Error::Shape { expected: expected_input, found: layer.input_size });
            }
            check_matrix(&layer.weights, layer.input_size, layer.size)?;
            check_matrix(&layer.biases, 1, layer.size)?;
            expected_input = layer.size;
        }
        Ok(())
    }
}

fn check_matrix(m: &Matrix, rows: usize, cols: usize) -> Result<()> {
    let found = m.data.iter().map(Vec::len).sum::<usize>();
    let consistent = m.rows == rows
        && m.cols == cols
        && m.data.len() == rows
        && m.data.iter().all(|row| row.len() == cols);
    if consistent {
        Ok(())
    } else {
        Err(Error::Shape { expected: rows * cols, found })
    }
}
