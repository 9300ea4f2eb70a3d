//! `.xlite` inference format: a single-file container for a converted model.
//!
//! Layout:
//! ```text
//! ┌──────────────────────────────────┐
//! │ Magic: "XLIT" (4 bytes)          │
//! │ Version: u32 LE                  │
//! │ Header size: u32 LE              │
//! ├──────────────────────────────────┤
//! │ Header JSON (tensors, ops, io)   │
//! ├──────────────────────────────────┤
//! │ Padding to 64-byte alignment     │
//! ├──────────────────────────────────┤
//! │ Weight blob (f32 LE tensors)     │
//! └──────────────────────────────────┘
//! ```
//!
//! Tensors and ops are kept in `Vec`s, so the same model always serializes to
//! the same bytes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Magic bytes identifying an .xlite file.
pub const MAGIC: &[u8; 4] = b"XLIT";

/// Current format version.
pub const VERSION: u32 = 1;

/// Alignment for the weight blob and for every tensor inside it.
const BLOB_ALIGNMENT: usize = 64;

/// Magic + version + header size.
const PREAMBLE_LEN: usize = 12;

/// Errors from .xlite parsing and validation.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("file too small for .xlite format")]
    TooSmall,
    #[error("invalid magic bytes (expected XLIT)")]
    BadMagic,
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    #[error("tensor {0} lies outside the weight blob")]
    TensorOutOfRange(String),
    #[error("missing tensor: {0}")]
    MissingTensor(String),
}

/// Element type of a stored tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float32,
}

impl DType {
    pub fn type_name(&self) -> &'static str {
        match self {
            DType::Float32 => "float32",
        }
    }

    pub fn size_of(&self) -> usize {
        match self {
            DType::Float32 => 4,
        }
    }
}

/// Index entry for a single tensor in the weight blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorEntry {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub offset: usize,
    pub nbytes: usize,
}

impl TensorEntry {
    /// Element count, `None` if the shape overflows `usize`.
    pub fn numel(&self) -> Option<usize> {
        checked_numel(&self.shape)
    }
}

/// Name, type and shape of a graph input or output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorInfo {
    pub name: String,
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl TensorInfo {
    /// Element count, `None` if the shape overflows `usize`.
    pub fn numel(&self) -> Option<usize> {
        checked_numel(&self.shape)
    }

    pub fn byte_size(&self) -> Option<usize> {
        self.numel()?.checked_mul(self.dtype.size_of())
    }
}

fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// A single operation; ops run in order on one activation buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OpNode {
    /// `y = x · W + b` with `W` stored `[in_features, out_features]` row-major.
    FullyConnected {
        weights: String,
        bias: String,
        in_features: usize,
        out_features: usize,
    },
    Tanh,
    Logistic,
    Relu,
}

/// Header metadata for an .xlite model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteHeader {
    pub producer: String,
    pub tensors: Vec<TensorEntry>,
    pub ops: Vec<OpNode>,
    pub inputs: Vec<TensorInfo>,
    pub outputs: Vec<TensorInfo>,
}

/// A loaded .xlite model: header + weight blob.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteModel {
    pub header: LiteHeader,
    pub weights: Vec<u8>,
}

impl LiteModel {
    /// Parses and validates .xlite bytes.
    pub fn from_bytes(data: &[u8]) -> std::result::Result<Self, FormatError> {
        if data.len() < PREAMBLE_LEN {
            return Err(FormatError::TooSmall);
        }
        if &data[0..4] != MAGIC {
            return Err(FormatError::BadMagic);
        }

        let version = read_u32(data, 4);
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let header_size = read_u32(data, 8) as usize;
        let header_end = PREAMBLE_LEN + header_size;
        if data.len() < header_end {
            return Err(FormatError::TooSmall);
        }

        let header: LiteHeader = serde_json::from_slice(&data[PREAMBLE_LEN..header_end])
            .map_err(|e| FormatError::InvalidHeader(e.to_string()))?;

        let blob_start = align_up(header_end, BLOB_ALIGNMENT);
        if data.len() < blob_start {
            return Err(FormatError::TooSmall);
        }

        let model = LiteModel { header, weights: data[blob_start..].to_vec() };
        model.validate()?;
        Ok(model)
    }

    /// Reads and parses an .xlite file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(LiteModel::from_bytes(&data)?)
    }

    /// Serializes this model to .xlite bytes.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, FormatError> {
        let header_bytes = serde_json::to_vec(&self.header)
            .map_err(|e| FormatError::InvalidHeader(e.to_string()))?;
        let header_size = u32::try_from(header_bytes.len())
            .map_err(|_| FormatError::InvalidHeader("header exceeds 4 GiB".into()))?;

        let header_end = PREAMBLE_LEN + header_bytes.len();
        let blob_start = align_up(header_end, BLOB_ALIGNMENT);

        let mut buf = Vec::with_capacity(blob_start + self.weights.len());
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&VERSION.to_le_bytes());
        buf.extend_from_slice(&header_size.to_le_bytes());
        buf.extend_from_slice(&header_bytes);
        buf.resize(blob_start, 0);
        buf.extend_from_slice(&self.weights);
        Ok(buf)
    }

    pub fn tensor(&self, name: &str) -> Option<&TensorEntry> {
        self.header.tensors.iter().find(|t| t.name == name)
    }

    /// Decodes a named f32 tensor from the blob.
    pub fn tensor_f32(&self, name: &str) -> std::result::Result<Vec<f32>, FormatError> {
        let entry = self.tensor(name)
            .ok_or_else(|| FormatError::MissingTensor(name.to_string()))?;
        let bytes = self.weights.get(entry.offset..entry.offset + entry.nbytes)
            .ok_or_else(|| FormatError::TensorOutOfRange(name.to_string()))?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Checks tensor ranges, that every op references tensors of the right
    /// shape, and that the single input and output match the first and last
    /// `FullyConnected` op.
    pub fn validate(&self) -> std::result::Result<(), FormatError> {
        for t in &self.header.tensors {
            let expected = t.numel()
                .and_then(|n| n.checked_mul(t.dtype.size_of()))
                .ok_or_else(|| FormatError::InvalidHeader(format!(
                    "tensor {} has an oversized shape {:?}",
                    t.name, t.shape
                )))?;
            if t.nbytes != expected {
                return Err(FormatError::InvalidHeader(format!(
                    "tensor {} declares {} bytes for shape {:?}",
                    t.name, t.nbytes, t.shape
                )));
            }
            let end = t.offset.checked_add(t.nbytes)
                .ok_or_else(|| FormatError::TensorOutOfRange(t.name.clone()))?;
            if end > self.weights.len() {
                return Err(FormatError::TensorOutOfRange(t.name.clone()));
            }
        }

        for op in &self.header.ops {
            if let OpNode::FullyConnected { weights, bias, in_features, out_features } = op {
                self.expect_shape(weights, &[*in_features, *out_features])?;
                self.expect_shape(bias, &[*out_features])?;
            }
        }

        let [input] = self.header.inputs.as_slice() else {
            return Err(FormatError::InvalidHeader(format!(
                "expected exactly one input, found {}",
                self.header.inputs.len()
            )));
        };
        let [output] = self.header.outputs.as_slice() else {
            return Err(FormatError::InvalidHeader(format!(
                "expected exactly one output, found {}",
                self.header.outputs.len()
            )));
        };

        let mut widths = self.header.ops.iter().filter_map(|op| match op {
            OpNode::FullyConnected { in_features, out_features, .. } => Some((*in_features, *out_features)),
            _ => None,
        });
        let (first_in, mut last_out) = widths.next()
            .ok_or_else(|| FormatError::InvalidHeader("model has no fully_connected op".into()))?;
        if let Some((_, out)) = widths.last() {
            last_out = out;
        }
        expect_io_width(input, first_in)?;
        expect_io_width(output, last_out)?;
        Ok(())
    }

    fn expect_shape(&self, name: &str, shape: &[usize]) -> std::result::Result<(), FormatError> {
        let entry = self.tensor(name)
            .ok_or_else(|| FormatError::MissingTensor(name.to_string()))?;
        if entry.shape != shape {
            return Err(FormatError::InvalidHeader(format!(
                "tensor {} has shape {:?}, op expects {:?}",
                name, entry.shape, shape
            )));
        }
        Ok(())
    }
}

fn expect_io_width(info: &TensorInfo, width: usize) -> std::result::Result<(), FormatError> {
    match info.numel() {
        Some(n) if n == width => Ok(()),
        _ => Err(FormatError::InvalidHeader(format!(
            "{} has shape {:?}, graph expects {} values",
            info.name, info.shape, width
        ))),
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Round `n` up to the next multiple of `align`.
fn align_up(n: usize, align: usize) -> usize {
    (n + align - 1) & !(align - 1)
}

/// Builder for assembling an .xlite model tensor by tensor.
pub struct LiteBuilder {
    header: LiteHeader,
    weight_buf: Vec<u8>,
}

impl LiteBuilder {
    pub fn new(producer: &str) -> Self {
        Self {
            header: LiteHeader {
                producer: producer.to_string(),
                tensors: Vec::new(),
                ops: Vec::new(),
                inputs: Vec::new(),
                outputs: Vec::new(),
            },
            weight_buf: Vec::new(),
        }
    }

    /// Appends an f32 tensor, 64-byte aligned within the blob.
    pub fn add_f32(&mut self, name: &str, shape: &[usize], data: &[f32]) {
        self.weight_buf.resize(align_up(self.weight_buf.len(), BLOB_ALIGNMENT), 0);
        let offset = self.weight_buf.len();
        for v in data {
            self.weight_buf.extend_from_slice(&v.to_le_bytes());
        }
        self.header.tensors.push(TensorEntry {
            name: name.to_string(),
            dtype: DType::Float32,
            shape: shape.to_vec(),
            offset,
            nbytes: data.len() * DType::Float32.size_of(),
        });
    }

    pub fn add_op(&mut self, op: OpNode) {
        self.header.ops.push(op);
    }

    pub fn add_input(&mut self, name: &str, shape: &[usize]) {
        self.header.inputs.push(TensorInfo {
            name: name.to_string(),
            dtype: DType::Float32,
            shape: shape.to_vec(),
        });
    }

    pub fn add_output(&mut self, name: &str, shape: &[usize]) {
        self.header.outputs.push(TensorInfo {
            name: name.to_string(),
            dtype: DType::Float32,
            shape: shape.to_vec(),
        });
    }

    pub fn build(self) -> LiteModel {
        LiteModel { header: self.header, weights: self.weight_buf }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> LiteModel {
        let mut builder = LiteBuilder::new("test");
        builder.add_f32("fc/kernel", &[2, 1], &[0.5, -1.5]);
        builder.add_f32("fc/bias", &[1], &[0.25]);
        builder.add_op(OpNode::FullyConnected {
            weights: "fc/kernel".into(),
            bias: "fc/bias".into(),
            in_features: 2,
            out_features: 1,
        });
        builder.add_op(OpNode::Logistic);
        builder.add_input("input", &[1, 2]);
        builder.add_output("output", &[1, 1]);
        builder.build()
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 64), 0);
        assert_eq!(align_up(1, 64), 64);
        assert_eq!(align_up(64, 64), 64);
        assert_eq!(align_up(65, 64), 128);
    }

    #[test]
    fn test_roundtrip() {
        let model = sample_model();
        let bytes = model.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!((bytes.len() - model.weights.len()) % BLOB_ALIGNMENT, 0);

        let loaded = LiteModel::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.tensor_f32("fc/kernel").unwrap(), vec![0.5, -1.5]);
        assert_eq!(loaded.tensor("fc/bias").unwrap().offset % BLOB_ALIGNMENT, 0);
    }

    #[test]
    fn test_bad_magic() {
        let data = b"BADXxxxxxxxx";
        assert!(matches!(LiteModel::from_bytes(data), Err(FormatError::BadMagic)));
    }

    #[test]
    fn test_too_small() {
        assert!(matches!(LiteModel::from_bytes(b"XLIT"), Err(FormatError::TooSmall)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = sample_model().to_bytes().unwrap();
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(LiteModel::from_bytes(&bytes), Err(FormatError::UnsupportedVersion(7))));
    }

    #[test]
    fn test_truncated_blob() {
        let bytes = sample_model().to_bytes().unwrap();
        let cut = &bytes[..bytes.len() - 4];
        assert!(matches!(LiteModel::from_bytes(cut), Err(FormatError::TensorOutOfRange(_))));
    }

    #[test]
    fn test_overflowing_tensor_shape() {
        let mut model = sample_model();
        model.header.tensors.push(TensorEntry {
            name: "huge".into(),
            dtype: DType::Float32,
            shape: vec![usize::MAX, 4],
            offset: 0,
            nbytes: 0,
        });
        let bytes = model.to_bytes().unwrap();
        assert!(matches!(LiteModel::from_bytes(&bytes), Err(FormatError::InvalidHeader(_))));
    }

    #[test]
    fn test_byte_size_overflow_is_rejected() {
        // numel fits in usize but numel * 4 does not.
        let mut model = sample_model();
        model.header.tensors.push(TensorEntry {
            name: "wide".into(),
            dtype: DType::Float32,
            shape: vec![usize::MAX / 2],
            offset: 0,
            nbytes: 0,
        });
        let bytes = model.to_bytes().unwrap();
        assert!(matches!(LiteModel::from_bytes(&bytes), Err(FormatError::InvalidHeader(_))));
    }

    #[test]
    fn test_input_wider_than_first_layer() {
        let mut model = sample_model();
        model.header.inputs[0].shape = vec![1_099_511_627_776];
        let bytes = model.to_bytes().unwrap();
        assert!(matches!(LiteModel::from_bytes(&bytes), Err(FormatError::InvalidHeader(_))));
    }

    #[test]
    fn test_output_mismatching_last_layer() {
        let mut model = sample_model();
        model.header.outputs[0].shape = vec![1, 3];
        let bytes = model.to_bytes().unwrap();
        assert!(matches!(LiteModel::from_bytes(&bytes), Err(FormatError::InvalidHeader(_))));
    }

    #[test]
    fn test_model_without_fully_connected() {
        let mut model = sample_model();
        model.header.ops = vec![OpNode::Logistic];
        model.header.outputs[0].shape = vec![1, 2];
        let bytes = model.to_bytes().unwrap();
        assert!(matches!(LiteModel::from_bytes(&bytes), Err(FormatError::InvalidHeader(_))));
    }

    #[test]
    fn test_multiple_inputs_rejected() {
        let mut model = sample_model();
        model.header.inputs.push(model.header.inputs[0].clone());
        let bytes = model.to_bytes().unwrap();
        assert!(matches!(LiteModel::from_bytes(&bytes), Err(FormatError::InvalidHeader(_))));

        let mut model = sample_model();
        model.header.outputs.push(model.header.outputs[0].clone());
        assert!(matches!(model.validate(), Err(FormatError::InvalidHeader(_))));
    }

    #[test]
    fn test_tensor_info_byte_size() {
        let model = sample_model();
        assert_eq!(model.header.inputs[0].byte_size(), Some(8));
        let huge = TensorInfo {
            name: "x".into(),
            dtype: DType::Float32,
            shape: vec![usize::MAX, 2],
        };
        assert_eq!(huge.numel(), None);
        assert_eq!(huge.byte_size(), None);
    }

    #[test]
    fn test_op_referencing_missing_tensor() {
        let mut model = sample_model();
        model.header.ops[0] = OpNode::FullyConnected {
            weights: "nope".into(),
            bias: "fc/bias".into(),
            in_features: 2,
            out_features: 1,
        };
        let bytes = model.to_bytes().unwrap();
        assert!(matches!(LiteModel::from_bytes(&bytes), Err(FormatError::MissingTensor(_))));
    }
}
