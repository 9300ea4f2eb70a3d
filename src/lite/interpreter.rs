//! Runs a converted .xlite model.
//!
//! Usage mirrors a mobile interpreter: build it from a model, allocate
//! tensors, write the input, invoke, read the output.

use crate::error::{Error, Result};
use crate::lite::format::{LiteModel, OpNode, TensorInfo};
use crate::lite::ops;

/// Decoded operator, weights already unpacked from the blob.
enum Kernel {
    FullyConnected { weights: Vec<f32>, bias: Vec<f32> },
    Tanh,
    Logistic,
    Relu,
}

pub struct Interpreter {
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
    kernels: Vec<Kernel>,
    input_width: usize,
    output_width: usize,
    input: Vec<f32>,
    output: Vec<f32>,
    allocated: bool,
}

impl Interpreter {
    /// Validates `model`, decodes every op, and checks that the layer widths
    /// chain from the declared input to the declared output.
    pub fn new(model: LiteModel) -> Result<Self> {
        model.validate()?;
        let inputs = model.header.inputs.clone();
        let outputs = model.header.outputs.clone();
        let (input_width, output_width) = match (inputs[0].numel(), outputs[0].numel()) {
            (Some(i), Some(o)) => (i, o),
            _ => return Err(Error::Interpreter("input or output shape overflows".into())),
        };

        let mut width = input_width;
        let mut kernels = Vec::with_capacity(model.header.ops.len());
        for op in &model.header.ops {
            let kernel = match op {
                OpNode::FullyConnected { weights, bias, in_features, out_features } => {
                    if *in_features != width {
                        return Err(Error::Shape { expected: width, found: *in_features });
                    }
                    width = *out_features;
                    Kernel::FullyConnected {
                        weights: model.tensor_f32(weights)?,
                        bias: model.tensor_f32(bias)?,
                    }
                }
                OpNode::Tanh => Kernel::Tanh,
                OpNode::Logistic => Kernel::Logistic,
                OpNode::Relu => Kernel::Relu,
            };
            kernels.push(kernel);
        }
        if width != output_width {
            return Err(Error::Shape { expected: output_width, found: width });
        }

        Ok(Self {
            inputs,
            outputs,
            kernels,
            input_width,
            output_width,
            input: Vec::new(),
            output: Vec::new(),
            allocated: false,
        })
    }

    /// Sizes the input and output buffers. Must run before `set_input`.
    pub fn allocate_tensors(&mut self) {
        self.input = vec![0.0; self.input_width];
        self.output = vec![0.0; self.output_width];
        self.allocated = true;
    }

    pub fn input_tensor_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_tensor_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn input_tensor(&self, index: usize) -> Result<&TensorInfo> {
        self.inputs.get(index)
            .ok_or_else(|| Error::Interpreter(format!("no input tensor at index {index}")))
    }

    pub fn output_tensor(&self, index: usize) -> Result<&TensorInfo> {
        self.outputs.get(index)
            .ok_or_else(|| Error::Interpreter(format!("no output tensor at index {index}")))
    }

    pub fn set_input(&mut self, data: &[f32]) -> Result<()> {
        self.ensure_allocated()?;
        if data.len() != self.input.len() {
            return Err(Error::Shape { expected: self.input.len(), found: data.len() });
        }
        self.input.copy_from_slice(data);
        Ok(())
    }

    /// Runs every op in order over the current input.
    pub fn invoke(&mut self) -> Result<()> {
        self.ensure_allocated()?;
        let mut current = self.input.clone();
        for kernel in &self.kernels {
            match kernel {
                Kernel::FullyConnected { weights, bias } => {
                    let mut next = vec![0.0; bias.len()];
                    ops::fully_connected(&current, weights, bias, &mut next);
                    current = next;
                }
                Kernel::Tanh => ops::tanh(&mut current),
                Kernel::Logistic => ops::logistic(&mut current),
                Kernel::Relu => ops::relu(&mut current),
            }
        }
        self.output.copy_from_slice(&current);
        Ok(())
    }

    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// `set_input` + `invoke`, allocating on first use.
    pub fn predict(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if !self.allocated {
            self.allocate_tensors();
        }
        self.set_input(input)?;
        self.invoke()?;
        Ok(self.output.clone())
    }

    fn ensure_allocated(&self) -> Result<()> {
        if self.allocated {
            Ok(())
        } else {
            Err(Error::Interpreter("allocate_tensors must be called first".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lite::format::{FormatError, LiteBuilder};

    /// y = relu(x0 - x1)
    fn difference_model() -> LiteModel {
        let mut b = LiteBuilder::new("test");
        b.add_f32("w", &[2, 1], &[1.0, -1.0]);
        b.add_f32("b", &[1], &[0.0]);
        b.add_op(OpNode::FullyConnected {
            weights: "w".into(),
            bias: "b".into(),
            in_features: 2,
            out_features: 1,
        });
        b.add_op(OpNode::Relu);
        b.add_input("input", &[1, 2]);
        b.add_output("output", &[1, 1]);
        b.build()
    }

    #[test]
    fn runs_ops_in_order() {
        let mut interp = Interpreter::new(difference_model()).unwrap();
        interp.allocate_tensors();
        interp.set_input(&[3.0, 1.0]).unwrap();
        interp.invoke().unwrap();
        assert_eq!(interp.output(), &[2.0]);
        assert_eq!(interp.predict(&[1.0, 3.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn exposes_tensor_info() {
        let interp = Interpreter::new(difference_model()).unwrap();
        assert_eq!(interp.input_tensor_count(), 1);
        assert_eq!(interp.output_tensor_count(), 1);
        let input = interp.input_tensor(0).unwrap();
        assert_eq!(input.shape, vec![1, 2]);
        assert_eq!(input.dtype.type_name(), "float32");
        assert!(interp.output_tensor(1).is_err());
    }

    #[test]
    fn rejects_use_before_allocation() {
        let mut interp = Interpreter::new(difference_model()).unwrap();
        assert!(matches!(interp.set_input(&[1.0, 2.0]), Err(Error::Interpreter(_))));
        assert!(matches!(interp.invoke(), Err(Error::Interpreter(_))));
    }

    #[test]
    fn rejects_wrong_input_length() {
        let mut interp = Interpreter::new(difference_model()).unwrap();
        interp.allocate_tensors();
        assert!(matches!(
            interp.set_input(&[1.0, 2.0, 3.0]),
            Err(Error::Shape { expected: 2, found: 3 })
        ));
    }

    #[test]
    fn rejects_mismatched_output_width() {
        let mut model = difference_model();
        model.header.outputs[0].shape = vec![1, 4];
        assert!(matches!(
            Interpreter::new(model),
            Err(Error::Format(FormatError::InvalidHeader(_)))
        ));
    }

    #[test]
    fn rejects_oversized_input_before_allocating() {
        let mut model = difference_model();
        model.header.inputs[0].shape = vec![1_099_511_627_776];
        assert!(matches!(
            Interpreter::new(model),
            Err(Error::Format(FormatError::InvalidHeader(_)))
        ));
    }

    #[test]
    fn rejects_broken_layer_chain() {
        let mut b = LiteBuilder::new("test");
        b.add_f32("w0", &[2, 3], &[0.0; 6]);
        b.add_f32("b0", &[3], &[0.0; 3]);
        b.add_f32("w1", &[2, 1], &[0.0; 2]);
        b.add_f32("b1", &[1], &[0.0]);
        b.add_op(OpNode::FullyConnected {
            weights: "w0".into(),
            bias: "b0".into(),
            in_features: 2,
            out_features: 3,
        });
        b.add_op(OpNode::FullyConnected {
            weights: "w1".into(),
            bias: "b1".into(),
            in_features: 2,
            out_features: 1,
        });
        b.add_input("input", &[1, 2]);
        b.add_output("output", &[1, 1]);
        assert!(matches!(
            Interpreter::new(b.build()),
            Err(Error::Shape { expected: 3, found: 2 })
        ));
    }
}
