use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully-connected layer followed by an element-wise activation.
///
/// `weights` is `input_size × size` so a `1 × input_size` row vector maps to
/// a `1 × size` row vector. The cached forward values are not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub size: usize,
    pub input_size: usize,
    pub activator: ActivationFunction,
    pub weights: Matrix,
    pub biases: Matrix,
    #[serde(skip)]
    pub neurons: Matrix,
    #[serde(skip)]
    pre_neurons: Matrix, // z = xW + b, needed for the activation derivative
}

impl Layer {
    /// Glorot-uniform weights, zero biases.
    pub fn new<R: Rng + ?Sized>(
        size: usize,
        input_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        Layer {
            size,
            input_size,
            activator: activation,
            weights: Matrix::glorot_uniform(input_size, size, rng),
            biases: Matrix::zeros(1, size),
            neurons: Matrix::zeros(1, size),
            pre_neurons: Matrix::zeros(1, size),
        }
    }

    /// Forward pass that caches z and a(z) for a following backward pass.
    pub fn feed_from(&mut self, input: &Matrix) -> Matrix {
        let z = self.linear(input);
        let a = z.map(|x| self.activator.function(x));
        self.pre_neurons = z;
        self.neurons = a.clone();
        a
    }

    /// Forward pass without touching the cache.
    pub fn predict(&self, input: &Matrix) -> Matrix {
        self.linear(input).map(|x| self.activator.function(x))
    }

    fn linear(&self, input: &Matrix) -> Matrix {
        input * &self.weights + self.biases.clone()
    }

    /// Computes `(weights_grad, biases_grad)` from ∂L/∂a of this layer.
    ///
    /// `biases_grad` equals δ = ∂L/∂z, which the caller also uses to
    /// propagate the error to the previous layer.
    pub fn compute_gradients(&self, next_layer_delta: &Matrix, inputs: &Matrix) -> (Matrix, Matrix) {
        let act_derivative = self.pre_neurons.map(|x| self.activator.derivative(x));
        let layer_delta = next_layer_delta.hadamard(&act_derivative);
        let weights_grad = &inputs.transpose() * &layer_delta;
        (weights_grad, layer_delta)
    }

    pub fn apply_gradients(&mut self, weights_grad: &Matrix, biases_grad: &Matrix, lr: f64) {
        self.weights = self.weights.clone() - weights_grad.scale(lr);
        self.biases = self.biases.clone() - biases_grad.scale(lr);
    }
}
