//! Operator kernels on raw f32 slices.

/// `out = x · W + b` for a single row `x` of length `in_features`.
/// `weights` is `[in_features, out_features]` row-major.
pub fn fully_connected(x: &[f32], weights: &[f32], bias: &[f32], out: &mut [f32]) {
    let out_features = bias.len();
    out.copy_from_slice(bias);
    for (i, &xi) in x.iter().enumerate() {
        let row = &weights[i * out_features..(i + 1) * out_features];
        for (o, &w) in out.iter_mut().zip(row) {
            *o += xi * w;
        }
    }
}

pub fn tanh(data: &mut [f32]) {
    for v in data.iter_mut() {
        *v = v.tanh();
    }
}

/// Logistic (sigmoid): x = 1 / (1 + exp(-x))
pub fn logistic(data: &mut [f32]) {
    for v in data.iter_mut() {
        *v = 1.0 / (1.0 + (-*v).exp());
    }
}

pub fn relu(data: &mut [f32]) {
    for v in data.iter_mut() {
        *v = v.max(0.0);
    }
}
