//! Scalar math helpers: activation kernels, loss functions, weight initialization.

use crate::core::{NetResult, NetworkError};
use ndarray::{Array1, ArrayView1};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::Rng;

/// Inputs at or beyond this magnitude saturate the logistic function.
pub const SIGMOID_SATURATION: f32 = 45.0;

/// Bound of the weight initialization interval, kept strictly inside (-1, 1).
pub const WEIGHT_INIT_LIMIT: f32 = 0.999_999;

/// Activation function: leaky ReLU.
#[inline]
pub fn leaky_relu(x: f32, negative_slope: f32) -> f32 {
    if x >= 0.0 {
        x
    } else {
        x * negative_slope
    }
}

/// Derivative of leaky ReLU.
#[inline]
pub fn d_leaky_relu(x: f32, negative_slope: f32) -> f32 {
    if x >= 0.0 {
        1.0
    } else {
        negative_slope
    }
}

/// Activation function: ReLU.
#[inline]
pub fn relu(x: f32) -> f32 {
    if x >= 0.0 {
        x
    } else {
        0.0
    }
}

/// Derivative of ReLU.
#[inline]
pub fn d_relu(x: f32) -> f32 {
    if x >= 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Activation function: logistic sigmoid, saturated to exactly 0 / 1 outside (-45, 45).
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    if x <= -SIGMOID_SATURATION {
        0.0
    } else if x >= SIGMOID_SATURATION {
        1.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

/// Derivative of the sigmoid, expressed through its output `y = sigmoid(x)`.
#[inline]
pub fn d_sigmoid(y: f32) -> f32 {
    y * (1.0 - y)
}

/// Activation function: softsign.
#[inline]
pub fn softsign(x: f32) -> f32 {
    x / (1.0 + x.abs())
}

/// Derivative of softsign, evaluated at the stored activation.
#[inline]
pub fn d_softsign(y: f32) -> f32 {
    let denominator = 1.0 + y.abs();
    1.0 / (denominator * denominator)
}

fn check_loss_inputs(eval: ArrayView1<f32>, target: ArrayView1<f32>) -> NetResult<()> {
    if eval.len() != target.len() {
        return Err(NetworkError::DimensionMismatch {
            what: "loss target",
            got: target.len(),
            expected: eval.len(),
        });
    }
    Ok(())
}

/// Mean squared error between network output and target.
///
/// Returns `0.0` for empty vectors.
///
/// # Errors
/// `DimensionMismatch` if the two vectors differ in length.
pub fn mse_loss(eval: ArrayView1<f32>, target: ArrayView1<f32>) -> NetResult<f32> {
    check_loss_inputs(eval, target)?;
    if eval.is_empty() {
        return Ok(0.0);
    }
    let sum: f32 = eval
        .iter()
        .zip(target.iter())
        .map(|(e, t)| {
            let delta = e - t;
            delta * delta
        })
        .sum();
    Ok(sum / eval.len() as f32)
}

/// Mean absolute error between network output and target.
///
/// Returns `0.0` for empty vectors.
///
/// # Errors
/// `DimensionMismatch` if the two vectors differ in length.
pub fn l1_loss(eval: ArrayView1<f32>, target: ArrayView1<f32>) -> NetResult<f32> {
    check_loss_inputs(eval, target)?;
    if eval.is_empty() {
        return Ok(0.0);
    }
    let sum: f32 = eval
        .iter()
        .zip(target.iter())
        .map(|(e, t)| (e - t).abs())
        .sum();
    Ok(sum / eval.len() as f32)
}

/// Draw `count` synapse weights uniformly from `[-WEIGHT_INIT_LIMIT, WEIGHT_INIT_LIMIT)`.
pub fn random_weights<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Array1<f32> {
    let dist = Uniform::new(-WEIGHT_INIT_LIMIT, WEIGHT_INIT_LIMIT);
    Array1::random_using(count, dist, rng)
}
