//! Activation functions and their dispatch.
//!
//! Each layer carries an [`ActivationKind`] tag. Built-in kinds resolve to the
//! unit structs in this module; any other kind (including the input-layer
//! sentinel) is looked up in an [`ActivationRegistry`] that callers can extend
//! with their own [`Activation`] implementations.
//!
//! ## Derivative convention
//!
//! Derivatives are evaluated at the neuron's stored *activated* value, not at
//! the raw weighted sum. For the logistic function this is the usual
//! `y * (1 - y)` shortcut.

use crate::core::{NetResult, NetworkError};
use crate::utils;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Negative slope used by leaky ReLU when no parameter is given.
pub const DEFAULT_LEAKY_SLOPE: f32 = 0.02;

/// Tag selecting the activation function of a layer.
///
/// Every kind has a stable integer code (see [`ActivationKind::code`]) used
/// in checkpoints. `Custom` covers every code without a built-in meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", from = "i32")]
pub enum ActivationKind {
    /// Sentinel for the input layer, which has no activation.
    Input,
    LeakyRelu,
    Relu,
    Sigmoid,
    Softsign,
    /// User-defined kind, resolved through the registry. Code 0 means unset
    /// and codes 1 to 5 belong to the built-in kinds; see
    /// [`ActivationKind::is_reserved`].
    Custom(i32),
}

impl ActivationKind {
    /// Stable integer code of this kind.
    pub fn code(self) -> i32 {
        match self {
            ActivationKind::Input => 1,
            ActivationKind::LeakyRelu => 2,
            ActivationKind::Relu => 3,
            ActivationKind::Sigmoid => 4,
            ActivationKind::Softsign => 5,
            ActivationKind::Custom(code) => code,
        }
    }

    /// Inverse of [`ActivationKind::code`].
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => ActivationKind::Input,
            2 => ActivationKind::LeakyRelu,
            3 => ActivationKind::Relu,
            4 => ActivationKind::Sigmoid,
            5 => ActivationKind::Softsign,
            other => ActivationKind::Custom(other),
        }
    }

    /// Whether this is a `Custom` kind whose code collides with "unset" (0)
    /// or a built-in kind (1 to 5). Such a kind would not survive a
    /// checkpoint round trip.
    pub fn is_reserved(self) -> bool {
        matches!(self, ActivationKind::Custom(code) if (0..=5).contains(&code))
    }

    /// Parameter used when a layer declares this kind without one.
    pub fn default_parameter(self) -> f32 {
        match self {
            ActivationKind::LeakyRelu => DEFAULT_LEAKY_SLOPE,
            _ => 0.0,
        }
    }
}

impl From<ActivationKind> for i32 {
    fn from(kind: ActivationKind) -> Self {
        kind.code()
    }
}

impl From<i32> for ActivationKind {
    fn from(code: i32) -> Self {
        ActivationKind::from_code(code)
    }
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationKind::Input => write!(f, "input"),
            ActivationKind::LeakyRelu => write!(f, "leaky_relu"),
            ActivationKind::Relu => write!(f, "relu"),
            ActivationKind::Sigmoid => write!(f, "sigmoid"),
            ActivationKind::Softsign => write!(f, "softsign"),
            ActivationKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

/// Activation function trait for layer nonlinearities.
///
/// Implementations provide both the activation and its derivative. They are
/// shared with the background worker thread, hence `Send + Sync`.
pub trait Activation: Send + Sync {
    /// Apply activation function: f(x)
    fn output(&self, x: f32, parameter: f32) -> f32;

    /// Derivative of the activation, evaluated at the activated value `y`.
    fn derivative(&self, y: f32, parameter: f32) -> f32;

    /// Name for debugging
    fn name(&self) -> &'static str;
}

/// Leaky ReLU: f(x) = x for x >= 0, x * slope otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LeakyReluActivation;

impl Activation for LeakyReluActivation {
    fn output(&self, x: f32, parameter: f32) -> f32 {
        utils::leaky_relu(x, parameter)
    }

    fn derivative(&self, y: f32, parameter: f32) -> f32 {
        utils::d_leaky_relu(y, parameter)
    }

    fn name(&self) -> &'static str {
        "leaky_relu"
    }
}

/// ReLU: f(x) = max(x, 0)
#[derive(Debug, Clone, Copy)]
pub struct ReluActivation;

impl Activation for ReluActivation {
    fn output(&self, x: f32, _parameter: f32) -> f32 {
        utils::relu(x)
    }

    fn derivative(&self, y: f32, _parameter: f32) -> f32 {
        utils::d_relu(y)
    }

    fn name(&self) -> &'static str {
        "relu"
    }
}

/// Logistic sigmoid: f(x) = 1 / (1 + e^-x), saturated outside (-45, 45).
///
/// # Properties
/// - Output range: [0, 1]
/// - Derivative from the output: f'(x) = y * (1 - y)
#[derive(Debug, Clone, Copy)]
pub struct SigmoidActivation;

impl Activation for SigmoidActivation {
    fn output(&self, x: f32, _parameter: f32) -> f32 {
        utils::sigmoid(x)
    }

    fn derivative(&self, y: f32, _parameter: f32) -> f32 {
        utils::d_sigmoid(y)
    }

    fn name(&self) -> &'static str {
        "sigmoid"
    }
}

/// Softsign: f(x) = x / (1 + |x|)
#[derive(Debug, Clone, Copy)]
pub struct SoftsignActivation;

impl Activation for SoftsignActivation {
    fn output(&self, x: f32, _parameter: f32) -> f32 {
        utils::softsign(x)
    }

    fn derivative(&self, y: f32, _parameter: f32) -> f32 {
        utils::d_softsign(y)
    }

    fn name(&self) -> &'static str {
        "softsign"
    }
}

static LEAKY_RELU: LeakyReluActivation = LeakyReluActivation;
static RELU: ReluActivation = ReluActivation;
static SIGMOID: SigmoidActivation = SigmoidActivation;
static SOFTSIGN: SoftsignActivation = SoftsignActivation;

/// Lookup table from [`ActivationKind`] to activation implementation.
///
/// Built-in kinds always resolve; every other kind must be registered first.
/// Registering a built-in kind has no effect on dispatch.
#[derive(Clone, Default)]
pub struct ActivationRegistry {
    custom: HashMap<ActivationKind, Arc<dyn Activation>>,
}

impl fmt::Debug for ActivationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .custom
            .iter()
            .map(|(kind, activation)| format!("{kind}={}", activation.name()))
            .collect();
        names.sort();
        f.debug_struct("ActivationRegistry")
            .field("custom", &names)
            .finish()
    }
}

impl ActivationRegistry {
    /// Registry with only the built-in kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the implementation for a non-built-in kind.
    ///
    /// # Errors
    /// `InvalidConfiguration` for a built-in kind or a reserved custom code.
    pub fn register(
        &mut self,
        kind: ActivationKind,
        activation: Arc<dyn Activation>,
    ) -> NetResult<()> {
        let builtin = matches!(
            kind,
            ActivationKind::LeakyRelu
                | ActivationKind::Relu
                | ActivationKind::Sigmoid
                | ActivationKind::Softsign
        );
        if builtin || kind.is_reserved() {
            return Err(NetworkError::InvalidConfiguration(format!(
                "activation code {} is reserved",
                kind.code()
            )));
        }
        log::debug!("registering activation {kind} as {}", activation.name());
        self.custom.insert(kind, activation);
        Ok(())
    }

    /// Whether `kind` can be resolved.
    pub fn contains(&self, kind: ActivationKind) -> bool {
        self.resolve(kind).is_ok()
    }

    /// Find the implementation for `kind`.
    ///
    /// # Errors
    /// `UnrecognizedActivation` if `kind` is neither built in nor registered.
    pub fn resolve(&self, kind: ActivationKind) -> NetResult<&dyn Activation> {
        match kind {
            ActivationKind::LeakyRelu => Ok(&LEAKY_RELU),
            ActivationKind::Relu => Ok(&RELU),
            ActivationKind::Sigmoid => Ok(&SIGMOID),
            ActivationKind::Softsign => Ok(&SOFTSIGN),
            ActivationKind::Input | ActivationKind::Custom(_) => self
                .custom
                .get(&kind)
                .map(|activation| activation.as_ref())
                .ok_or(NetworkError::UnrecognizedActivation(kind)),
        }
    }

    /// Activation output for `kind` at `x`.
    pub fn output(&self, kind: ActivationKind, x: f32, parameter: f32) -> NetResult<f32> {
        Ok(self.resolve(kind)?.output(x, parameter))
    }

    /// Activation derivative for `kind` at the activated value `y`.
    pub fn derivative(&self, kind: ActivationKind, y: f32, parameter: f32) -> NetResult<f32> {
        Ok(self.resolve(kind)?.derivative(y, parameter))
    }
}
