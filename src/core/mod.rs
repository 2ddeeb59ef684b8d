//! Core graph types and the network engine.
//!
//! This module provides the fundamental structures:
//! - [`Synapse`]: weighted edge between neurons of adjacent layers
//! - [`Neuron`]: bias, gradient, activated value and its synapse references
//! - [`Layer`]: fixed-length neuron sequence sharing one activation
//! - [`Network`]: owns everything and runs forward/backward/update passes
//!
//! ## Arena layout
//!
//! Neurons and synapses refer to each other by index, never by pointer.
//! Synapses live in one arena per *boundary* (boundary `b` connects layer `b`
//! to layer `b + 1`), ordered destination-major:
//!
//! ```text
//! arena[b][dst * src_len + src]  connects  layers[b][src] -> layers[b + 1][dst]
//! ```
//!
//! so the input synapses of one destination neuron form a contiguous run.

mod network;

pub use network::{Network, SplitConfig, AMOUNT_OF_COMPUTATION};
pub(crate) use network::validate_rate;

use crate::activation::ActivationKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for network operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// Invalid network configuration (rates, layer count, layer sizes)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Input, target or snapshot shape does not match the network
    #[error("Dimension mismatch for {what}: got {got}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// No activation function registered for this kind
    #[error("Unrecognized activation: {0}")]
    UnrecognizedActivation(ActivationKind),
    /// A background task failed; the worker context is retired
    #[error("Worker fault: {0}")]
    WorkerFault(String),
    /// A task was submitted before the previous one was waited for
    #[error("Worker busy: previous task has not been waited for")]
    WorkerBusy,
    /// Checkpoint could not be written or read
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

pub type NetResult<T> = Result<T, NetworkError>;

/// Position of a neuron: layer index (0 = input) and index within the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeuronId {
    pub layer: usize,
    pub index: usize,
}

/// Position of a synapse: boundary index and index within that arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SynapseId {
    pub boundary: usize,
    pub index: usize,
}

/// Weighted edge from `source` (layer `b`) to `destination` (layer `b + 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct Synapse {
    pub source: NeuronId,
    pub destination: NeuronId,
    pub weight: f32,
    /// Last applied update, kept for momentum
    pub weight_delta: f32,
}

impl Synapse {
    pub fn new(source: NeuronId, destination: NeuronId, weight: f32) -> Self {
        Self {
            source,
            destination,
            weight,
            weight_delta: 0.0,
        }
    }
}

/// A single neuron.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neuron {
    pub bias: f32,
    /// Last applied bias update, kept for momentum
    pub bias_delta: f32,
    pub gradient: f32,
    /// Activated output of the last forward pass
    pub value: f32,
    /// Synapses terminating here (empty in the input layer)
    pub input_synapses: Vec<SynapseId>,
    /// Synapses originating here (empty in the output layer)
    pub output_synapses: Vec<SynapseId>,
}

/// Ordered neurons sharing one activation function.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub neurons: Vec<Neuron>,
    pub act_type: ActivationKind,
    pub act_parameter: f32,
}

impl Layer {
    /// Layer of `size` neurons with zero bias and no synapses yet.
    pub fn new(size: usize, act_type: ActivationKind, act_parameter: f32) -> Self {
        Self {
            neurons: vec![Neuron::default(); size],
            act_type,
            act_parameter,
        }
    }

    /// Input layer: sentinel activation, parameter 0.
    pub fn input(size: usize) -> Self {
        Self::new(size, ActivationKind::Input, 0.0)
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    /// Activated values of every neuron, in order.
    pub fn values(&self) -> Vec<f32> {
        self.neurons.iter().map(|n| n.value).collect()
    }
}
