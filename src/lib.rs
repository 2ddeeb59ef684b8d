//! # duonet
//!
//! A fully-connected feed-forward neural network trained with backpropagation
//! and momentum SGD, able to split large layers across the caller thread and
//! one recycled background thread.
//!
//! ## Structure
//!
//! - [`core`]: Graph types (neurons, synapses, layers) and the [`Network`] engine
//! - [`activation`]: Built-in activation functions and the custom registry
//! - [`sequential`]: Declarative layer lists
//! - [`worker`] / [`pool`]: The background calculation thread and its recycling pool
//! - [`snapshot`] / [`checkpoint`]: State capture, restore and JSON persistence
//! - [`training`]: Epoch loops and metrics
//! - [`utils`]: Activation kernels, losses, weight initialization
//!
//! ## Example
//!
//! ```
//! use duonet::{Network, NetworkConfig};
//! use ndarray::arr1;
//!
//! let config = NetworkConfig { seed: Some(1), ..NetworkConfig::default() };
//! let mut net = Network::new(2, &[4], 1, &config).unwrap();
//! let loss = net.train_step(&arr1(&[0.0, 1.0]), &arr1(&[1.0])).unwrap();
//! assert!(loss >= 0.0);
//! ```

pub mod activation;
pub mod checkpoint;
pub mod core;
pub mod pool;
pub mod sequential;
pub mod snapshot;
pub mod training;
pub mod utils;
pub mod worker;

pub use activation::{Activation, ActivationKind, ActivationRegistry};
pub use crate::core::{
    Layer, NetResult, Network, NetworkError, Neuron, NeuronId, SplitConfig, Synapse, SynapseId,
};
pub use pool::{PoolStats, WorkerPool};
pub use sequential::Sequential;
pub use snapshot::NetworkSnapshot;
pub use training::{train, train_epoch, EpochMetrics, Sample};
pub use worker::{CalculateThread, WorkerState};

use serde::{Deserialize, Serialize};

/// Network construction parameters.
///
/// Used by [`Network::new`] and [`Network::from_sequential`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Step size, in [0, 1]
    pub learn_rate: f32,
    /// Fraction of the previous update carried over, in [0, 1]
    pub momentum: f32,
    #[serde(default)]
    pub split: SplitConfig,
    /// Seed for weight initialization; `None` draws from the OS
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            learn_rate: 0.02,
            momentum: 0.75,
            split: SplitConfig::default(),
            seed: None,
        }
    }
}
