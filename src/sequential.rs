//! Declarative layer list used to describe a network before building it.
//!
//! A network is declared as an ordered list of records: layer records give
//! neuron counts, activation records placed between two layers choose the
//! activation of the boundary leading into the next layer.
//!
//! ```
//! use duonet::{ActivationKind, Sequential};
//!
//! let layers = vec![
//!     Sequential::layer(2),
//!     Sequential::activation(ActivationKind::Relu, None),
//!     Sequential::layer(6),
//!     Sequential::layer(6),
//!     Sequential::activation(ActivationKind::LeakyRelu, Some(0.05)),
//!     Sequential::layer(1),
//! ];
//! let plan = duonet::sequential::plan(&layers).unwrap();
//! assert_eq!(plan.sizes, vec![2, 6, 6, 1]);
//! ```

use crate::activation::ActivationKind;
use crate::core::{NetResult, NetworkError};
use serde::{Deserialize, Serialize};

/// Minimum number of layer records: input, one hidden, output.
pub const MIN_LAYERS: usize = 3;

/// Activation used for boundaries without an activation record.
pub const DEFAULT_ACTIVATION: ActivationKind = ActivationKind::Sigmoid;

/// One record of a layer list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sequential {
    /// A layer of `n` neurons.
    Layer(usize),
    /// Activation of the boundary leading into the next layer record.
    Activation {
        kind: ActivationKind,
        parameter: Option<f32>,
    },
}

impl Sequential {
    pub fn layer(neurons: usize) -> Self {
        Sequential::Layer(neurons)
    }

    /// `parameter: None` falls back to [`ActivationKind::default_parameter`].
    pub fn activation(kind: ActivationKind, parameter: Option<f32>) -> Self {
        Sequential::Activation { kind, parameter }
    }
}

/// Number of layer records in `records`.
pub fn layer_count(records: &[Sequential]) -> usize {
    records
        .iter()
        .filter(|r| matches!(r, Sequential::Layer(_)))
        .count()
}

/// Resolved shape of a network: one size per layer and one activation per
/// boundary (`activations[b]` belongs to layer `b + 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPlan {
    pub sizes: Vec<usize>,
    pub activations: Vec<(ActivationKind, f32)>,
}

/// Validate `records` and resolve defaults.
///
/// # Errors
/// `InvalidConfiguration` when there are fewer than [`MIN_LAYERS`] layer
/// records, a hidden or output layer has zero neurons, an activation
/// record does not sit between two layer records, or it uses a reserved
/// custom code (see [`ActivationKind::is_reserved`]).
pub fn plan(records: &[Sequential]) -> NetResult<LayerPlan> {
    let count = layer_count(records);
    if count < MIN_LAYERS {
        return Err(NetworkError::InvalidConfiguration(format!(
            "need at least {MIN_LAYERS} layers, got {count}"
        )));
    }

    let mut sizes = Vec::with_capacity(count);
    let mut declared: Vec<Option<(ActivationKind, Option<f32>)>> = vec![None; count - 1];

    for record in records {
        match record {
            Sequential::Layer(n) => sizes.push(*n),
            Sequential::Activation { kind, parameter } => {
                let boundary = sizes.len().checked_sub(1).filter(|b| *b < count - 1);
                let Some(boundary) = boundary else {
                    return Err(NetworkError::InvalidConfiguration(format!(
                        "activation {kind} must sit between two layers"
                    )));
                };
                if kind.is_reserved() {
                    return Err(NetworkError::InvalidConfiguration(format!(
                        "activation code {} is reserved",
                        kind.code()
                    )));
                }
                declared[boundary] = Some((*kind, *parameter));
            }
        }
    }

    if let Some(position) = sizes.iter().skip(1).position(|n| *n == 0) {
        return Err(NetworkError::InvalidConfiguration(format!(
            "layer {} has no neurons",
            position + 1
        )));
    }

    let activations = declared
        .into_iter()
        .map(|entry| {
            let (kind, parameter) = entry.unwrap_or((DEFAULT_ACTIVATION, None));
            (kind, parameter.unwrap_or_else(|| kind.default_parameter()))
        })
        .collect();

    Ok(LayerPlan { sizes, activations })
}
