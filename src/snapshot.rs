//! Plain-data capture of a network's trained state.
//!
//! A [`NetworkSnapshot`] holds everything needed to rebuild an equivalent
//! network: rates, layer sizes, per-boundary activations, biases and weights.
//! Momentum deltas, gradients, the split tuning and the worker association
//! are not captured: a restored network starts with zero deltas,
//! [`SplitConfig::default`](crate::SplitConfig::default) and no worker.
//!
//! Weight matrix `weights[b]` has shape `(layer_sizes[b], layer_sizes[b + 1])`:
//! row = source neuron, column = destination neuron.

use crate::activation::{ActivationKind, ActivationRegistry};
use crate::core::{validate_rate, NetResult, Network, NetworkError};
use crate::sequential::{LayerPlan, MIN_LAYERS};
use log::debug;
use ndarray::{Array1, Array2};

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSnapshot {
    pub learn_rate: f32,
    pub momentum: f32,
    /// Neuron count per layer, input first.
    pub layer_sizes: Vec<usize>,
    /// Activation kind and parameter of layers `1..`.
    pub activations: Vec<(ActivationKind, f32)>,
    /// Biases of layers `1..`.
    pub biases: Vec<Array1<f32>>,
    /// One `(source, destination)` matrix per boundary.
    pub weights: Vec<Array2<f32>>,
}

fn check_len(what: &'static str, got: usize, expected: usize) -> NetResult<()> {
    if got == expected {
        Ok(())
    } else {
        Err(NetworkError::DimensionMismatch {
            what,
            got,
            expected,
        })
    }
}

impl NetworkSnapshot {
    /// Check that every field agrees with `layer_sizes`.
    ///
    /// # Errors
    /// `InvalidConfiguration` for bad rates, layer sizes or reserved
    /// activation codes, `DimensionMismatch` for activation, bias or weight
    /// shapes.
    pub fn validate(&self) -> NetResult<()> {
        validate_rate("learn rate", self.learn_rate)?;
        validate_rate("momentum", self.momentum)?;

        let sizes = &self.layer_sizes;
        if sizes.len() < MIN_LAYERS {
            return Err(NetworkError::InvalidConfiguration(format!(
                "need at least {MIN_LAYERS} layers, got {}",
                sizes.len()
            )));
        }
        if let Some(position) = sizes.iter().skip(1).position(|n| *n == 0) {
            return Err(NetworkError::InvalidConfiguration(format!(
                "layer {} has no neurons",
                position + 1
            )));
        }

        let boundaries = sizes.len() - 1;
        check_len("snapshot activations", self.activations.len(), boundaries)?;
        if let Some((kind, _)) = self.activations.iter().find(|(kind, _)| kind.is_reserved()) {
            return Err(NetworkError::InvalidConfiguration(format!(
                "activation code {} is reserved",
                kind.code()
            )));
        }
        check_len("snapshot biases", self.biases.len(), boundaries)?;
        check_len("snapshot weights", self.weights.len(), boundaries)?;

        for (b, (bias, weights)) in self.biases.iter().zip(&self.weights).enumerate() {
            check_len("snapshot bias vector", bias.len(), sizes[b + 1])?;
            let (rows, cols) = weights.dim();
            check_len("snapshot weight rows", rows, sizes[b])?;
            check_len("snapshot weight columns", cols, sizes[b + 1])?;
        }
        Ok(())
    }

    /// Evaluate the snapshot directly, without building a trainable network.
    ///
    /// Produces the same values as [`Network::forward`] on the network the
    /// snapshot was taken from.
    ///
    /// # Errors
    /// Anything [`NetworkSnapshot::validate`] reports, `DimensionMismatch`
    /// for a bad input length, `UnrecognizedActivation` for a kind missing
    /// from `registry`.
    pub fn quick_forward(
        &self,
        inputs: &Array1<f32>,
        registry: &ActivationRegistry,
    ) -> NetResult<Array1<f32>> {
        self.validate()?;
        check_len("inputs", inputs.len(), self.layer_sizes[0])?;

        let mut values = inputs.clone();
        for ((weights, bias), (kind, parameter)) in
            self.weights.iter().zip(&self.biases).zip(&self.activations)
        {
            let activation = registry.resolve(*kind)?;
            values = Array1::from_shape_fn(weights.ncols(), |dst| {
                let sum = weights
                    .column(dst)
                    .iter()
                    .zip(values.iter())
                    .fold(0.0f32, |acc, (w, v)| acc + w * v);
                activation.output(sum + bias[dst], *parameter)
            });
        }
        Ok(values)
    }
}

impl Network {
    /// Capture rates, shape, activations, biases and weights.
    pub fn snapshot(&self) -> NetworkSnapshot {
        let layer_sizes = self.layer_sizes();
        let activations = self.layers[1..]
            .iter()
            .map(|layer| (layer.act_type, layer.act_parameter))
            .collect();
        let biases = self.layers[1..]
            .iter()
            .map(|layer| layer.neurons.iter().map(|n| n.bias).collect())
            .collect();
        let weights = self
            .synapses
            .iter()
            .enumerate()
            .map(|(b, arena)| {
                let src_len = layer_sizes[b];
                Array2::from_shape_fn((src_len, layer_sizes[b + 1]), |(src, dst)| {
                    arena[dst * src_len + src].weight
                })
            })
            .collect();

        NetworkSnapshot {
            learn_rate: self.learn_rate,
            momentum: self.momentum,
            layer_sizes,
            activations,
            biases,
            weights,
        }
    }

    /// Rebuild a network from `snapshot` without re-randomizing.
    ///
    /// The result runs inline with the default split tuning; call
    /// [`Network::set_split_config`] and [`Network::set_parallel`] to carry
    /// over a tuned configuration.
    ///
    /// # Errors
    /// See [`NetworkSnapshot::validate`].
    pub fn from_snapshot(snapshot: &NetworkSnapshot) -> NetResult<Self> {
        Self::from_snapshot_with_registry(snapshot, ActivationRegistry::new())
    }

    /// Like [`Network::from_snapshot`], with custom activations available.
    pub fn from_snapshot_with_registry(
        snapshot: &NetworkSnapshot,
        activations: ActivationRegistry,
    ) -> NetResult<Self> {
        snapshot.validate()?;
        let plan = LayerPlan {
            sizes: snapshot.layer_sizes.clone(),
            activations: snapshot.activations.clone(),
        };
        let mut network = Self::assemble(&plan, &snapshot.biases, |b, src, dst| {
            snapshot.weights[b][[src, dst]]
        });
        network.learn_rate = snapshot.learn_rate;
        network.momentum = snapshot.momentum;
        network.activations = activations;
        debug!("restored network {:?} from snapshot", plan.sizes);
        Ok(network)
    }
}
