//! Network orchestration: construction, the three passes, and the worker split.
//!
//! ## Passes
//!
//! ```text
//! forward:   value    = f(Σ w · source.value + bias)                 first hidden → output
//! gradient:  gradient = (target - value) · f'(value)                  output layer
//!            gradient = (Σ w · destination.gradient) · f'(value)      last hidden → first hidden
//! update:    Δb' = η · gradient;          bias   += Δb' + μ · Δb
//!            Δw' = η · gradient · source; weight += Δw' + μ · Δw      last hidden → first hidden, output
//! ```
//!
//! ## Splitting
//!
//! With a [`CalculateThread`] attached, a layer whose estimated work
//! `len × adjacent_len × factor` exceeds [`SplitConfig::threshold`] is cut at
//! its midpoint. Neurons `[0, mid)` run on the worker, `[mid, len)` on the
//! caller, and the caller waits before moving to the next layer. Each half
//! writes only its own neurons (and, for updates, their own input synapses).

use super::{Layer, NetResult, NetworkError, Neuron, NeuronId, Synapse, SynapseId};
use crate::activation::{Activation, ActivationKind, ActivationRegistry};
use crate::pool::WorkerPool;
use crate::sequential::{self, LayerPlan, Sequential};
use crate::utils;
use crate::worker::CalculateThread;
use crate::NetworkConfig;
use log::{debug, trace, warn};
use ndarray::{Array1, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Estimated work above which a layer is split across two threads.
pub const AMOUNT_OF_COMPUTATION: usize = 5000 * 10;

/// Tuning of the two-thread layer split.
///
/// The factors weight `layer_len × adjacent_len` by the relative cost of each
/// pass. They are empirical and hardware dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub threshold: usize,
    pub forward_factor: usize,
    pub gradient_factor: usize,
    pub update_factor: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            threshold: AMOUNT_OF_COMPUTATION,
            forward_factor: 9,
            gradient_factor: 10,
            update_factor: 12,
        }
    }
}

impl SplitConfig {
    /// Split every layer with at least two neurons.
    pub fn always() -> Self {
        Self {
            threshold: 0,
            ..Self::default()
        }
    }

    pub fn should_split(&self, work: usize) -> bool {
        work > self.threshold
    }
}

/// A fully-connected feed-forward network trained with momentum SGD.
///
/// # Architecture
///
/// - **Layers:** `layers[0]` is the input layer, `layers[1..n-1]` the hidden
///   layers, `layers[n-1]` the output layer
/// - **Synapses:** `synapses[b]` holds every edge from layer `b` to `b + 1`,
///   destination-major
/// - **Activation:** per layer, resolved through the network's
///   [`ActivationRegistry`]
///
/// # Weight Initialization
///
/// Weights are drawn uniformly from (-1, 1); biases start at zero.
pub struct Network {
    pub(crate) learn_rate: f32,
    pub(crate) momentum: f32,
    pub(crate) layers: Vec<Layer>,
    pub(crate) synapses: Vec<Vec<Synapse>>,
    pub(crate) activations: ActivationRegistry,
    pub(crate) split: SplitConfig,
    pool: WorkerPool,
    worker: Option<CalculateThread>,
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("sizes", &self.layer_sizes())
            .field("learn_rate", &self.learn_rate)
            .field("momentum", &self.momentum)
            .field(
                "synapses",
                &format!("<{} synapses>", self.synapse_count()),
            )
            .field("parallel", &self.is_parallel())
            .finish()
    }
}

pub(crate) fn validate_rate(name: &str, rate: f32) -> NetResult<()> {
    if (0.0..=1.0).contains(&rate) {
        Ok(())
    } else {
        Err(NetworkError::InvalidConfiguration(format!(
            "{name} {rate} out of [0, 1]"
        )))
    }
}

impl Network {
    /// Create a network with sigmoid activations everywhere.
    ///
    /// # Errors
    /// `InvalidConfiguration` if `hidden` is empty, a hidden or output size is
    /// zero, or a rate in `config` is outside [0, 1].
    pub fn new(
        input: usize,
        hidden: &[usize],
        output: usize,
        config: &NetworkConfig,
    ) -> NetResult<Self> {
        let mut records = Vec::with_capacity(hidden.len() + 2);
        records.push(Sequential::layer(input));
        records.extend(hidden.iter().map(|n| Sequential::layer(*n)));
        records.push(Sequential::layer(output));
        Self::from_sequential(&records, config)
    }

    /// Create a network from a declarative layer list.
    ///
    /// # Errors
    /// See [`sequential::plan`]; also `InvalidConfiguration` for bad rates.
    pub fn from_sequential(records: &[Sequential], config: &NetworkConfig) -> NetResult<Self> {
        Self::with_registry(records, config, ActivationRegistry::new())
    }

    /// Like [`Network::from_sequential`], with custom activations available
    /// from the first pass on.
    pub fn with_registry(
        records: &[Sequential],
        config: &NetworkConfig,
        activations: ActivationRegistry,
    ) -> NetResult<Self> {
        validate_rate("learn rate", config.learn_rate)?;
        validate_rate("momentum", config.momentum)?;
        let plan = sequential::plan(records)?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let weights: Vec<Array1<f32>> = plan
            .sizes
            .windows(2)
            .map(|pair| utils::random_weights(pair[0] * pair[1], &mut rng))
            .collect();
        let biases: Vec<Array1<f32>> = plan.sizes[1..].iter().map(|n| Array1::zeros(*n)).collect();

        let mut network = Self::assemble(&plan, &biases, |b, src, dst| {
            weights[b][dst * plan.sizes[b] + src]
        });
        network.learn_rate = config.learn_rate;
        network.momentum = config.momentum;
        network.split = config.split;
        network.activations = activations;
        Ok(network)
    }

    /// Wire a network of the planned shape.
    ///
    /// `biases[l - 1]` holds the biases of layer `l`; `weight(b, src, dst)`
    /// yields the weight from `layers[b][src]` to `layers[b + 1][dst]`.
    pub(crate) fn assemble<W>(plan: &LayerPlan, biases: &[Array1<f32>], weight: W) -> Self
    where
        W: Fn(usize, usize, usize) -> f32,
    {
        let sizes = &plan.sizes;
        let mut layers = Vec::with_capacity(sizes.len());
        layers.push(Layer::input(sizes[0]));
        for ((size, (kind, parameter)), layer_biases) in
            sizes[1..].iter().zip(&plan.activations).zip(biases)
        {
            let mut layer = Layer::new(*size, *kind, *parameter);
            for (neuron, bias) in layer.neurons.iter_mut().zip(layer_biases) {
                neuron.bias = *bias;
            }
            layers.push(layer);
        }

        let mut synapses = Vec::with_capacity(sizes.len() - 1);
        for b in 0..sizes.len() - 1 {
            let (src_len, dst_len) = (sizes[b], sizes[b + 1]);
            let mut arena = Vec::with_capacity(src_len * dst_len);
            for dst in 0..dst_len {
                let destination = NeuronId {
                    layer: b + 1,
                    index: dst,
                };
                for src in 0..src_len {
                    let source = NeuronId { layer: b, index: src };
                    let id = SynapseId {
                        boundary: b,
                        index: arena.len(),
                    };
                    arena.push(Synapse::new(source, destination, weight(b, src, dst)));
                    layers[b + 1].neurons[dst].input_synapses.push(id);
                }
            }
            for (src, neuron) in layers[b].neurons.iter_mut().enumerate() {
                neuron.output_synapses = (0..dst_len)
                    .map(|dst| SynapseId {
                        boundary: b,
                        index: dst * src_len + src,
                    })
                    .collect();
            }
            synapses.push(arena);
        }

        let network = Self {
            learn_rate: 0.0,
            momentum: 0.0,
            layers,
            synapses,
            activations: ActivationRegistry::new(),
            split: SplitConfig::default(),
            pool: WorkerPool::new(),
            worker: None,
        };
        debug!(
            "assembled network {:?} with {} synapses",
            network.layer_sizes(),
            network.synapse_count()
        );
        network
    }

    pub fn learn_rate(&self) -> f32 {
        self.learn_rate
    }

    /// # Errors
    /// `InvalidConfiguration` if `rate` is outside [0, 1].
    pub fn set_learn_rate(&mut self, rate: f32) -> NetResult<()> {
        validate_rate("learn rate", rate)?;
        self.learn_rate = rate;
        Ok(())
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    /// # Errors
    /// `InvalidConfiguration` if `momentum` is outside [0, 1].
    pub fn set_momentum(&mut self, momentum: f32) -> NetResult<()> {
        validate_rate("momentum", momentum)?;
        self.momentum = momentum;
        Ok(())
    }

    pub fn split_config(&self) -> SplitConfig {
        self.split
    }

    pub fn set_split_config(&mut self, split: SplitConfig) {
        self.split = split;
    }

    pub fn activations(&self) -> &ActivationRegistry {
        &self.activations
    }

    /// Make a custom activation kind available to this network's layers.
    ///
    /// # Errors
    /// See [`ActivationRegistry::register`].
    pub fn register_activation(
        &mut self,
        kind: ActivationKind,
        activation: Arc<dyn Activation>,
    ) -> NetResult<()> {
        self.activations.register(kind, activation)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_layer(&self) -> &Layer {
        &self.layers[0]
    }

    pub fn hidden_layers(&self) -> &[Layer] {
        &self.layers[1..self.layers.len() - 1]
    }

    pub fn output_layer(&self) -> &Layer {
        &self.layers[self.layers.len() - 1]
    }

    /// Neuron count of every layer, input first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::len).collect()
    }

    /// Synapses between layer `boundary` and `boundary + 1`, destination-major.
    pub fn boundary(&self, boundary: usize) -> Option<&[Synapse]> {
        self.synapses.get(boundary).map(Vec::as_slice)
    }

    pub fn synapse(&self, id: SynapseId) -> Option<&Synapse> {
        self.synapses.get(id.boundary)?.get(id.index)
    }

    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.layers.get(id.layer)?.neurons.get(id.index)
    }

    pub fn synapse_count(&self) -> usize {
        self.synapses.iter().map(Vec::len).sum()
    }

    // ------------------------------------------------------------------
    // Worker association
    // ------------------------------------------------------------------

    /// Whether a calculation thread is attached.
    pub fn is_parallel(&self) -> bool {
        self.worker.is_some()
    }

    /// The attached calculation thread, if any.
    pub fn worker(&self) -> Option<&CalculateThread> {
        self.worker.as_ref()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Attach (rent) or detach (release) the calculation thread.
    ///
    /// Enabling replaces an abandoned worker with a fresh one. Disabling
    /// hands a healthy worker back to the pool and drops an abandoned one.
    ///
    /// # Errors
    /// `WorkerFault` if a new thread cannot be spawned.
    pub fn set_parallel(&mut self, enabled: bool) -> NetResult<()> {
        match (enabled, self.worker.take()) {
            (true, Some(worker)) if !worker.is_abandoned() => {
                self.worker = Some(worker);
            }
            (true, stale) => {
                if let Some(abandoned) = stale {
                    warn!("replacing abandoned calculate thread {}", abandoned.id());
                }
                self.worker = Some(self.pool.rent()?);
            }
            (false, Some(worker)) => {
                if let Err(err) = self.pool.release(worker) {
                    warn!("dropping calculate thread: {err}");
                }
            }
            (false, None) => {}
        }
        Ok(())
    }

    /// Recycle workers through `pool` from now on.
    ///
    /// An attached worker is released to the previous pool and a new one is
    /// rented from `pool`.
    pub fn set_pool(&mut self, pool: WorkerPool) -> NetResult<()> {
        let parallel = self.is_parallel();
        self.set_parallel(false)?;
        self.pool = pool;
        self.set_parallel(parallel)
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    /// Run inference and return the output layer values.
    ///
    /// # Errors
    /// - `DimensionMismatch` if `inputs` does not match the input layer
    /// - `UnrecognizedActivation` for an unregistered layer kind
    /// - `WorkerFault` if the attached worker failed
    pub fn forward(&mut self, inputs: &Array1<f32>) -> NetResult<Array1<f32>> {
        self.forward_propagate(inputs.view())?;
        Ok(self.outputs())
    }

    /// Output layer values of the last forward pass.
    pub fn outputs(&self) -> Array1<f32> {
        Array1::from(self.output_layer().values())
    }

    /// One forward, gradient and update step. Returns the mean squared error
    /// of the forward outputs (before the update) against `targets`.
    ///
    /// # Errors
    /// `DimensionMismatch` for bad input or target length, plus everything
    /// [`Network::forward`] can return.
    pub fn train_step(&mut self, inputs: &Array1<f32>, targets: &Array1<f32>) -> NetResult<f32> {
        self.check_targets(targets.view())?;
        self.forward_propagate(inputs.view())?;
        self.compute_gradients(targets.view())?;
        self.update_weights()?;
        let outputs = self.outputs();
        utils::mse_loss(outputs.view(), targets.view())
    }

    /// Compute every neuron's gradient for `targets`, using the values of the
    /// last forward pass. Weights are left untouched.
    ///
    /// # Errors
    /// `DimensionMismatch` if `targets` does not match the output layer.
    pub fn backward(&mut self, targets: &Array1<f32>) -> NetResult<()> {
        self.compute_gradients(targets.view())
    }

    fn check_targets(&self, targets: ArrayView1<f32>) -> NetResult<()> {
        let expected = self.output_layer().len();
        if targets.len() != expected {
            return Err(NetworkError::DimensionMismatch {
                what: "targets",
                got: targets.len(),
                expected,
            });
        }
        Ok(())
    }

    fn forward_propagate(&mut self, inputs: ArrayView1<f32>) -> NetResult<()> {
        let expected = self.input_layer().len();
        if inputs.len() != expected {
            return Err(NetworkError::DimensionMismatch {
                what: "inputs",
                got: inputs.len(),
                expected,
            });
        }
        for (neuron, value) in self.layers[0].neurons.iter_mut().zip(inputs.iter()) {
            neuron.value = *value;
        }
        for l in 1..self.layers.len() {
            self.forward_layer(l)?;
        }
        Ok(())
    }

    fn forward_layer(&mut self, l: usize) -> NetResult<()> {
        let Self {
            layers,
            synapses,
            activations,
            split,
            worker,
            ..
        } = self;
        let (before, rest) = layers.split_at_mut(l);
        let previous = &before[l - 1];
        let layer = &mut rest[0];
        let activation = activations.resolve(layer.act_type)?;
        let parameter = layer.act_parameter;
        let arena = synapses[l - 1].as_slice();

        let work = layer.len() * previous.len() * split.forward_factor;
        dispatch(
            worker.as_ref(),
            split,
            work,
            layer.neurons.as_mut_slice(),
            |neurons: &mut [Neuron]| forward_neurons(previous, activation, parameter, arena, neurons),
        )
    }

    fn compute_gradients(&mut self, targets: ArrayView1<f32>) -> NetResult<()> {
        self.check_targets(targets)?;
        let last = self.layers.len() - 1;
        {
            let layer = &mut self.layers[last];
            let activation = self.activations.resolve(layer.act_type)?;
            let parameter = layer.act_parameter;
            for (neuron, target) in layer.neurons.iter_mut().zip(targets.iter()) {
                let error = target - neuron.value;
                neuron.gradient = error * activation.derivative(neuron.value, parameter);
            }
        }
        for l in (1..last).rev() {
            self.hidden_gradient_layer(l)?;
        }
        Ok(())
    }

    fn hidden_gradient_layer(&mut self, l: usize) -> NetResult<()> {
        let Self {
            layers,
            synapses,
            activations,
            split,
            worker,
            ..
        } = self;
        let (head, tail) = layers.split_at_mut(l + 1);
        let layer = &mut head[l];
        let next = &tail[0];
        let activation = activations.resolve(layer.act_type)?;
        let parameter = layer.act_parameter;
        let arena = synapses[l].as_slice();

        let work = layer.len() * next.len() * split.gradient_factor;
        dispatch(
            worker.as_ref(),
            split,
            work,
            layer.neurons.as_mut_slice(),
            |neurons: &mut [Neuron]| hidden_gradients(next, activation, parameter, arena, neurons),
        )
    }

    /// Apply one momentum-SGD step from the stored gradients.
    ///
    /// Hidden layers are updated from last to first, then the output layer.
    ///
    /// # Errors
    /// `WorkerFault` if the attached worker failed.
    pub fn update_weights(&mut self) -> NetResult<()> {
        let last = self.layers.len() - 1;
        for l in (1..last).rev() {
            self.update_layer(l)?;
        }
        self.update_layer(last)
    }

    fn update_layer(&mut self, l: usize) -> NetResult<()> {
        let Self {
            learn_rate,
            momentum,
            layers,
            synapses,
            split,
            worker,
            ..
        } = self;
        let (learn_rate, momentum) = (*learn_rate, *momentum);
        let (before, rest) = layers.split_at_mut(l);
        let previous = &before[l - 1];
        let layer = &mut rest[0];

        let work = layer.len() * previous.len() * split.update_factor;
        let part = UpdateSpan {
            neurons: layer.neurons.as_mut_slice(),
            synapses: synapses[l - 1].as_mut_slice(),
            base: 0,
            stride: previous.len(),
        };
        dispatch(
            worker.as_ref(),
            split,
            work,
            part,
            |span: UpdateSpan<'_>| update_neurons(previous, learn_rate, momentum, span),
        )
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            if let Err(err) = self.pool.release(worker) {
                debug!("calculate thread not recycled: {err}");
            }
        }
    }
}

/// A contiguous run of neurons that can be cut in two independent halves.
trait NeuronSpan: Send + Sized {
    fn len(&self) -> usize;
    fn split(self, mid: usize) -> (Self, Self);
}

impl NeuronSpan for &mut [Neuron] {
    fn len(&self) -> usize {
        <[Neuron]>::len(self)
    }

    fn split(self, mid: usize) -> (Self, Self) {
        self.split_at_mut(mid)
    }
}

/// Neurons of one layer together with their (contiguous) input synapses.
struct UpdateSpan<'a> {
    neurons: &'a mut [Neuron],
    synapses: &'a mut [Synapse],
    /// Arena index of `synapses[0]`
    base: usize,
    /// Input synapses per neuron
    stride: usize,
}

impl NeuronSpan for UpdateSpan<'_> {
    fn len(&self) -> usize {
        self.neurons.len()
    }

    fn split(self, mid: usize) -> (Self, Self) {
        let (head_neurons, tail_neurons) = self.neurons.split_at_mut(mid);
        let (head_synapses, tail_synapses) = self.synapses.split_at_mut(mid * self.stride);
        (
            UpdateSpan {
                neurons: head_neurons,
                synapses: head_synapses,
                base: self.base,
                stride: self.stride,
            },
            UpdateSpan {
                neurons: tail_neurons,
                synapses: tail_synapses,
                base: self.base + mid * self.stride,
                stride: self.stride,
            },
        )
    }
}

/// Run `kernel` over `span`, handing the first half to `worker` when the
/// estimated work is large enough.
fn dispatch<S, K>(
    worker: Option<&CalculateThread>,
    split: &SplitConfig,
    work: usize,
    span: S,
    kernel: K,
) -> NetResult<()>
where
    S: NeuronSpan,
    K: Fn(S) + Sync,
{
    let len = span.len();
    match worker {
        Some(worker) if len > 1 && split.should_split(work) => {
            let (head, tail) = span.split(len / 2);
            trace!("splitting {len} neurons (work {work}) with calculate thread {}", worker.id());
            let kernel = &kernel;
            worker.run_split(
                move || {
                    kernel(head);
                    Ok(())
                },
                move || {
                    kernel(tail);
                    Ok(())
                },
            )
        }
        _ => {
            kernel(span);
            Ok(())
        }
    }
}

fn forward_neurons(
    previous: &Layer,
    activation: &dyn Activation,
    parameter: f32,
    arena: &[Synapse],
    neurons: &mut [Neuron],
) {
    for neuron in neurons {
        let mut sum = 0.0f32;
        for id in &neuron.input_synapses {
            let synapse = &arena[id.index];
            sum += synapse.weight * previous.neurons[synapse.source.index].value;
        }
        neuron.value = activation.output(sum + neuron.bias, parameter);
    }
}

fn hidden_gradients(
    next: &Layer,
    activation: &dyn Activation,
    parameter: f32,
    arena: &[Synapse],
    neurons: &mut [Neuron],
) {
    for neuron in neurons {
        let mut loss = 0.0f32;
        for id in &neuron.output_synapses {
            let synapse = &arena[id.index];
            loss += synapse.weight * next.neurons[synapse.destination.index].gradient;
        }
        neuron.gradient = loss * activation.derivative(neuron.value, parameter);
    }
}

fn update_neurons(previous: &Layer, learn_rate: f32, momentum: f32, span: UpdateSpan<'_>) {
    let UpdateSpan {
        neurons,
        synapses,
        base,
        ..
    } = span;
    for neuron in neurons {
        let prev_delta = neuron.bias_delta;
        neuron.bias_delta = learn_rate * neuron.gradient;
        neuron.bias += neuron.bias_delta + momentum * prev_delta;

        let gradient = neuron.gradient;
        for id in &neuron.input_synapses {
            let synapse = &mut synapses[id.index - base];
            let prev_delta = synapse.weight_delta;
            synapse.weight_delta =
                learn_rate * gradient * previous.neurons[synapse.source.index].value;
            synapse.weight += synapse.weight_delta + momentum * prev_delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    fn config(seed: u64) -> NetworkConfig {
        NetworkConfig {
            seed: Some(seed),
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn test_connectivity() {
        let net = Network::new(3, &[4, 5], 2, &config(1)).unwrap();
        assert_eq!(net.layer_sizes(), vec![3, 4, 5, 2]);
        assert_eq!(net.synapse_count(), 3 * 4 + 4 * 5 + 5 * 2);

        for neuron in &net.input_layer().neurons {
            assert!(neuron.input_synapses.is_empty());
            assert_eq!(neuron.output_synapses.len(), 4);
        }
        for neuron in &net.output_layer().neurons {
            assert_eq!(neuron.input_synapses.len(), 5);
            assert!(neuron.output_synapses.is_empty());
        }
        let hidden = &net.hidden_layers()[1];
        assert_eq!(hidden.neurons[0].input_synapses.len(), 4);
        assert_eq!(hidden.neurons[0].output_synapses.len(), 2);
    }

    #[test]
    fn test_synapse_endpoints_agree() {
        let net = Network::new(2, &[3], 2, &config(2)).unwrap();
        for (l, layer) in net.layers().iter().enumerate() {
            for (i, neuron) in layer.neurons.iter().enumerate() {
                let me = NeuronId { layer: l, index: i };
                for id in &neuron.input_synapses {
                    assert_eq!(net.synapse(*id).unwrap().destination, me);
                }
                for id in &neuron.output_synapses {
                    assert_eq!(net.synapse(*id).unwrap().source, me);
                }
            }
        }
    }

    #[test]
    fn test_rate_validation() {
        let mut bad = config(0);
        bad.learn_rate = 1.000_000_1;
        assert!(matches!(
            Network::new(2, &[2], 1, &bad),
            Err(NetworkError::InvalidConfiguration(_))
        ));
        bad.learn_rate = -0.1;
        assert!(Network::new(2, &[2], 1, &bad).is_err());

        let mut edge = config(0);
        edge.learn_rate = 1.0;
        edge.momentum = 0.0;
        assert!(Network::new(2, &[2], 1, &edge).is_ok());
    }

    #[test]
    fn test_forward_by_hand() {
        let mut net = Network::new(2, &[1], 1, &config(3)).unwrap();
        net.synapses[0][0].weight = 0.5;
        net.synapses[0][1].weight = -0.25;
        net.synapses[1][0].weight = 2.0;
        net.layers[1].neurons[0].bias = 0.1;

        let out = net.forward(&arr1(&[1.0, 2.0])).unwrap();
        let hidden = utils::sigmoid(0.5 - 0.5 + 0.1);
        let expected = utils::sigmoid(2.0 * hidden);
        assert!((out[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_single_update_by_hand() {
        let mut cfg = config(4);
        cfg.learn_rate = 0.5;
        cfg.momentum = 0.0;
        let mut net = Network::new(1, &[1], 1, &cfg).unwrap();
        net.synapses[0][0].weight = 1.0;
        net.synapses[1][0].weight = 1.0;

        net.forward(&arr1(&[1.0])).unwrap();
        let hidden = net.layers[1].neurons[0].value;
        let output = net.layers[2].neurons[0].value;
        net.backward(&arr1(&[1.0])).unwrap();
        let out_gradient = (1.0 - output) * output * (1.0 - output);
        assert!((net.layers[2].neurons[0].gradient - out_gradient).abs() < 1e-6);

        net.update_weights().unwrap();
        let expected_weight = 1.0 + 0.5 * out_gradient * hidden;
        assert!((net.synapses[1][0].weight - expected_weight).abs() < 1e-6);
        assert!((net.layers[2].neurons[0].bias - 0.5 * out_gradient).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut net = Network::new(2, &[3], 1, &config(5)).unwrap();
        assert!(matches!(
            net.forward(&arr1(&[1.0])),
            Err(NetworkError::DimensionMismatch { what: "inputs", .. })
        ));
        assert!(matches!(
            net.train_step(&arr1(&[1.0, 0.0]), &arr1(&[1.0, 0.0])),
            Err(NetworkError::DimensionMismatch { what: "targets", .. })
        ));
    }

    #[test]
    fn test_unregistered_activation_fails_forward() {
        let records = [
            Sequential::layer(2),
            Sequential::activation(ActivationKind::Custom(77), None),
            Sequential::layer(2),
            Sequential::layer(1),
        ];
        let mut net = Network::from_sequential(&records, &config(6)).unwrap();
        assert!(matches!(
            net.forward(&arr1(&[0.0, 1.0])),
            Err(NetworkError::UnrecognizedActivation(ActivationKind::Custom(77)))
        ));
    }

    #[test]
    fn test_split_config_threshold() {
        let split = SplitConfig::default();
        assert!(!split.should_split(AMOUNT_OF_COMPUTATION));
        assert!(split.should_split(AMOUNT_OF_COMPUTATION + 1));
        assert!(SplitConfig::always().should_split(1));
    }

    #[test]
    fn test_set_parallel_rents_and_releases() {
        let mut net = Network::new(2, &[3], 1, &config(7)).unwrap();
        let pool = net.pool().clone();
        net.set_parallel(true).unwrap();
        assert!(net.is_parallel());
        net.set_parallel(false).unwrap();
        assert!(!net.is_parallel());
        assert_eq!(pool.available(), 1);
    }
}
