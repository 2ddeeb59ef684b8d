//! End-to-end tests for network training, snapshots and validation.
//!
//! These tests verify:
//! - Networks can learn a non-trivial function (XOR)
//! - Snapshot/restore reproduces outputs and training exactly
//! - Construction and pass inputs are validated
//! - Custom activations plug into every pass

use approx::assert_abs_diff_eq;
use duonet::checkpoint::{load_checkpoint, save_checkpoint};
use duonet::training::{evaluate, train, Sample};
use duonet::{
    Activation, ActivationKind, ActivationRegistry, Network, NetworkConfig, NetworkError,
    Sequential,
};
use ndarray::{arr1, Array1};
use std::sync::Arc;

fn xor_samples() -> Vec<Sample> {
    vec![
        Sample::new(arr1(&[0.0, 0.0]), arr1(&[0.0])),
        Sample::new(arr1(&[0.0, 1.0]), arr1(&[1.0])),
        Sample::new(arr1(&[1.0, 0.0]), arr1(&[1.0])),
        Sample::new(arr1(&[1.0, 1.0]), arr1(&[0.0])),
    ]
}

fn seeded(seed: u64) -> NetworkConfig {
    NetworkConfig {
        seed: Some(seed),
        ..NetworkConfig::default()
    }
}

/// Train 2 -> [6, 6] -> 1 on XOR with the default rates.
///
/// Plain SGD can stall in a poor basin for an unlucky initialization, so a
/// few seeds are tried and one of them must converge.
#[test]
fn test_xor_convergence() {
    let samples = xor_samples();
    let mut converged = None;

    for seed in [7, 11, 23, 42, 97] {
        let mut net = Network::new(2, &[6, 6], 1, &seeded(seed)).expect("valid network");
        let history = train(&mut net, &samples, 50_000, Some(0.05)).expect("training");
        let final_loss = history.last().map(|m| m.avg_loss).unwrap_or(f32::MAX);
        if final_loss < 0.05 {
            converged = Some(net);
            break;
        }
    }

    let mut net = converged.expect("no seed converged on XOR");
    assert!(evaluate(&mut net, &samples).expect("evaluate") < 0.06);
    for sample in &samples {
        let output = net.forward(&sample.inputs).expect("forward");
        assert!(
            (output[0] - sample.targets[0]).abs() < 0.45,
            "{:?} -> {}",
            sample.inputs,
            output[0]
        );
    }
}

#[test]
fn test_snapshot_round_trip_is_bit_identical() {
    let records = [
        Sequential::layer(3),
        Sequential::activation(ActivationKind::Relu, None),
        Sequential::layer(5),
        Sequential::activation(ActivationKind::Softsign, None),
        Sequential::layer(4),
        Sequential::layer(2),
    ];
    let mut original = Network::from_sequential(&records, &seeded(5)).expect("valid");
    let mut restored = Network::from_snapshot(&original.snapshot()).expect("restore");

    let input = arr1(&[0.25, -1.5, 0.75]);
    assert_eq!(
        original.forward(&input).expect("forward"),
        restored.forward(&input).expect("forward")
    );

    let target = arr1(&[0.1, 0.9]);
    for _ in 0..25 {
        let a = original.train_step(&input, &target).expect("train");
        let b = restored.train_step(&input, &target).expect("train");
        assert_eq!(a.to_bits(), b.to_bits());
    }
    assert_eq!(original.snapshot(), restored.snapshot());
}

#[test]
fn test_restored_network_keeps_rates_and_activations() {
    let records = [
        Sequential::layer(2),
        Sequential::activation(ActivationKind::LeakyRelu, Some(0.1)),
        Sequential::layer(3),
        Sequential::layer(1),
    ];
    let config = NetworkConfig {
        learn_rate: 0.3,
        momentum: 0.1,
        seed: Some(1),
        ..NetworkConfig::default()
    };
    let net = Network::from_sequential(&records, &config).expect("valid");
    let restored = Network::from_snapshot(&net.snapshot()).expect("restore");

    assert_eq!(restored.learn_rate(), 0.3);
    assert_eq!(restored.momentum(), 0.1);
    let hidden = &restored.hidden_layers()[0];
    assert_eq!(hidden.act_type, ActivationKind::LeakyRelu);
    assert_eq!(hidden.act_parameter, 0.1);
    assert_eq!(restored.output_layer().act_type, ActivationKind::Sigmoid);
    assert!(restored
        .layers()
        .iter()
        .flat_map(|layer| &layer.neurons)
        .all(|n| n.bias_delta == 0.0));
}

#[test]
fn test_checkpoint_restores_network() {
    let samples = xor_samples();
    let mut net = Network::new(2, &[4], 1, &seeded(3)).expect("valid");
    train(&mut net, &samples, 20, None).expect("training");

    let dir = std::env::temp_dir().join("duonet_integration_checkpoint");
    let path = dir.join("xor.json");
    save_checkpoint(&net.snapshot(), &path).expect("save");
    let snapshot = load_checkpoint(&path).expect("load");
    let mut restored = Network::from_snapshot(&snapshot).expect("restore");

    for sample in &samples {
        let a = net.forward(&sample.inputs).expect("forward");
        let b = restored.forward(&sample.inputs).expect("forward");
        assert_abs_diff_eq!(a[0], b[0], epsilon = 1e-6);
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_invalid_configuration() {
    let mut config = seeded(0);
    config.learn_rate = 1.000_000_1;
    assert!(matches!(
        Network::new(2, &[2], 1, &config),
        Err(NetworkError::InvalidConfiguration(_))
    ));

    assert!(matches!(
        Network::from_sequential(
            &[Sequential::layer(2), Sequential::layer(1)],
            &seeded(0)
        ),
        Err(NetworkError::InvalidConfiguration(_))
    ));

    assert!(matches!(
        Network::new(2, &[], 1, &seeded(0)),
        Err(NetworkError::InvalidConfiguration(_))
    ));

    assert!(matches!(
        Network::new(2, &[3], 0, &seeded(0)),
        Err(NetworkError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_bad_input_length() {
    let mut net = Network::new(2, &[3], 1, &seeded(0)).expect("valid");
    assert!(matches!(
        net.forward(&arr1(&[1.0, 2.0, 3.0])),
        Err(NetworkError::DimensionMismatch {
            got: 3,
            expected: 2,
            ..
        })
    ));
}

#[test]
fn test_seed_makes_initialization_reproducible() {
    let a = Network::new(4, &[8], 2, &seeded(1234)).expect("valid");
    let b = Network::new(4, &[8], 2, &seeded(1234)).expect("valid");
    let c = Network::new(4, &[8], 2, &seeded(4321)).expect("valid");
    assert_eq!(a.snapshot(), b.snapshot());
    assert_ne!(a.snapshot(), c.snapshot());

    let bound = a
        .snapshot()
        .weights
        .iter()
        .flat_map(|w| w.iter().copied())
        .fold(0.0f32, |acc, w| acc.max(w.abs()));
    assert!(bound < 1.0);
}

/// y = x, derivative 1
struct Identity;

impl Activation for Identity {
    fn output(&self, x: f32, _parameter: f32) -> f32 {
        x
    }

    fn derivative(&self, _y: f32, _parameter: f32) -> f32 {
        1.0
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

#[test]
fn test_custom_activation() {
    let kind = ActivationKind::Custom(42);
    let records = [
        Sequential::layer(1),
        Sequential::activation(kind, None),
        Sequential::layer(2),
        Sequential::activation(kind, None),
        Sequential::layer(1),
    ];
    let mut registry = ActivationRegistry::new();
    registry
        .register(kind, Arc::new(Identity))
        .expect("custom code");

    let config = NetworkConfig {
        learn_rate: 0.05,
        momentum: 0.0,
        seed: Some(8),
        ..NetworkConfig::default()
    };
    let mut net = Network::with_registry(&records, &config, registry.clone()).expect("valid");

    // A linear network reproduces the weight products exactly.
    let snapshot = net.snapshot();
    let w0 = &snapshot.weights[0];
    let w1 = &snapshot.weights[1];
    let expected = w0[[0, 0]] * 2.0 * w1[[0, 0]] + w0[[0, 1]] * 2.0 * w1[[1, 0]];
    let output = net.forward(&arr1(&[2.0])).expect("forward");
    assert_abs_diff_eq!(output[0], expected, epsilon = 1e-5);

    let target = arr1(&[0.5]);
    let first = net.train_step(&arr1(&[1.0]), &target).expect("train");
    let mut last = first;
    for _ in 0..200 {
        last = net.train_step(&arr1(&[1.0]), &target).expect("train");
    }
    assert!(last < first);

    // Without the registry the kind cannot be evaluated.
    let unregistered: Array1<f32> = arr1(&[1.0]);
    assert!(matches!(
        net.snapshot()
            .quick_forward(&unregistered, &ActivationRegistry::new()),
        Err(NetworkError::UnrecognizedActivation(ActivationKind::Custom(42)))
    ));
    assert!(net.snapshot().quick_forward(&unregistered, &registry).is_ok());
}
