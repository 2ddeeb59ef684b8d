//! Closed-form checks for the built-in activations and their dispatch.

use approx::assert_abs_diff_eq;
use duonet::activation::DEFAULT_LEAKY_SLOPE;
use duonet::{ActivationKind, ActivationRegistry, NetworkError};

#[test]
fn test_sigmoid_closed_forms() {
    let registry = ActivationRegistry::new();
    let sigmoid = registry.resolve(ActivationKind::Sigmoid).unwrap();

    assert_abs_diff_eq!(sigmoid.output(0.0, 0.0), 0.5, epsilon = 1e-7);
    assert_abs_diff_eq!(sigmoid.output(2.0, 0.0), 0.880_797, epsilon = 1e-6);
    // derivative at the activated value
    assert_abs_diff_eq!(sigmoid.derivative(0.5, 0.0), 0.25, epsilon = 1e-7);
}

#[test]
fn test_sigmoid_saturation_is_exact() {
    let registry = ActivationRegistry::new();
    let sigmoid = registry.resolve(ActivationKind::Sigmoid).unwrap();

    assert_eq!(sigmoid.output(-45.0, 0.0), 0.0);
    assert_eq!(sigmoid.output(-1000.0, 0.0), 0.0);
    assert_eq!(sigmoid.output(45.0, 0.0), 1.0);
    assert_eq!(sigmoid.output(f32::MAX, 0.0), 1.0);
    assert!(sigmoid.output(-44.9, 0.0) > 0.0);
}

#[test]
fn test_softsign_closed_forms() {
    let registry = ActivationRegistry::new();
    let softsign = registry.resolve(ActivationKind::Softsign).unwrap();

    assert_abs_diff_eq!(softsign.output(0.5, 0.0), 1.0 / 3.0, epsilon = 1e-7);
    assert_abs_diff_eq!(softsign.output(-3.0, 0.0), -0.75, epsilon = 1e-7);
    // 1 / (1 + |y|)^2 at y = 0.5
    assert_abs_diff_eq!(softsign.derivative(0.5, 0.0), 4.0 / 9.0, epsilon = 1e-7);
}

#[test]
fn test_rectifiers() {
    let registry = ActivationRegistry::new();
    let leaky = registry.resolve(ActivationKind::LeakyRelu).unwrap();
    let relu = registry.resolve(ActivationKind::Relu).unwrap();

    assert_abs_diff_eq!(leaky.output(-1.0, DEFAULT_LEAKY_SLOPE), -0.02, epsilon = 1e-7);
    assert_abs_diff_eq!(leaky.derivative(-1.0, 0.02), 0.02, epsilon = 1e-7);
    assert_eq!(leaky.output(3.0, 0.02), 3.0);
    assert_eq!(leaky.derivative(0.0, 0.02), 1.0);

    assert_eq!(relu.output(-2.0, 0.0), 0.0);
    assert_eq!(relu.output(2.0, 0.0), 2.0);
    assert_eq!(relu.derivative(0.0, 0.0), 1.0);
    assert_eq!(relu.derivative(-0.1, 0.0), 0.0);
}

#[test]
fn test_unknown_kinds_are_rejected() {
    let registry = ActivationRegistry::new();
    assert!(matches!(
        registry.resolve(ActivationKind::Input),
        Err(NetworkError::UnrecognizedActivation(ActivationKind::Input))
    ));
    assert!(matches!(
        registry.output(ActivationKind::Custom(100), 1.0, 0.0),
        Err(NetworkError::UnrecognizedActivation(ActivationKind::Custom(100)))
    ));
}

#[test]
fn test_kind_codes_are_stable() {
    let kinds = [
        (ActivationKind::Input, 1),
        (ActivationKind::LeakyRelu, 2),
        (ActivationKind::Relu, 3),
        (ActivationKind::Sigmoid, 4),
        (ActivationKind::Softsign, 5),
        (ActivationKind::Custom(17), 17),
    ];
    for (kind, code) in kinds {
        assert_eq!(kind.code(), code);
        assert_eq!(ActivationKind::from_code(code), kind);
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, code.to_string());
    }
}
