//! Training loops and metrics.

use crate::core::{NetResult, Network, NetworkError};
use crate::utils;
use log::debug;
use ndarray::Array1;

/// One input vector with its expected output.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub inputs: Array1<f32>,
    pub targets: Array1<f32>,
}

impl Sample {
    pub fn new(inputs: Array1<f32>, targets: Array1<f32>) -> Self {
        Self { inputs, targets }
    }
}

/// Per-epoch loss summary.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    /// Mean of the per-sample MSE
    pub avg_loss: f32,
    /// Worst per-sample MSE
    pub max_loss: f32,
    pub samples: usize,
}

fn require_samples(samples: &[Sample]) -> NetResult<()> {
    if samples.is_empty() {
        return Err(NetworkError::InvalidConfiguration(
            "sample set is empty".to_string(),
        ));
    }
    Ok(())
}

/// Run one `train_step` per sample, in order.
///
/// # Errors
/// `InvalidConfiguration` for an empty sample set; any error from
/// [`Network::train_step`] aborts the epoch.
pub fn train_epoch(net: &mut Network, samples: &[Sample], epoch: usize) -> NetResult<EpochMetrics> {
    require_samples(samples)?;
    let mut total = 0.0f32;
    let mut max_loss = 0.0f32;
    for sample in samples {
        let loss = net.train_step(&sample.inputs, &sample.targets)?;
        total += loss;
        max_loss = max_loss.max(loss);
    }
    Ok(EpochMetrics {
        epoch,
        avg_loss: total / samples.len() as f32,
        max_loss,
        samples: samples.len(),
    })
}

/// Train for up to `epochs` epochs, stopping early once the epoch's mean
/// loss drops below `target_loss`.
///
/// Returns the metrics of every epoch that ran.
///
/// # Errors
/// See [`train_epoch`].
pub fn train(
    net: &mut Network,
    samples: &[Sample],
    epochs: usize,
    target_loss: Option<f32>,
) -> NetResult<Vec<EpochMetrics>> {
    require_samples(samples)?;
    let mut history = Vec::with_capacity(epochs.min(1024));
    for epoch in 0..epochs {
        let metrics = train_epoch(net, samples, epoch)?;
        let converged = target_loss.is_some_and(|target| metrics.avg_loss < target);
        if converged {
            debug!(
                "converged at epoch {epoch} with avg loss {:.6}",
                metrics.avg_loss
            );
        }
        history.push(metrics);
        if converged {
            break;
        }
    }
    Ok(history)
}

/// Mean per-sample MSE of the current network, without updating it.
///
/// # Errors
/// `InvalidConfiguration` for an empty sample set, plus anything
/// [`Network::forward`] returns.
pub fn evaluate(net: &mut Network, samples: &[Sample]) -> NetResult<f32> {
    require_samples(samples)?;
    let mut total = 0.0f32;
    for sample in samples {
        let outputs = net.forward(&sample.inputs)?;
        total += utils::mse_loss(outputs.view(), sample.targets.view())?;
    }
    Ok(total / samples.len() as f32)
}
