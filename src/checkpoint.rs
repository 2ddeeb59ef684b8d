//! Checkpoint save/load for network snapshots.
//!
//! Serializes a [`NetworkSnapshot`] to JSON. Activation kinds are stored as
//! their integer codes, weight matrices as one row per source neuron.

use crate::activation::ActivationKind;
use crate::core::{NetResult, NetworkError};
use crate::snapshot::NetworkSnapshot;
use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable checkpoint data.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointData {
    pub learn_rate: f32,
    pub momentum: f32,
    /// Network layer sizes, input first.
    pub layer_sizes: Vec<usize>,
    /// Activation per non-input layer.
    pub activations: Vec<(ActivationKind, f32)>,
    /// Weight matrices as nested Vec for serialization.
    pub weights: Vec<Vec<Vec<f32>>>,
    /// Bias vectors as nested Vec for serialization.
    pub biases: Vec<Vec<f32>>,
}

/// Convert an Array2 to Vec<Vec<f32>> for serialization.
fn array2_to_vecs(arr: &Array2<f32>) -> Vec<Vec<f32>> {
    arr.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Convert Vec<Vec<f32>> back to an Array2 with `ncols` columns.
///
/// The column count is passed in so that a matrix with zero rows keeps its
/// width.
fn vecs_to_array2(vecs: &[Vec<f32>], ncols: usize) -> NetResult<Array2<f32>> {
    let flat: Vec<f32> = vecs.iter().flat_map(|r| r.iter().copied()).collect();
    if vecs.iter().any(|row| row.len() != ncols) {
        return Err(NetworkError::Checkpoint(format!(
            "ragged weight matrix, expected {ncols} columns"
        )));
    }
    Array2::from_shape_vec((vecs.len(), ncols), flat).map_err(|e| {
        NetworkError::Checkpoint(format!("Failed to reconstruct weight matrix: {e}"))
    })
}

impl From<&NetworkSnapshot> for CheckpointData {
    fn from(snapshot: &NetworkSnapshot) -> Self {
        Self {
            learn_rate: snapshot.learn_rate,
            momentum: snapshot.momentum,
            layer_sizes: snapshot.layer_sizes.clone(),
            activations: snapshot.activations.clone(),
            weights: snapshot.weights.iter().map(array2_to_vecs).collect(),
            biases: snapshot.biases.iter().map(|b| b.to_vec()).collect(),
        }
    }
}

impl CheckpointData {
    /// Rebuild and validate the snapshot.
    ///
    /// # Errors
    /// `Checkpoint` for malformed matrices, plus anything
    /// [`NetworkSnapshot::validate`] reports.
    pub fn into_snapshot(self) -> NetResult<NetworkSnapshot> {
        let mut weights = Vec::with_capacity(self.weights.len());
        for (b, rows) in self.weights.iter().enumerate() {
            let ncols = self.layer_sizes.get(b + 1).copied().unwrap_or(0);
            weights.push(vecs_to_array2(rows, ncols)?);
        }

        let snapshot = NetworkSnapshot {
            learn_rate: self.learn_rate,
            momentum: self.momentum,
            layer_sizes: self.layer_sizes,
            activations: self.activations,
            biases: self.biases.into_iter().map(Array1::from).collect(),
            weights,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Save a snapshot to a JSON file, creating parent directories.
///
/// # Errors
///
/// Returns `Checkpoint` if the file cannot be written or the data cannot be serialized.
pub fn save_checkpoint(snapshot: &NetworkSnapshot, path: &Path) -> NetResult<()> {
    let data = CheckpointData::from(snapshot);

    let json = serde_json::to_string_pretty(&data)
        .map_err(|e| NetworkError::Checkpoint(format!("Failed to serialize checkpoint: {e}")))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            NetworkError::Checkpoint(format!("Failed to create checkpoint directory: {e}"))
        })?;
    }

    std::fs::write(path, json).map_err(|e| {
        NetworkError::Checkpoint(format!(
            "Failed to write checkpoint to {}: {e}",
            path.display()
        ))
    })?;
    debug!("checkpoint written to {}", path.display());
    Ok(())
}

/// Load a snapshot from a JSON file.
///
/// # Errors
///
/// Returns `Checkpoint` if the file cannot be read or parsed, and a shape
/// error if the stored network is inconsistent.
pub fn load_checkpoint(path: &Path) -> NetResult<NetworkSnapshot> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        NetworkError::Checkpoint(format!(
            "Failed to read checkpoint from {}: {e}",
            path.display()
        ))
    })?;

    let data: CheckpointData = serde_json::from_str(&json)
        .map_err(|e| NetworkError::Checkpoint(format!("Failed to parse checkpoint: {e}")))?;

    data.into_snapshot()
}
