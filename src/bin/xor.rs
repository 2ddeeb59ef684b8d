//! XOR training demo.
//!
//! Trains a small network on the four XOR patterns, prints the learned
//! outputs and optionally writes a JSON checkpoint.

use clap::Parser;
use duonet::checkpoint::{load_checkpoint, save_checkpoint};
use duonet::training::{train, Sample};
use duonet::{ActivationRegistry, Network, NetworkConfig, SplitConfig};
use ndarray::arr1;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "duonet-xor", about = "Train a feed-forward network on XOR")]
struct Args {
    /// Hidden layer sizes
    #[arg(long, value_delimiter = ',', default_value = "6,6")]
    hidden: Vec<usize>,

    /// Learning rate
    #[arg(long, default_value_t = 0.02)]
    learn_rate: f32,

    /// Momentum
    #[arg(long, default_value_t = 0.75)]
    momentum: f32,

    /// Maximum number of epochs
    #[arg(long, default_value_t = 100_000)]
    epochs: usize,

    /// Stop once the epoch mean squared error drops below this
    #[arg(long, default_value_t = 0.01)]
    target_loss: f32,

    /// Seed for weight initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Split large layers across a background thread
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Write the trained network to this checkpoint file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Start from this checkpoint instead of random weights
    #[arg(long)]
    resume: Option<PathBuf>,
}

fn xor_samples() -> Vec<Sample> {
    [
        ([0.0, 0.0], 0.0),
        ([0.0, 1.0], 1.0),
        ([1.0, 0.0], 1.0),
        ([1.0, 1.0], 0.0),
    ]
    .iter()
    .map(|(inputs, target)| Sample::new(arr1(inputs), arr1(&[*target])))
    .collect()
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut net = if let Some(ref path) = args.resume {
        eprintln!("Resuming from checkpoint: {}", path.display());
        let snapshot = load_checkpoint(path).expect("Failed to load checkpoint");
        Network::from_snapshot(&snapshot).expect("Failed to restore network")
    } else {
        let config = NetworkConfig {
            learn_rate: args.learn_rate,
            momentum: args.momentum,
            split: SplitConfig::default(),
            seed: args.seed,
        };
        Network::new(2, &args.hidden, 1, &config).expect("Failed to create network")
    };
    net.set_parallel(args.parallel)
        .expect("Failed to start calculate thread");

    eprintln!("XOR training");
    eprintln!("  Network: {:?}", net.layer_sizes());
    eprintln!(
        "  Learn rate: {}, Momentum: {}",
        net.learn_rate(),
        net.momentum()
    );

    let samples = xor_samples();
    let start = Instant::now();
    let history = train(&mut net, &samples, args.epochs, Some(args.target_loss))
        .expect("Training failed");

    if let Some(last) = history.last() {
        eprintln!(
            "  Epochs: {}, final avg loss: {:.6}, max loss: {:.6} ({:.2?})",
            history.len(),
            last.avg_loss,
            last.max_loss,
            start.elapsed()
        );
    }

    let snapshot = net.snapshot();
    let registry = ActivationRegistry::new();
    for sample in &samples {
        let output = snapshot
            .quick_forward(&sample.inputs, &registry)
            .expect("Inference failed");
        println!(
            "{} xor {} = {:.4}",
            sample.inputs[0], sample.inputs[1], output[0]
        );
    }

    if let Some(ref path) = args.save {
        save_checkpoint(&snapshot, path).expect("Failed to save checkpoint");
        eprintln!("  Checkpoint: {}", path.display());
    }
}
