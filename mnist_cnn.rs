// mnist_cnn.rs
// Trains the convolutional pipeline (conv 3x3 -> ReLU -> 2x2 maxpool -> FC)
// on MNIST with mini-batch SGD.
//
// Expected files under the configured data_dir:
//   train-images.idx3-ubyte
//   train-labels.idx1-ubyte
//   t10k-images.idx3-ubyte
//   t10k-labels.idx1-ubyte
//
// Output:
//   - logs/training_loss_cnn.txt (epoch,loss,accuracy)
//   - per-epoch loss and test accuracy on stdout
//
// Usage: mnist_cnn [config.json]

use std::error::Error;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use std::process;

use mnist_backprop::config::{load_config, TrainingConfig};
use mnist_backprop::data::load_dataset;
use mnist_backprop::network::Network;
use mnist_backprop::training::train_epoch_loop;
use mnist_backprop::utils::SimpleRng;

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(path)?,
        None => TrainingConfig::default(),
    };

    let data_dir = Path::new(&config.data_dir);
    println!("Loading MNIST from {}...", data_dir.display());
    let train = load_dataset(
        data_dir.join("train-images.idx3-ubyte"),
        data_dir.join("train-labels.idx1-ubyte"),
    )?;
    let test = load_dataset(
        data_dir.join("t10k-images.idx3-ubyte"),
        data_dir.join("t10k-labels.idx1-ubyte"),
    )?;
    println!("  train: {} samples, test: {} samples", train.len(), test.len());

    let mut rng = SimpleRng::new(config.seed);
    let mut net = Network::cnn(config.learning_rate, &mut rng);
    println!(
        "CNN: {} parameters, lr={}, batch={}, epochs={}",
        net.parameter_count(),
        config.learning_rate,
        config.batch_size,
        config.epochs
    );

    fs::create_dir_all("logs")?;
    let log_file = File::create("logs/training_loss_cnn.txt")?;
    let mut log = BufWriter::new(log_file);

    let summaries = train_epoch_loop(
        &mut net,
        &train,
        &test,
        config.epochs,
        config.batch_size,
        &mut rng,
        Some(&mut log),
    )?;

    if let Some(last) = summaries.last() {
        println!("Final test accuracy: {:.2}%", last.accuracy * 100.0);
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    }
}
