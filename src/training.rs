//! Epoch-level training loop
//!
//! Shuffles the training set each epoch, walks it in mini-batches, then
//! evaluates accuracy on the held-out set. Per-epoch results are printed and
//! optionally appended to a loss log for plotting.

use std::io::Write;
use std::time::Instant;

use crate::data::Dataset;
use crate::error::NetworkError;
use crate::network::Network;
use crate::utils::SimpleRng;

/// Result of one training epoch.
#[derive(Debug, Clone, Copy)]
pub struct EpochSummary {
    pub epoch: usize,
    /// Mean cross-entropy loss over the training set.
    pub mean_loss: f32,
    /// Fraction of held-out samples classified correctly, in `[0, 1]`.
    pub accuracy: f32,
    pub seconds: f64,
}

/// Classification accuracy of the network over a dataset.
pub fn evaluate(net: &mut Network, data: &Dataset) -> Result<f32, NetworkError> {
    if data.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0usize;
    for (image, &label) in data.images.iter().zip(&data.labels) {
        if net.predict(image)? == label as usize {
            correct += 1;
        }
    }
    Ok(correct as f32 / data.len() as f32)
}

/// Train for `epochs` full passes over `train`, evaluating on `test` after
/// each one.
///
/// The visit order is reshuffled every epoch from the shared generator, so a
/// fixed seed reproduces the entire run. The final batch of an epoch may be
/// shorter than `batch_size`; its update divides by the actual length. A
/// `batch_size` of zero is rejected as `EmptyBatch`. When `log` is given,
/// each epoch appends one `epoch,loss,accuracy` line.
pub fn train_epoch_loop(
    net: &mut Network,
    train: &Dataset,
    test: &Dataset,
    epochs: usize,
    batch_size: usize,
    rng: &mut SimpleRng,
    mut log: Option<&mut dyn Write>,
) -> Result<Vec<EpochSummary>, NetworkError> {
    if batch_size == 0 {
        return Err(NetworkError::EmptyBatch);
    }

    let mut order: Vec<usize> = (0..train.len()).collect();
    let mut summaries = Vec::with_capacity(epochs);

    for epoch in 1..=epochs {
        let start = Instant::now();
        rng.shuffle_usize(&mut order);

        let mut loss_sum = 0.0f64;
        for batch_idx in order.chunks(batch_size) {
            let mean = net.train_batch(&train.images, &train.labels, batch_idx)?;
            loss_sum += mean as f64 * batch_idx.len() as f64;
        }
        let mean_loss = (loss_sum / train.len() as f64) as f32;

        let accuracy = evaluate(net, test)?;
        let seconds = start.elapsed().as_secs_f64();

        println!(
            "Epoch {:2} | loss={:.4} | test_acc={:.2}% | time={:.1}s",
            epoch,
            mean_loss,
            accuracy * 100.0,
            seconds
        );
        if let Some(writer) = log.as_deref_mut() {
            // Log failures must not abort a long training run.
            writeln!(writer, "{},{:.6},{:.6}", epoch, mean_loss, accuracy).ok();
        }

        summaries.push(EpochSummary {
            epoch,
            mean_loss,
            accuracy,
            seconds,
        });
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;

    fn tiny_dataset(rng: &mut SimpleRng, n: usize) -> Dataset {
        let images = (0..n)
            .map(|_| Tensor::random_uniform(&[1, 28, 28], 0.0, 1.0, rng))
            .collect();
        let labels = (0..n).map(|i| (i % 10) as u8).collect();
        Dataset { images, labels }
    }

    #[test]
    fn test_epoch_loop_produces_summaries() {
        let mut rng = SimpleRng::new(42);
        let mut net = Network::mlp(0.01, &mut rng);
        let train = tiny_dataset(&mut rng, 8);
        let test = tiny_dataset(&mut rng, 4);

        let summaries =
            train_epoch_loop(&mut net, &train, &test, 2, 3, &mut rng, None).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].epoch, 1);
        assert_eq!(summaries[1].epoch, 2);
        for s in &summaries {
            assert!(s.mean_loss.is_finite());
            assert!((0.0..=1.0).contains(&s.accuracy));
        }
    }

    #[test]
    fn test_epoch_loop_writes_log_lines() {
        let mut rng = SimpleRng::new(7);
        let mut net = Network::mlp(0.05, &mut rng);
        let train = tiny_dataset(&mut rng, 4);
        let test = tiny_dataset(&mut rng, 2);

        let mut log = Vec::new();
        train_epoch_loop(&mut net, &train, &test, 3, 2, &mut rng, Some(&mut log)).unwrap();

        let text = String::from_utf8(log).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().next().unwrap().starts_with("1,"));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let mut rng = SimpleRng::new(5);
        let mut net = Network::mlp(0.01, &mut rng);
        let train = tiny_dataset(&mut rng, 4);
        let test = tiny_dataset(&mut rng, 2);

        let err = train_epoch_loop(&mut net, &train, &test, 1, 0, &mut rng, None).unwrap_err();
        assert_eq!(err, NetworkError::EmptyBatch);
    }

    #[test]
    fn test_evaluate_on_empty_dataset() {
        let mut rng = SimpleRng::new(1);
        let mut net = Network::mlp(0.01, &mut rng);
        let empty = Dataset {
            images: vec![],
            labels: vec![],
        };
        assert_eq!(evaluate(&mut net, &empty).unwrap(), 0.0);
    }

    #[test]
    fn test_training_reduces_loss_on_tiny_set() {
        // Repeatedly fitting the same handful of samples must drive the
        // training loss down.
        let mut rng = SimpleRng::new(3);
        let mut net = Network::mlp(0.1, &mut rng);
        let train = tiny_dataset(&mut rng, 4);
        let test = tiny_dataset(&mut rng, 2);

        let summaries =
            train_epoch_loop(&mut net, &train, &test, 30, 4, &mut rng, None).unwrap();

        let first = summaries.first().unwrap().mean_loss;
        let last = summaries.last().unwrap().mean_loss;
        assert!(
            last < first,
            "loss did not decrease: {} -> {}",
            first,
            last
        );
    }

    #[test]
    fn test_same_seed_reproduces_run() {
        let train_seed = 99;
        let run = |seed: u64| {
            let mut rng = SimpleRng::new(seed);
            let mut net = Network::mlp(0.05, &mut rng);
            let mut data_rng = SimpleRng::new(train_seed);
            let train = tiny_dataset(&mut data_rng, 6);
            let test = tiny_dataset(&mut data_rng, 3);
            train_epoch_loop(&mut net, &train, &test, 2, 2, &mut rng, None).unwrap()
        };

        let a = run(42);
        let b = run(42);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.mean_loss, y.mean_loss);
            assert_eq!(x.accuracy, y.accuracy);
        }
    }
}
