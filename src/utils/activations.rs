//! Activation helpers shared by the loss stage and tests.

/// Softmax applied in-place to a single logit vector.
///
/// Uses the max-subtraction trick for numerical stability, so very large
/// logits do not overflow `exp`.
pub fn softmax_inplace(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }

    let mut max_value = values[0];
    for &value in values.iter().skip(1) {
        if value > max_value {
            max_value = value;
        }
    }

    let mut sum = 0.0f32;
    for value in values.iter_mut() {
        *value = (*value - max_value).exp();
        sum += *value;
    }

    let inv_sum = 1.0f32 / sum;
    for value in values.iter_mut() {
        *value *= inv_sum;
    }
}
