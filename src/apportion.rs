//! Weight apportionment (largest-remainder / Hamilton method)
//!
//! Keeps a variant weight set summing to exactly [`TOTAL_WEIGHT`] while an
//! operator edits it, using integers only.
//!
//! ## Rounding
//!
//! Each element's proportional share is floored, then the leftover units are
//! handed out one at a time to the elements with the largest fractional
//! remainder. Ties go to the lower index, so the result is deterministic.
//!
//! ## Example
//!
//! ```rust
//! use trueno_ab::apportion::{rebalance_even, rebalance_locked};
//!
//! assert_eq!(rebalance_even(&[1.0, 1.0, 1.0]), vec![34, 33, 33]);
//! assert_eq!(rebalance_locked(&[50.0, 50.0], 0, 70.0), vec![70, 30]);
//! ```

/// Sum every persisted variant set must reach.
pub const TOTAL_WEIGHT: u32 = 100;

/// Coerce an editor-supplied weight into `[0, 100]`.
///
/// Negative and non-finite values become zero.
#[must_use]
pub fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() {
        weight.clamp(0.0, f64::from(TOTAL_WEIGHT))
    } else {
        0.0
    }
}

/// Round and clamp a directly edited value to an integer weight.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_weight(value: f64) -> u32 {
    // sanitize_weight bounds the value to [0, 100], so the cast is exact.
    sanitize_weight(value).round() as u32
}

/// Fixed-point scale for weights; sanitized weights fit in `u64` with room.
const SCALE: f64 = 1e6;

/// Distribute `total` units across `weights` proportionally.
///
/// Zero-sum input is split equally. The result always has the same length as
/// `weights` and sums to `total` (or is empty for empty input).
///
/// Weights are converted to fixed-point integers first, so equal remainders
/// compare equal and the lower index wins.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn distribute(weights: &[f64], total: u32) -> Vec<u32> {
    if weights.is_empty() {
        return Vec::new();
    }
    if total == 0 {
        return vec![0; weights.len()];
    }

    // sanitize_weight bounds each value to [0, 100], so the cast is exact.
    let mut fixed: Vec<u64> = weights
        .iter()
        .map(|w| (sanitize_weight(*w) * SCALE).round() as u64)
        .collect();
    if fixed.iter().all(|w| *w == 0) {
        fixed.fill(1);
    }
    let current: u64 = fixed.iter().sum();
    let total_units = u64::from(total);

    let mut result = Vec::with_capacity(fixed.len());
    let mut remainders = Vec::with_capacity(fixed.len());
    for (index, w) in fixed.iter().enumerate() {
        let scaled = w * total_units;
        // floor(share) <= total, so it fits in u32.
        result.push((scaled / current) as u32);
        remainders.push((index, scaled % current));
    }

    let assigned: u32 = result.iter().sum();
    let leftover = total.saturating_sub(assigned) as usize;

    // Stable sort keeps index order among equal remainders.
    remainders.sort_by(|a, b| b.1.cmp(&a.1));

    for (index, _) in remainders.iter().cycle().take(leftover) {
        result[*index] += 1;
    }

    result
}

/// Re-derive the whole set after its shape changed (add, remove, reset).
///
/// - empty input returns an empty vector
/// - a single element receives all 100
/// - otherwise shares are proportional to the current weights
#[must_use]
pub fn rebalance_even(weights: &[f64]) -> Vec<u32> {
    distribute(weights, TOTAL_WEIGHT)
}

/// Pin `locked_index` to `new_value` and spread the complement over the rest.
///
/// The other elements keep their relative proportions (equal split if they
/// are all zero). With no other elements, the locked element just receives
/// `new_value` and the sum may be below 100; callers enforce the two-variant
/// minimum before saving. An out-of-range `locked_index` falls back to
/// [`rebalance_even`].
#[must_use]
pub fn rebalance_locked(weights: &[f64], locked_index: usize, new_value: f64) -> Vec<u32> {
    if locked_index >= weights.len() {
        return rebalance_even(weights);
    }

    let target = clamp_weight(new_value);
    let others: Vec<f64> = weights
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != locked_index)
        .map(|(_, w)| *w)
        .collect();

    let mut redistributed = distribute(&others, TOTAL_WEIGHT - target).into_iter();

    (0..weights.len())
        .map(|index| {
            if index == locked_index {
                target
            } else {
                redistributed.next().unwrap_or(0)
            }
        })
        .collect()
}
