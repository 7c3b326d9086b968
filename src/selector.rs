//! Weighted variant selection
//!
//! Cumulative-weight sampling: draw `t` uniformly in `[0, total)` and return
//! the first variant whose running weight exceeds `t`. The walk order must be
//! the same order the total was summed in, so both happen in one pass over
//! the caller's slice.
//!
//! Two draw sources are provided:
//! - [`select`] takes any [`rand::Rng`]; the service passes `thread_rng()`
//! - [`select_stable`] derives the draw from a 64-bit FNV-1a hash of the
//!   experiment and user ids, for stateless deployments

use rand::Rng;

use crate::experiment::Variant;

/// Anything carrying a selection weight.
///
/// Negative weights are treated as zero.
pub trait Weighted {
    /// Raw weight of this entry.
    fn weight(&self) -> i64;
}

impl Weighted for Variant {
    fn weight(&self) -> i64 {
        i64::from(self.weight())
    }
}

impl<T> Weighted for (T, i64) {
    fn weight(&self) -> i64 {
        self.1
    }
}

fn clamped_weight<V: Weighted>(variant: &V) -> u64 {
    u64::try_from(variant.weight()).unwrap_or(0)
}

fn total_weight<V: Weighted>(variants: &[V]) -> u64 {
    variants.iter().map(clamped_weight).sum()
}

/// Walk `variants` and return the one whose cumulative weight first exceeds `t`.
fn pick_at<V: Weighted>(variants: &[V], t: u64) -> Option<&V> {
    let mut cumulative = 0u64;
    for variant in variants {
        cumulative += clamped_weight(variant);
        if t < cumulative {
            return Some(variant);
        }
    }
    variants.last()
}

/// Pick one variant with probability proportional to its weight.
///
/// If every weight is zero the pick is uniform over all variants. Returns
/// `None` only when `variants` is empty.
///
/// # Example
///
/// ```rust
/// use rand::{rngs::StdRng, SeedableRng};
/// use trueno_ab::selector::select;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let variants = [("A", 70_i64), ("B", 30)];
/// let chosen = select(&variants, &mut rng).unwrap();
/// assert!(chosen.0 == "A" || chosen.0 == "B");
/// ```
pub fn select<'a, V, R>(variants: &'a [V], rng: &mut R) -> Option<&'a V>
where
    V: Weighted,
    R: Rng + ?Sized,
{
    if variants.is_empty() {
        return None;
    }

    let total = total_weight(variants);
    if total == 0 {
        return variants.get(rng.gen_range(0..variants.len()));
    }

    pick_at(variants, rng.gen_range(0..total))
}

/// 64-bit FNV-1a.
#[must_use]
pub fn stable_hash(input: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    input.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

/// Pick a variant deterministically from the `(experiment, user)` pair.
///
/// The same ids and the same weighted list always give the same variant;
/// across many users the split follows the weights.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn select_stable<'a, V: Weighted>(
    variants: &'a [V],
    experiment_id: &str,
    user_id: &str,
) -> Option<&'a V> {
    if variants.is_empty() {
        return None;
    }

    let hash = stable_hash(&format!("{experiment_id}:{user_id}"));
    let total = total_weight(variants);
    if total == 0 {
        // The remainder is below len, so it fits in usize.
        return variants.get((hash % variants.len() as u64) as usize);
    }

    pick_at(variants, hash % total)
}
