//! # Range partitioner.
//!
//! Splits `[1, n]` into at most `workers` contiguous units:
//!
//! ```text
//! n = 10, workers = 4      chunk = floor(10 / 4) = 2
//!   unit 1: [1..=2]
//!   unit 2: [3..=4]
//!   unit 3: [5..=6]
//!   unit 4: [7..=10]        ← last unit absorbs the remainder
//! ```
//!
//! ## Rules
//! - Units are ordered by `start` ascending and numbered from 1.
//! - Ranges are contiguous and non-overlapping; their union is exactly `[1, n]`.
//! - The last unit always ends at `n`.
//! - When `n < workers` only `n` single-integer units are produced; there are
//!   never empty or inverted ranges.

use crate::error::CoordinatorError;
use crate::units::WorkUnit;

/// Splits `[1, n]` into ordered work units for `workers` executors.
///
/// # Errors
/// [`CoordinatorError::InvalidInput`] if `n < 1` or `workers < 1`.
///
/// # Example
/// ```
/// use rangefold::partition;
///
/// let units = partition(10, 4).unwrap();
/// let ranges: Vec<_> = units.iter().map(|u| (u.start(), u.end())).collect();
/// assert_eq!(ranges, vec![(1, 2), (3, 4), (5, 6), (7, 10)]);
/// ```
pub fn partition(n: u64, workers: u32) -> Result<Vec<WorkUnit>, CoordinatorError> {
    if n < 1 {
        return Err(CoordinatorError::invalid(format!("n must be >= 1, got {n}")));
    }
    if workers < 1 {
        return Err(CoordinatorError::invalid("worker count must be >= 1"));
    }

    let count = u64::from(workers).min(n);
    let chunk = n / count;
    let mut units = Vec::with_capacity(count as usize);
    let mut start = 1u64;

    for idx in 1..=count {
        let end = if idx == count { n } else { start + chunk - 1 };
        let unit = WorkUnit::new(idx as u32, start, end).ok_or_else(|| {
            CoordinatorError::invalid(format!("cannot form unit {idx} [{start}, {end}]"))
        })?;
        units.push(unit);
        start = end + 1;
    }
    Ok(units)
}
