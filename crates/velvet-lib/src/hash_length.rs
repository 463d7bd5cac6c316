//! Hash-length normalization
//!
//! velveth accepts either a single k-mer length or a sweep `m,M,step`
//! (M exclusive). Values above the build's maximum are clamped to it, then
//! even values are decremented. The clamp runs first, matching the order
//! of velveth's own checks, so an even maximum (e.g. 32) still ends odd.

use crate::constants::is_valid_hash_length;
use crate::error::{Result, VelvetError};
use serde::{Deserialize, Serialize};

/// A k-mer length or a sweep of k-mer lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashLengthRepr", into = "HashLengthRepr")]
pub enum HashLength {
    /// One k-mer length
    Single(i64),
    /// Every k in `min, min + step, ...` strictly below `max`
    Range {
        /// First k
        min: i64,
        /// Exclusive upper bound
        max: i64,
        /// Increment between consecutive k (even)
        step: i64,
    },
}

/// Wire form: an integer or a `[m, M, step]` triple
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum HashLengthRepr {
    Single(i64),
    Triple(i64, i64, i64),
}

impl From<HashLengthRepr> for HashLength {
    fn from(repr: HashLengthRepr) -> Self {
        match repr {
            HashLengthRepr::Single(k) => HashLength::Single(k),
            HashLengthRepr::Triple(min, max, step) => HashLength::Range { min, max, step },
        }
    }
}

impl From<HashLength> for HashLengthRepr {
    fn from(hash_length: HashLength) -> Self {
        match hash_length {
            HashLength::Single(k) => HashLengthRepr::Single(k),
            HashLength::Range { min, max, step } => HashLengthRepr::Triple(min, max, step),
        }
    }
}

/// Clamp then parity-fix a single value
///
/// # Errors
/// `InvalidHashLength` if `k` is not positive.
pub fn normalize_value(k: i64, max_kmer_length: u32) -> Result<i64> {
    if k <= 0 {
        return Err(VelvetError::InvalidHashLength(format!(
            "hash length must be positive, got {k}"
        )));
    }
    let clamped = k.min(i64::from(max_kmer_length));
    let normalized = if clamped % 2 == 0 { clamped - 1 } else { clamped };
    if normalized <= 0 || !is_valid_hash_length(normalized as u32, max_kmer_length) {
        return Err(VelvetError::InvalidHashLength(format!(
            "hash length {k} normalizes to {normalized}"
        )));
    }
    Ok(normalized)
}

impl HashLength {
    /// Apply the clamp and parity rules
    ///
    /// The result is a fixed point: normalizing it again returns it unchanged.
    pub fn normalize(self, max_kmer_length: u32) -> Result<Self> {
        match self {
            HashLength::Single(k) => Ok(HashLength::Single(normalize_value(k, max_kmer_length)?)),
            HashLength::Range { min, max, step } => {
                if step <= 0 || step % 2 != 0 {
                    return Err(VelvetError::InvalidHashLength(format!(
                        "sweep step must be positive and even, got {step}"
                    )));
                }
                let min = normalize_value(min, max_kmer_length)?;
                let max = normalize_value(max, max_kmer_length)?;
                if min >= max {
                    return Err(VelvetError::InvalidHashLength(format!(
                        "sweep needs m < M after normalization, got {min},{max}"
                    )));
                }
                Ok(HashLength::Range { min, max, step })
            }
        }
    }

    /// The token passed to velveth: `k` or `m,M,step`
    pub fn token(&self) -> String {
        match self {
            HashLength::Single(k) => k.to_string(),
            HashLength::Range { min, max, step } => format!("{min},{max},{step}"),
        }
    }

    /// The k values velveth will hash, in order
    pub fn kmer_values(&self) -> Vec<i64> {
        match *self {
            HashLength::Single(k) => vec![k],
            HashLength::Range { min, max, step } if step > 0 => {
                (min..max).step_by(step as usize).collect()
            }
            HashLength::Range { .. } => Vec::new(),
        }
    }

    /// True for the `m,M,step` form
    pub fn is_sweep(&self) -> bool {
        matches!(self, HashLength::Range { .. })
    }
}
