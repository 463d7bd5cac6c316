//! Channel numbering
//!
//! velveth tells repeated channels of one family apart by a suffix on the
//! type flag: `-shortPaired`, `-shortPaired2`, `-shortPaired3`, ... in
//! declaration order. The counters live in a value threaded through a fold
//! over one channel list, so numbering never depends on earlier calls.

use crate::channel::{ChannelSpec, ReadFamily};
use crate::error::{Result, VelvetError};

/// Occurrences seen so far, per family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FamilyCounters {
    seen: [usize; 4],
    reference: bool,
}

impl FamilyCounters {
    /// Occurrences of `family` counted so far
    pub fn count(&self, family: ReadFamily) -> usize {
        self.seen[family.index()]
    }

    /// Counters after one more `family` channel, and that channel's 1-based occurrence
    pub fn advance(self, family: ReadFamily) -> (Self, usize) {
        let mut next = self;
        next.seen[family.index()] += 1;
        (next, next.count(family))
    }
}

/// Suffix for the n-th occurrence (1-based): none, then `2`, `3`, ...
pub fn suffix(occurrence: usize) -> String {
    if occurrence <= 1 {
        String::new()
    } else {
        occurrence.to_string()
    }
}

/// A validated channel with its resolved velveth type flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedChannel {
    /// Type flag including the leading dash, e.g. `-shortPaired2`
    pub flag: String,
    /// The channel
    pub channel: ChannelSpec,
}

/// Assign type flags to channels in declaration order
///
/// # Errors
/// - `DuplicateReferenceChannel` on a second reference channel
/// - `TooManyChannels` when a family exceeds `max_categories`
pub fn resolve_numbering(channels: Vec<ChannelSpec>, max_categories: usize) -> Result<Vec<NumberedChannel>> {
    let capacity = channels.len();
    let (_, numbered) = channels.into_iter().enumerate().try_fold(
        (FamilyCounters::default(), Vec::with_capacity(capacity)),
        |(counters, mut numbered), (index, channel)| {
            let (counters, flag) = match channel.family() {
                None => {
                    if counters.reference {
                        return Err(VelvetError::DuplicateReferenceChannel { channel: index });
                    }
                    (FamilyCounters { reference: true, ..counters }, "-reference".to_string())
                }
                Some(family) => {
                    let (counters, occurrence) = counters.advance(family);
                    if occurrence > max_categories {
                        return Err(VelvetError::TooManyChannels {
                            channel: index,
                            family: family.base_flag(),
                            max: max_categories,
                        });
                    }
                    (counters, format!("-{}{}", family.base_flag(), suffix(occurrence)))
                }
            };
            numbered.push(NumberedChannel { flag, channel });
            Ok((counters, numbered))
        },
    )?;
    Ok(numbered)
}
