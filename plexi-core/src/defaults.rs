use crate::stats::Storage;

/// Default capacity of the [`StatsPool`]
///
/// This is the number of statistics records a node can hold, shared by
/// all of its links. Per-sender readings of shared links come from a
/// second pool of the same size.
///
/// ```
/// # use plexi_core::defaults::*;
/// assert_eq!(DEFAULT_MAX_STATISTICS, 2);
/// ```
///
/// [`StatsPool`]: crate::stats::StatsPool
pub const DEFAULT_MAX_STATISTICS: usize = 2;

/// Default size of the block-wise reassembly buffers, in bytes
///
/// A write whose payload grows past this size is rejected.
///
/// ```
/// # use plexi_core::defaults::*;
/// assert_eq!(DEFAULT_MAX_PAYLOAD, 256);
/// ```
pub const DEFAULT_MAX_PAYLOAD: usize = 256;

/// Default encoding of the statistics records configuration
///
/// ```
/// # use plexi_core::{defaults::*, stats::Storage};
/// assert_eq!(DEFAULT_STORAGE, Storage::Plain);
/// ```
pub const DEFAULT_STORAGE: Storage = Storage::Plain;
