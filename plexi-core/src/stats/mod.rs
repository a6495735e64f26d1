//! Bounded store of per-link statistics.
//!
//! A [`StatsPool`] owns every [`StatRecord`] of the node. Records are
//! configured with a [`Metric`] and updated online by the [`EwmaUpdater`]
//! as packet events are reported.

mod arena;
mod ewma;
mod meta;
mod metric;
mod pool;
mod record;

pub use self::{
    ewma::{EwmaUpdater, Reading, Sample},
    meta::{MetaCodec, MetaError, PackedMeta, PlainMeta, RecordMeta, Storage},
    metric::{Metric, UnknownMetric},
    pool::{Chain, EnhancedChain, PoolExhausted, StatsPool},
    record::{EnhancedHandle, EnhancedRecord, RecordHandle, StatRecord},
};

/// Value of a record that has not been sampled yet.
///
/// It is the all-ones pattern: `u16::MAX` for the unsigned metrics and
/// `-1` for the signed RSSI.
pub const SENTINEL: u16 = u16::MAX;
