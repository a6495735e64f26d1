use crate::{
    addr::LinkAddr,
    stats::{
        Metric, Reading, RecordMeta,
        arena::Key,
        meta::{MetaCodec, MetaError},
    },
};
use std::fmt;

/// Handle of a [`StatRecord`] in a [`StatsPool`].
///
/// The handle stays valid until the record is freed. A freed handle never
/// resolves again, even once its slot has been reused.
///
/// [`StatsPool`]: crate::stats::StatsPool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordHandle(pub(crate) Key);

/// Handle of an [`EnhancedRecord`] in a [`StatsPool`].
///
/// [`StatsPool`]: crate::stats::StatsPool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnhancedHandle(pub(crate) Key);

/// One configured measurement attached to a link.
///
/// Records of the same link form a chain through [`StatRecord::next`]. On
/// shared links a record also keeps one [`EnhancedRecord`] per sender it
/// heard from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRecord {
    meta: RecordMeta,
    reading: Reading,
    pub(crate) next: Option<RecordHandle>,
    pub(crate) enhanced: Option<EnhancedHandle>,
}

/// Per-sender reading of a [`StatRecord`] installed on a shared link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhancedRecord {
    target: LinkAddr,
    reading: Reading,
    pub(crate) next: Option<EnhancedHandle>,
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.index, self.0.generation)
    }
}

impl StatRecord {
    pub fn new(meta: RecordMeta) -> Self {
        Self {
            meta,
            reading: Reading::UNSAMPLED,
            next: None,
            enhanced: None,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    pub fn id(&self) -> Option<u16> {
        self.meta.id()
    }

    pub fn set_id(&mut self, id: Option<u16>) -> Result<(), MetaError> {
        self.meta.set_id(id)
    }

    pub fn metric(&self) -> Option<Metric> {
        self.meta.metric()
    }

    pub fn set_metric(&mut self, metric: Option<Metric>) {
        self.meta.set_metric(metric)
    }

    pub fn enabled(&self) -> bool {
        self.meta.enabled()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.meta.set_enabled(enabled)
    }

    pub fn window(&self) -> u16 {
        self.meta.window()
    }

    pub fn set_window(&mut self, window: u16) -> Result<(), MetaError> {
        self.meta.set_window(window)
    }

    /// the reported value, [`SENTINEL`] until the first sample
    ///
    /// [`SENTINEL`]: crate::stats::SENTINEL
    pub fn value(&self) -> u16 {
        self.reading.value
    }

    /// Overwrite the reported value.
    ///
    /// The running estimate is reset: the next sample starts a new average.
    pub fn set_value(&mut self, value: u16) {
        self.reading = Reading::with_value(value);
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub(crate) fn set_reading(&mut self, reading: Reading) {
        self.reading = reading;
    }

    pub fn is_sampled(&self) -> bool {
        self.reading.is_sampled()
    }

    /// the next record of the same link
    pub fn next(&self) -> Option<RecordHandle> {
        self.next
    }
}

impl EnhancedRecord {
    pub(crate) fn new(target: LinkAddr) -> Self {
        Self {
            target,
            reading: Reading::UNSAMPLED,
            next: None,
        }
    }

    /// the sender this reading is about
    pub fn target(&self) -> LinkAddr {
        self.target
    }

    pub fn value(&self) -> u16 {
        self.reading.value
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub(crate) fn set_reading(&mut self, reading: Reading) {
        self.reading = reading;
    }

    pub fn is_sampled(&self) -> bool {
        self.reading.is_sampled()
    }
}
