//! Configuration fields of a statistics record and their two storage
//! encodings.
//!
//! A record's configuration (identifier, metric, enable flag and window)
//! can be kept as plain fields ([`PlainMeta`]) or packed in a single 16 bit
//! word ([`PackedMeta`]) on nodes where every byte counts. Both implement
//! [`MetaCodec`] so the rest of the crate does not care which one is used.

use crate::stats::Metric;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage encoding for the configuration of every record of a pool.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// one field per setting, no range limits beyond the field types
    #[default]
    Plain,
    /// all settings packed in a single `u16`
    Packed,
}

/// Error returned when a configuration value cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MetaError {
    #[error("Statistics id 0 is reserved")]
    ReservedId,
    #[error("Statistics id ({id}) out of range, maximum is {max}")]
    IdOutOfRange { id: u16, max: u16 },
    #[error("Statistics window ({window}) out of range, maximum is {max}")]
    WindowOutOfRange { window: u16, max: u16 },
}

/// Accessors and validated mutators for a record's configuration.
///
/// Mutators never corrupt the neighbouring fields: a value the encoding
/// cannot hold is rejected with a [`MetaError`] and the configuration is
/// left unchanged.
pub trait MetaCodec {
    fn id(&self) -> Option<u16>;
    fn set_id(&mut self, id: Option<u16>) -> Result<(), MetaError>;

    fn metric(&self) -> Option<Metric>;
    fn set_metric(&mut self, metric: Option<Metric>);

    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);

    fn window(&self) -> u16;
    fn set_window(&mut self, window: u16) -> Result<(), MetaError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlainMeta {
    id: Option<u16>,
    metric: Option<Metric>,
    enabled: bool,
    window: u16,
}

/// Bit layout, least significant first:
///
/// | bits   | field   |
/// |--------|---------|
/// | 0      | enable  |
/// | 1..=4  | metric  |
/// | 5..=9  | id      |
/// | 10..=15| window  |
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackedMeta(u16);

/// A record configuration in either encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMeta {
    Plain(PlainMeta),
    Packed(PackedMeta),
}

impl MetaCodec for PlainMeta {
    fn id(&self) -> Option<u16> {
        self.id
    }

    fn set_id(&mut self, id: Option<u16>) -> Result<(), MetaError> {
        if id == Some(0) {
            return Err(MetaError::ReservedId);
        }
        self.id = id;
        Ok(())
    }

    fn metric(&self) -> Option<Metric> {
        self.metric
    }

    fn set_metric(&mut self, metric: Option<Metric>) {
        self.metric = metric;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn window(&self) -> u16 {
        self.window
    }

    fn set_window(&mut self, window: u16) -> Result<(), MetaError> {
        self.window = window;
        Ok(())
    }
}

impl PackedMeta {
    const ENABLE_SHIFT: u16 = 0;
    const ENABLE_MASK: u16 = 0x1;
    const METRIC_SHIFT: u16 = 1;
    const METRIC_MASK: u16 = 0xF;
    const ID_SHIFT: u16 = 5;
    const ID_MASK: u16 = 0x1F;
    const WINDOW_SHIFT: u16 = 10;
    const WINDOW_MASK: u16 = 0x3F;

    /// largest identifier the packed encoding can hold
    pub const MAX_ID: u16 = Self::ID_MASK;
    /// largest window the packed encoding can hold
    pub const MAX_WINDOW: u16 = Self::WINDOW_MASK;

    /// the raw packed word
    pub const fn bits(self) -> u16 {
        self.0
    }

    const fn field(self, shift: u16, mask: u16) -> u16 {
        (self.0 >> shift) & mask
    }

    fn set_field(&mut self, shift: u16, mask: u16, value: u16) {
        debug_assert!(value <= mask);
        self.0 = (self.0 & !(mask << shift)) | ((value & mask) << shift);
    }
}

impl MetaCodec for PackedMeta {
    fn id(&self) -> Option<u16> {
        match self.field(Self::ID_SHIFT, Self::ID_MASK) {
            0 => None,
            id => Some(id),
        }
    }

    fn set_id(&mut self, id: Option<u16>) -> Result<(), MetaError> {
        let raw = match id {
            None => 0,
            Some(0) => return Err(MetaError::ReservedId),
            Some(id) if id > Self::MAX_ID => {
                return Err(MetaError::IdOutOfRange {
                    id,
                    max: Self::MAX_ID,
                });
            }
            Some(id) => id,
        };
        self.set_field(Self::ID_SHIFT, Self::ID_MASK, raw);
        Ok(())
    }

    fn metric(&self) -> Option<Metric> {
        Metric::from_code(self.field(Self::METRIC_SHIFT, Self::METRIC_MASK) as u8)
    }

    fn set_metric(&mut self, metric: Option<Metric>) {
        let code = metric.map_or(Metric::NONE_CODE, Metric::code);
        self.set_field(Self::METRIC_SHIFT, Self::METRIC_MASK, u16::from(code));
    }

    fn enabled(&self) -> bool {
        self.field(Self::ENABLE_SHIFT, Self::ENABLE_MASK) == 1
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.set_field(Self::ENABLE_SHIFT, Self::ENABLE_MASK, u16::from(enabled));
    }

    fn window(&self) -> u16 {
        self.field(Self::WINDOW_SHIFT, Self::WINDOW_MASK)
    }

    fn set_window(&mut self, window: u16) -> Result<(), MetaError> {
        if window > Self::MAX_WINDOW {
            return Err(MetaError::WindowOutOfRange {
                window,
                max: Self::MAX_WINDOW,
            });
        }
        self.set_field(Self::WINDOW_SHIFT, Self::WINDOW_MASK, window);
        Ok(())
    }
}

impl RecordMeta {
    /// a blank configuration (no id, no metric, disabled, window 0)
    pub fn new(storage: Storage) -> Self {
        match storage {
            Storage::Plain => Self::Plain(PlainMeta::default()),
            Storage::Packed => Self::Packed(PackedMeta::default()),
        }
    }

    pub fn storage(&self) -> Storage {
        match self {
            Self::Plain(_) => Storage::Plain,
            Self::Packed(_) => Storage::Packed,
        }
    }

    fn codec(&self) -> &dyn MetaCodec {
        match self {
            Self::Plain(meta) => meta,
            Self::Packed(meta) => meta,
        }
    }

    fn codec_mut(&mut self) -> &mut dyn MetaCodec {
        match self {
            Self::Plain(meta) => meta,
            Self::Packed(meta) => meta,
        }
    }
}

impl MetaCodec for RecordMeta {
    fn id(&self) -> Option<u16> {
        self.codec().id()
    }

    fn set_id(&mut self, id: Option<u16>) -> Result<(), MetaError> {
        self.codec_mut().set_id(id)
    }

    fn metric(&self) -> Option<Metric> {
        self.codec().metric()
    }

    fn set_metric(&mut self, metric: Option<Metric>) {
        self.codec_mut().set_metric(metric)
    }

    fn enabled(&self) -> bool {
        self.codec().enabled()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.codec_mut().set_enabled(enabled)
    }

    fn window(&self) -> u16 {
        self.codec().window()
    }

    fn set_window(&mut self, window: u16) -> Result<(), MetaError> {
        self.codec_mut().set_window(window)
    }
}
