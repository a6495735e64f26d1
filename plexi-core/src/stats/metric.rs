use std::{fmt, str::FromStr};
use thiserror::Error;

/// The performance metric a [`StatRecord`] measures.
///
/// Each metric has a numeric code that fits in 4 bits (code `0` is kept
/// for "no metric") and a short lower case label used on the management
/// interface.
///
/// ```
/// use plexi_core::stats::Metric;
///
/// let etx: Metric = "etx".parse().unwrap();
/// assert_eq!(etx, Metric::Etx);
/// assert_eq!(etx.code(), 12);
/// assert_eq!(etx.to_string(), "etx");
/// ```
///
/// [`StatRecord`]: crate::stats::StatRecord
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Metric {
    /// Packet delivery ratio, in percent, derived from the ETX estimate.
    Pdr = 11,
    /// Expected transmission count, in 1/256th of a transmission.
    Etx = 12,
    /// Received signal strength, signed dBm.
    Rssi = 13,
    /// Link quality indicator as reported by the radio.
    Lqi = 14,
    /// Low 16 bits of the absolute slot number of the last reception.
    Asn = 15,
}

/// Error returned when a metric label or code is not known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown metric ({label})")]
pub struct UnknownMetric {
    label: String,
}

impl Metric {
    /// every known metric, in code order
    pub const ALL: [Self; 5] = [Self::Pdr, Self::Etx, Self::Rssi, Self::Lqi, Self::Asn];

    /// the code used when no metric is configured
    pub const NONE_CODE: u8 = 0;

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            11 => Some(Self::Pdr),
            12 => Some(Self::Etx),
            13 => Some(Self::Rssi),
            14 => Some(Self::Lqi),
            15 => Some(Self::Asn),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pdr => "pdr",
            Self::Etx => "etx",
            Self::Rssi => "rssi",
            Self::Lqi => "lqi",
            Self::Asn => "asn",
        }
    }

    /// PDR and ETX count retransmissions, which is only meaningful on
    /// links with a single dedicated transmitter.
    pub const fn requires_dedicated_link(self) -> bool {
        matches!(self, Self::Pdr | Self::Etx)
    }

    /// `true` for the metrics whose samples are transmission counts.
    pub const fn is_transmission_based(self) -> bool {
        matches!(self, Self::Pdr | Self::Etx)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.label() == s)
            .ok_or_else(|| UnknownMetric {
                label: s.to_owned(),
            })
    }
}
