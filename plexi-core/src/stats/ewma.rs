use crate::stats::{Metric, SENTINEL};

/// A single measurement reported by the radio for one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    /// signal strength of a received packet, in dBm
    Rssi(i16),
    /// link quality indicator of a received packet
    Lqi(u16),
    /// absolute slot number of a received packet
    Asn(u64),
    /// number of transmissions an acknowledged packet needed
    Transmissions(u8),
}

/// The stored state of one metric: the reported value and, for the
/// transmission based metrics, the running transmission count average
/// it is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reading {
    pub value: u16,
    pub estimate: u16,
}

/// Exponentially weighted moving average with a 90/10 split.
///
/// Every new sample weighs 10% against 90% for the history. Integer
/// arithmetic is used throughout and results are truncated toward zero.
/// A reading still at [`SENTINEL`] adopts the sample verbatim.
///
/// ```
/// use plexi_core::stats::{EwmaUpdater, Metric, Reading, Sample};
///
/// let reading = Reading::UNSAMPLED;
/// let reading = EwmaUpdater::update(Metric::Etx, reading, Sample::Transmissions(1));
/// assert_eq!(reading.value, 256);
/// let reading = EwmaUpdater::update(Metric::Etx, reading, Sample::Transmissions(2));
/// assert_eq!(reading.value, 281);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EwmaUpdater;

impl Reading {
    pub const UNSAMPLED: Self = Self {
        value: SENTINEL,
        estimate: SENTINEL,
    };

    pub const fn with_value(value: u16) -> Self {
        Self {
            value,
            estimate: SENTINEL,
        }
    }

    pub const fn is_sampled(&self) -> bool {
        self.value != SENTINEL
    }
}

impl Default for Reading {
    fn default() -> Self {
        Self::UNSAMPLED
    }
}

impl Sample {
    /// `true` if this sample drives records measuring `metric`
    pub fn feeds(&self, metric: Metric) -> bool {
        match self {
            Self::Rssi(_) => metric == Metric::Rssi,
            Self::Lqi(_) => metric == Metric::Lqi,
            Self::Asn(_) => metric == Metric::Asn,
            Self::Transmissions(_) => metric.is_transmission_based(),
        }
    }
}

impl EwmaUpdater {
    pub const NEW_WEIGHT: i32 = 10;
    pub const OLD_WEIGHT: i32 = 90;
    const TOTAL_WEIGHT: i32 = Self::NEW_WEIGHT + Self::OLD_WEIGHT;

    /// one transmission, in ETX units
    pub const ETX_UNIT: u16 = 256;
    /// PDR numerator: 100% of one transmission
    const PDR_SCALE: u32 = 100 * Self::ETX_UNIT as u32;

    /// Apply `sample` to the `old` reading of a record measuring `metric`.
    ///
    /// A sample that does not feed `metric` (see [`Sample::feeds`]) leaves
    /// the reading untouched.
    #[must_use = "function does not modify the current value"]
    pub fn update(metric: Metric, old: Reading, sample: Sample) -> Reading {
        if !sample.feeds(metric) {
            return old;
        }

        match sample {
            Sample::Rssi(rssi) => Reading {
                value: Self::average_signed(old.value as i16, rssi) as u16,
                ..old
            },
            Sample::Lqi(lqi) => Reading {
                value: Self::average(old.value, lqi),
                ..old
            },
            Sample::Asn(asn) => Reading {
                value: (asn & 0xFFFF) as u16,
                ..old
            },
            Sample::Transmissions(count) => {
                let etx = (u16::from(count) * Self::ETX_UNIT).min(SENTINEL - 1);
                let estimate = Self::average(old.estimate, etx);
                let value = match metric {
                    Metric::Pdr => Self::pdr(estimate),
                    _ => estimate,
                };
                Reading { value, estimate }
            }
        }
    }

    /// unsigned 90/10 average, `old == SENTINEL` adopts the sample
    pub fn average(old: u16, sample: u16) -> u16 {
        if old == SENTINEL {
            return sample;
        }
        let new = i32::from(sample) * Self::NEW_WEIGHT + i32::from(old) * Self::OLD_WEIGHT;
        (new / Self::TOTAL_WEIGHT) as u16
    }

    /// signed 90/10 average, the all-ones pattern (`-1`) adopts the sample
    pub fn average_signed(old: i16, sample: i16) -> i16 {
        if old as u16 == SENTINEL {
            return sample;
        }
        let new = i32::from(sample) * Self::NEW_WEIGHT + i32::from(old) * Self::OLD_WEIGHT;
        (new / Self::TOTAL_WEIGHT) as i16
    }

    /// Delivery ratio in percent for a transmission count `estimate`.
    ///
    /// An estimate of zero has no meaningful ratio and yields [`SENTINEL`].
    pub fn pdr(estimate: u16) -> u16 {
        if estimate == 0 || estimate == SENTINEL {
            return SENTINEL;
        }
        (Self::PDR_SCALE / u32::from(estimate)) as u16
    }
}
