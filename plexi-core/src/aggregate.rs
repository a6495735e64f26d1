//! Per-neighbor view of the link statistics.

use crate::{
    addr::LinkAddr,
    schedule::Schedule,
    stats::{EwmaUpdater, Metric, SENTINEL, StatsPool},
};

/// Folds the statistics of every link with one neighbor into a single
/// value per metric.
///
/// A record contributes when its link points at the neighbor, or when the
/// record keeps a per-sender reading for it (shared links). RSSI, LQI, PDR
/// and ETX are averaged over the contributing records, ASN keeps the
/// highest value.
///
/// The accumulator lives for one aggregation only.
///
/// ```
/// use plexi_core::{
///     aggregate::NeighborAggregator,
///     stats::Metric,
///     LinkAddr,
/// };
///
/// let mut aggregator = NeighborAggregator::new(LinkAddr::NULL);
/// aggregator.add(Metric::Lqi, 100);
/// aggregator.add(Metric::Lqi, 51);
/// aggregator.add(Metric::Asn, 0x20);
/// aggregator.add(Metric::Asn, 0x10);
///
/// let stats = aggregator.finish();
/// assert_eq!(stats.lqi(), Some(75));
/// assert_eq!(stats.asn(), Some(0x20));
/// assert_eq!(stats.rssi(), None);
/// ```
#[derive(Debug, Clone)]
pub struct NeighborAggregator {
    neighbor: LinkAddr,
    rssi: Mean,
    lqi: Mean,
    etx: Mean,
    pdr: Mean,
    asn: Option<u16>,
}

/// The aggregated statistics of one neighbor.
///
/// Metrics no record has sampled are `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NeighborStats {
    neighbor: LinkAddr,
    rssi: Option<i16>,
    lqi: Option<u16>,
    etx: Option<u16>,
    pdr: Option<u16>,
    asn: Option<u16>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: i64,
    count: i64,
}

impl Mean {
    fn add(&mut self, value: i64) {
        self.sum += value;
        self.count += 1;
    }

    fn get(&self) -> Option<i64> {
        (self.count > 0).then(|| self.sum / self.count)
    }
}

impl NeighborAggregator {
    pub fn new(neighbor: LinkAddr) -> Self {
        Self {
            neighbor,
            rssi: Mean::default(),
            lqi: Mean::default(),
            etx: Mean::default(),
            pdr: Mean::default(),
            asn: None,
        }
    }

    /// Aggregate every record of `schedule` that concerns `neighbor`.
    pub fn collect(schedule: &Schedule, pool: &StatsPool, neighbor: LinkAddr) -> NeighborStats {
        let mut aggregator = Self::new(neighbor);
        aggregator.visit(schedule, pool);
        aggregator.finish()
    }

    /// Feed the records of every link of `schedule` to the aggregator.
    pub fn visit(&mut self, schedule: &Schedule, pool: &StatsPool) {
        for link in schedule.links() {
            let own = link.neighbor() == self.neighbor;
            for (handle, record) in pool.chain(link.stats()) {
                let Some(metric) = record.metric() else {
                    continue;
                };
                let value = if own {
                    record.value()
                } else if let Some(enhanced) = pool.enhanced_for(handle, self.neighbor) {
                    enhanced.value()
                } else {
                    continue;
                };
                self.add(metric, value);
            }
        }
    }

    /// Account for one record value. Unsampled values are ignored.
    pub fn add(&mut self, metric: Metric, value: u16) {
        if value == SENTINEL {
            return;
        }
        match metric {
            Metric::Rssi => self.rssi.add(i64::from(value as i16)),
            Metric::Lqi => self.lqi.add(i64::from(value)),
            Metric::Etx => self.etx.add(i64::from(value)),
            Metric::Pdr => self.pdr.add(i64::from(value)),
            Metric::Asn => self.asn = self.asn.max(Some(value)),
        }
    }

    pub fn finish(self) -> NeighborStats {
        let etx_unit = i64::from(EwmaUpdater::ETX_UNIT);
        NeighborStats {
            neighbor: self.neighbor,
            rssi: self.rssi.get().map(|rssi| rssi as i16),
            lqi: self.lqi.get().map(|lqi| lqi as u16),
            // whole transmissions
            etx: (self.etx.count > 0).then(|| (self.etx.sum / etx_unit / self.etx.count) as u16),
            pdr: self.pdr.get().map(|pdr| pdr as u16),
            asn: self.asn,
        }
    }
}

impl NeighborStats {
    pub fn neighbor(&self) -> LinkAddr {
        self.neighbor
    }

    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    pub fn lqi(&self) -> Option<u16> {
        self.lqi
    }

    /// average transmission count, in whole transmissions
    pub fn etx(&self) -> Option<u16> {
        self.etx
    }

    pub fn pdr(&self) -> Option<u16> {
        self.pdr
    }

    /// highest of the low 16 bits of the last active slot number
    pub fn asn(&self) -> Option<u16> {
        self.asn
    }

    /// The aggregated value of `metric` in record representation: RSSI is
    /// two's complement.
    pub fn get(&self, metric: Metric) -> Option<u16> {
        match metric {
            Metric::Rssi => self.rssi.map(|rssi| rssi as u16),
            Metric::Lqi => self.lqi,
            Metric::Etx => self.etx,
            Metric::Pdr => self.pdr,
            Metric::Asn => self.asn,
        }
    }

    /// `true` when no metric has been sampled
    pub fn is_empty(&self) -> bool {
        Metric::ALL.into_iter().all(|metric| self.get(metric).is_none())
    }
}
