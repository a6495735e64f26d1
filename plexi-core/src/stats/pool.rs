use crate::{
    addr::LinkAddr,
    schedule::{Link, LinkObserver},
    stats::{
        EnhancedHandle, EnhancedRecord, EwmaUpdater, RecordHandle, RecordMeta, Sample,
        StatRecord, Storage, arena::Arena,
    },
};
use log::{debug, warn};
use thiserror::Error;

/// Bounded store of every [`StatRecord`] of the node.
///
/// The pool holds at most [`capacity`] records, shared by all links. On
/// [`Storage::Plain`] pools a second arena of the same capacity holds the
/// per-sender [`EnhancedRecord`]s of shared links; packed pools do not
/// track senders.
///
/// Records are handed out as [`RecordHandle`]s. Each link keeps the head
/// of its own chain and the pool links the records of a chain together.
///
/// # Example
///
/// ```
/// use plexi_core::stats::{Metric, StatsPool, Storage};
///
/// let mut pool = StatsPool::new(2, Storage::Plain);
/// let mut head = None;
///
/// let mut meta = pool.blank_meta();
/// # use plexi_core::stats::MetaCodec as _;
/// meta.set_metric(Some(Metric::Rssi));
/// let handle = pool.allocate(meta).unwrap();
/// pool.append(&mut head, handle);
///
/// assert_eq!(pool.chain(head).count(), 1);
/// assert_eq!(pool.available(), 1);
/// ```
///
/// [`capacity`]: StatsPool::capacity
#[derive(Debug)]
pub struct StatsPool {
    storage: Storage,
    records: Arena<StatRecord>,
    enhanced: Arena<EnhancedRecord>,
}

/// Error returned when the pool has no room left for a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Not enough memory (too many statistics, capacity is {capacity})")]
pub struct PoolExhausted {
    pub capacity: usize,
}

/// Iterator over a chain of records, see [`StatsPool::chain`].
pub struct Chain<'a> {
    pool: &'a StatsPool,
    cursor: Option<RecordHandle>,
}

/// Iterator over the per-sender readings of a record, see
/// [`StatsPool::enhanced_chain`].
pub struct EnhancedChain<'a> {
    pool: &'a StatsPool,
    cursor: Option<EnhancedHandle>,
}

impl StatsPool {
    pub fn new(capacity: usize, storage: Storage) -> Self {
        let enhanced_capacity = match storage {
            Storage::Plain => capacity,
            Storage::Packed => 0,
        };
        Self {
            storage,
            records: Arena::with_capacity(capacity),
            enhanced: Arena::with_capacity(enhanced_capacity),
        }
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    /// `true` when per-sender readings are kept for shared links
    pub fn tracks_senders(&self) -> bool {
        self.enhanced.capacity() > 0
    }

    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn available(&self) -> usize {
        self.capacity() - self.len()
    }

    /// number of per-sender readings currently held
    pub fn enhanced_len(&self) -> usize {
        self.enhanced.len()
    }

    /// a blank configuration in this pool's storage encoding
    pub fn blank_meta(&self) -> RecordMeta {
        RecordMeta::new(self.storage)
    }

    /// Reserve a record configured with `meta`.
    ///
    /// The record is not attached to any chain; see [`StatsPool::append`].
    ///
    /// # Errors
    ///
    /// [`PoolExhausted`] when all [`capacity`](Self::capacity) records are
    /// in use. Existing records are left untouched.
    pub fn allocate(&mut self, meta: RecordMeta) -> Result<RecordHandle, PoolExhausted> {
        let Some(key) = self.records.insert(StatRecord::new(meta)) else {
            warn!(
                "statistics pool exhausted ({} records in use)",
                self.records.len()
            );
            return Err(PoolExhausted {
                capacity: self.capacity(),
            });
        };
        let handle = RecordHandle(key);
        debug!("statistics record {handle} allocated");
        Ok(handle)
    }

    /// Release a record and every per-sender reading it holds.
    ///
    /// Unknown or already freed handles are ignored and return `None`. The
    /// record is not unlinked from its chain, use [`StatsPool::detach`]
    /// for records that may still be referenced by a predecessor.
    pub fn free(&mut self, handle: RecordHandle) -> Option<StatRecord> {
        let mut record = self.records.remove(handle.0)?;
        let mut cursor = record.enhanced.take();
        while let Some(enhanced) = cursor {
            cursor = self.enhanced.remove(enhanced.0).and_then(|entry| entry.next);
        }
        debug!("statistics record {handle} freed");
        Some(record)
    }

    pub fn get(&self, handle: RecordHandle) -> Option<&StatRecord> {
        self.records.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: RecordHandle) -> Option<&mut StatRecord> {
        self.records.get_mut(handle.0)
    }

    /// Iterate over the chain starting at `head`.
    pub fn chain(&self, head: Option<RecordHandle>) -> Chain<'_> {
        Chain {
            pool: self,
            cursor: head,
        }
    }

    /// the handles of the chain starting at `head`, in chain order
    pub fn chain_handles(&self, head: Option<RecordHandle>) -> Vec<RecordHandle> {
        self.chain(head).map(|(handle, _)| handle).collect()
    }

    /// Attach `handle` at the end of the chain starting at `head`.
    pub fn append(&mut self, head: &mut Option<RecordHandle>, handle: RecordHandle) {
        let Some(last) = self.chain(*head).last().map(|(last, _)| last) else {
            *head = Some(handle);
            return;
        };
        if let Some(record) = self.get_mut(last) {
            record.next = Some(handle);
        }
    }

    /// Remove `handle` from the chain starting at `head` without freeing it.
    ///
    /// Returns `false` when `handle` is not part of the chain.
    pub fn unlink(&mut self, head: &mut Option<RecordHandle>, handle: RecordHandle) -> bool {
        let next = match self.get(handle) {
            Some(record) => record.next,
            None => return false,
        };

        if *head == Some(handle) {
            *head = next;
        } else {
            let Some(previous) = self
                .chain(*head)
                .find(|(_, record)| record.next == Some(handle))
                .map(|(previous, _)| previous)
            else {
                return false;
            };
            if let Some(record) = self.get_mut(previous) {
                record.next = next;
            }
        }

        if let Some(record) = self.get_mut(handle) {
            record.next = None;
        }
        true
    }

    /// Unlink `handle` from the chain starting at `head` and free it.
    pub fn detach(
        &mut self,
        head: &mut Option<RecordHandle>,
        handle: RecordHandle,
    ) -> Option<StatRecord> {
        if !self.unlink(head, handle) {
            return None;
        }
        self.free(handle)
    }

    /// Free the whole chain starting at `head`, returning the freed
    /// records in chain order.
    pub fn purge_chain(&mut self, head: &mut Option<RecordHandle>) -> Vec<StatRecord> {
        let handles = self.chain_handles(head.take());
        handles
            .into_iter()
            .filter_map(|handle| self.free(handle))
            .collect()
    }

    /// Feed `sample` to every record of the chain starting at `head`.
    ///
    /// When `sender` is given and the pool tracks senders, the per-sender
    /// reading of each fed record is updated as well, created on first
    /// contact. A sender that does not fit in the pool any more is skipped.
    ///
    /// Records are fed whether they are enabled or not. Returns the number
    /// of records fed.
    pub fn record_sample(
        &mut self,
        head: Option<RecordHandle>,
        sample: Sample,
        sender: Option<LinkAddr>,
    ) -> usize {
        let mut fed = 0;
        for handle in self.chain_handles(head) {
            let Some(record) = self.records.get_mut(handle.0) else {
                continue;
            };
            let Some(metric) = record.metric() else {
                continue;
            };
            if !sample.feeds(metric) {
                continue;
            }
            record.set_reading(EwmaUpdater::update(metric, record.reading(), sample));
            fed += 1;

            if let Some(sender) = sender
                && self.tracks_senders()
            {
                match self.enhanced_entry(handle, sender) {
                    Ok(entry) => {
                        if let Some(enhanced) = self.enhanced.get_mut(entry.0) {
                            enhanced.set_reading(EwmaUpdater::update(
                                metric,
                                enhanced.reading(),
                                sample,
                            ));
                        }
                    }
                    Err(error) => warn!("sender {sender} not tracked: {error}"),
                }
            }
        }
        fed
    }

    /// Iterate over the per-sender readings of `record`.
    pub fn enhanced_chain(&self, record: RecordHandle) -> EnhancedChain<'_> {
        EnhancedChain {
            pool: self,
            cursor: self.get(record).and_then(|record| record.enhanced),
        }
    }

    /// the reading `record` keeps about `target`, if any
    pub fn enhanced_for(&self, record: RecordHandle, target: LinkAddr) -> Option<&EnhancedRecord> {
        self.enhanced_chain(record)
            .map(|(_, enhanced)| enhanced)
            .find(|enhanced| enhanced.target() == target)
    }

    /// Find or create the reading `record` keeps about `target`.
    pub fn enhanced_entry(
        &mut self,
        record: RecordHandle,
        target: LinkAddr,
    ) -> Result<EnhancedHandle, PoolExhausted> {
        let mut last = None;
        for (handle, enhanced) in self.enhanced_chain(record) {
            if enhanced.target() == target {
                return Ok(handle);
            }
            last = Some(handle);
        }

        let Some(key) = self.enhanced.insert(EnhancedRecord::new(target)) else {
            return Err(PoolExhausted {
                capacity: self.enhanced.capacity(),
            });
        };
        let handle = EnhancedHandle(key);

        match last {
            Some(last) => {
                if let Some(enhanced) = self.enhanced.get_mut(last.0) {
                    enhanced.next = Some(handle);
                }
            }
            None => {
                if let Some(owner) = self.records.get_mut(record.0) {
                    owner.enhanced = Some(handle);
                }
            }
        }
        debug!("sender {target} tracked by statistics record {record}");
        Ok(handle)
    }

    /// Remove and return the reading `record` keeps about `target`.
    pub fn remove_enhanced(
        &mut self,
        record: RecordHandle,
        target: LinkAddr,
    ) -> Option<EnhancedRecord> {
        let mut previous = None;
        let mut found = None;
        for (handle, enhanced) in self.enhanced_chain(record) {
            if enhanced.target() == target {
                found = Some((handle, enhanced.next));
                break;
            }
            previous = Some(handle);
        }
        let (handle, next) = found?;

        match previous {
            Some(previous) => {
                if let Some(enhanced) = self.enhanced.get_mut(previous.0) {
                    enhanced.next = next;
                }
            }
            None => {
                if let Some(owner) = self.records.get_mut(record.0) {
                    owner.enhanced = next;
                }
            }
        }
        self.enhanced.remove(handle.0)
    }
}

impl LinkObserver for StatsPool {
    fn link_removed(&mut self, link: &mut Link) {
        let purged = self.purge_chain(link.stats_mut());
        if !purged.is_empty() {
            debug!(
                "{} statistics records purged with link {}",
                purged.len(),
                link.handle()
            );
        }
    }
}

impl<'a> Iterator for Chain<'a> {
    type Item = (RecordHandle, &'a StatRecord);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let record = self.pool.get(handle)?;
        self.cursor = record.next;
        Some((handle, record))
    }
}

impl<'a> Iterator for EnhancedChain<'a> {
    type Item = (EnhancedHandle, &'a EnhancedRecord);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.cursor?;
        let enhanced = self.pool.enhanced.get(handle.0)?;
        self.cursor = enhanced.next;
        Some((handle, enhanced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{MetaCodec as _, Metric, SENTINEL};

    // ------------------------------------------------------------------
    // 1. Allocation
    // ------------------------------------------------------------------

    #[test]
    fn allocate_until_exhausted() {
        let mut pool = StatsPool::new(2, Storage::Plain);
        let first = pool.allocate(meta(&pool, Metric::Rssi)).unwrap();
        let second = pool.allocate(meta(&pool, Metric::Lqi)).unwrap();

        assert_eq!(
            pool.allocate(meta(&pool, Metric::Asn)),
            Err(PoolExhausted { capacity: 2 })
        );

        assert_eq!(pool.get(first).unwrap().metric(), Some(Metric::Rssi));
        assert_eq!(pool.get(second).unwrap().metric(), Some(Metric::Lqi));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn free_makes_room() {
        let mut pool = StatsPool::new(1, Storage::Packed);
        let first = pool.allocate(meta(&pool, Metric::Rssi)).unwrap();
        assert!(pool.free(first).is_some());
        let second = pool.allocate(meta(&pool, Metric::Lqi)).unwrap();

        assert_ne!(first, second);
        assert!(pool.get(first).is_none());
        assert!(pool.free(first).is_none());
        assert_eq!(pool.get(second).unwrap().metric(), Some(Metric::Lqi));
    }

    #[test]
    fn packed_pool_does_not_track_senders() {
        assert!(StatsPool::new(2, Storage::Plain).tracks_senders());
        assert!(!StatsPool::new(2, Storage::Packed).tracks_senders());
    }

    // ------------------------------------------------------------------
    // 2. Chains
    // ------------------------------------------------------------------

    #[test]
    fn append_keeps_order() {
        let mut pool = StatsPool::new(3, Storage::Plain);
        let mut head = None;
        let handles: Vec<_> = [Metric::Rssi, Metric::Lqi, Metric::Asn]
            .into_iter()
            .map(|metric| {
                let handle = pool.allocate(meta(&pool, metric)).unwrap();
                pool.append(&mut head, handle);
                handle
            })
            .collect();

        assert_eq!(head, Some(handles[0]));
        assert_eq!(pool.chain_handles(head), handles);
    }

    #[test]
    fn unlink_middle_head_and_tail() {
        let mut pool = StatsPool::new(3, Storage::Plain);
        let mut head = None;
        let [a, b, c] = [Metric::Rssi, Metric::Lqi, Metric::Asn].map(|metric| {
            let handle = pool.allocate(meta(&pool, metric)).unwrap();
            pool.append(&mut head, handle);
            handle
        });

        assert!(pool.unlink(&mut head, b));
        assert_eq!(pool.chain_handles(head), [a, c]);
        assert!(!pool.unlink(&mut head, b));

        assert!(pool.unlink(&mut head, a));
        assert_eq!(head, Some(c));

        assert!(pool.unlink(&mut head, c));
        assert_eq!(head, None);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn detach_frees() {
        let mut pool = StatsPool::new(2, Storage::Plain);
        let mut head = None;
        let a = pool.allocate(meta(&pool, Metric::Rssi)).unwrap();
        let b = pool.allocate(meta(&pool, Metric::Lqi)).unwrap();
        pool.append(&mut head, a);
        pool.append(&mut head, b);

        let record = pool.detach(&mut head, a).unwrap();
        assert_eq!(record.metric(), Some(Metric::Rssi));
        assert_eq!(head, Some(b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn purge_chain_returns_records_in_order() {
        let mut pool = StatsPool::new(4, Storage::Plain);
        let mut head = None;
        let mut other = None;
        for metric in [Metric::Rssi, Metric::Lqi] {
            let handle = pool.allocate(meta(&pool, metric)).unwrap();
            pool.append(&mut head, handle);
        }
        let kept = pool.allocate(meta(&pool, Metric::Asn)).unwrap();
        pool.append(&mut other, kept);

        let purged = pool.purge_chain(&mut head);
        let metrics: Vec<_> = purged.iter().map(StatRecord::metric).collect();
        assert_eq!(metrics, [Some(Metric::Rssi), Some(Metric::Lqi)]);
        assert_eq!(head, None);
        assert_eq!(pool.len(), 1);
        assert!(pool.get(kept).is_some());
    }

    // ------------------------------------------------------------------
    // 3. Samples
    // ------------------------------------------------------------------

    #[test]
    fn sample_feeds_matching_records_only() {
        let mut pool = StatsPool::new(2, Storage::Plain);
        let mut head = None;
        let rssi = pool.allocate(meta(&pool, Metric::Rssi)).unwrap();
        let etx = pool.allocate(meta(&pool, Metric::Etx)).unwrap();
        pool.append(&mut head, rssi);
        pool.append(&mut head, etx);

        assert_eq!(pool.record_sample(head, Sample::Rssi(-60), None), 1);
        assert_eq!(pool.get(rssi).unwrap().value() as i16, -60);
        assert_eq!(pool.get(etx).unwrap().value(), SENTINEL);
    }

    #[test]
    fn sample_tracks_senders() {
        let mut pool = StatsPool::new(2, Storage::Plain);
        let mut head = None;
        let lqi = pool.allocate(meta(&pool, Metric::Lqi)).unwrap();
        pool.append(&mut head, lqi);

        let alice = LinkAddr::new([0, 0, 0, 0, 0, 0, 0, 1]);
        let bob = LinkAddr::new([0, 0, 0, 0, 0, 0, 0, 2]);

        pool.record_sample(head, Sample::Lqi(100), Some(alice));
        pool.record_sample(head, Sample::Lqi(50), Some(bob));
        pool.record_sample(head, Sample::Lqi(50), Some(alice));

        assert_eq!(pool.enhanced_for(lqi, alice).unwrap().value(), 95);
        assert_eq!(pool.enhanced_for(lqi, bob).unwrap().value(), 50);
        assert_eq!(pool.enhanced_len(), 2);
        // (50 * 10 + 100 * 90) / 100 = 95, then (50 * 10 + 95 * 90) / 100 = 90
        assert_eq!(pool.get(lqi).unwrap().value(), 90);
    }

    #[test]
    fn sender_skipped_when_enhanced_pool_full() {
        let mut pool = StatsPool::new(1, Storage::Plain);
        let mut head = None;
        let lqi = pool.allocate(meta(&pool, Metric::Lqi)).unwrap();
        pool.append(&mut head, lqi);

        let alice = LinkAddr::new([0, 0, 0, 0, 0, 0, 0, 1]);
        let bob = LinkAddr::new([0, 0, 0, 0, 0, 0, 0, 2]);
        pool.record_sample(head, Sample::Lqi(10), Some(alice));
        assert_eq!(pool.record_sample(head, Sample::Lqi(20), Some(bob)), 1);

        assert!(pool.enhanced_for(lqi, bob).is_none());
        assert_eq!(pool.enhanced_for(lqi, alice).unwrap().value(), 10);
    }

    #[test]
    fn free_releases_enhanced_records() {
        let mut pool = StatsPool::new(2, Storage::Plain);
        let mut head = None;
        let lqi = pool.allocate(meta(&pool, Metric::Lqi)).unwrap();
        pool.append(&mut head, lqi);
        pool.record_sample(
            head,
            Sample::Lqi(10),
            Some(LinkAddr::new([0, 0, 0, 0, 0, 0, 0, 1])),
        );
        pool.record_sample(
            head,
            Sample::Lqi(10),
            Some(LinkAddr::new([0, 0, 0, 0, 0, 0, 0, 2])),
        );
        assert_eq!(pool.enhanced_len(), 2);

        pool.purge_chain(&mut head);
        assert_eq!(pool.enhanced_len(), 0);
    }

    #[test]
    fn remove_enhanced_relinks() {
        let mut pool = StatsPool::new(3, Storage::Plain);
        let record = pool.allocate(meta(&pool, Metric::Asn)).unwrap();
        let targets = [1, 2, 3].map(|b| LinkAddr::new([0, 0, 0, 0, 0, 0, 0, b]));
        for target in targets {
            pool.enhanced_entry(record, target).unwrap();
        }

        assert!(pool.remove_enhanced(record, targets[1]).is_some());
        assert!(pool.remove_enhanced(record, targets[1]).is_none());
        let remaining: Vec<_> = pool
            .enhanced_chain(record)
            .map(|(_, enhanced)| enhanced.target())
            .collect();
        assert_eq!(remaining, [targets[0], targets[2]]);

        assert!(pool.remove_enhanced(record, targets[0]).is_some());
        let remaining: Vec<_> = pool
            .enhanced_chain(record)
            .map(|(_, enhanced)| enhanced.target())
            .collect();
        assert_eq!(remaining, [targets[2]]);
    }

    fn meta(pool: &StatsPool, metric: Metric) -> RecordMeta {
        let mut meta = pool.blank_meta();
        meta.set_metric(Some(metric));
        meta
    }
}
