use crate::{
    addr::LinkAddr,
    schedule::{LinkHandle, SlotframeId},
    stats::RecordHandle,
};
use bitflags::bitflags;

bitflags! {
    /// Transmission options of a [`Link`].
    ///
    /// ```
    /// # use plexi_core::schedule::LinkOptions;
    /// let options = LinkOptions::TX | LinkOptions::SHARED;
    /// assert!(options.contains(LinkOptions::SHARED));
    /// assert_eq!(options.bits(), 5);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LinkOptions: u8 {
        const TX = 1 << 0;
        const RX = 1 << 1;
        const SHARED = 1 << 2;
        const TIME_KEEPING = 1 << 3;
    }
}

/// Purpose of a [`Link`] in the TSCH schedule.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LinkType {
    #[default]
    Normal = 0,
    Advertising = 1,
    AdvertisingOnly = 2,
}

/// A time/channel allocation in a slotframe.
///
/// A link lives at one timeslot of its slotframe; no two links of the same
/// slotframe share a timeslot. It optionally designates the neighbor it
/// talks to and carries the head of its statistics chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    handle: LinkHandle,
    slotframe: SlotframeId,
    timeslot: u16,
    channel_offset: u16,
    options: LinkOptions,
    link_type: LinkType,
    neighbor: LinkAddr,
    stats: Option<RecordHandle>,
}

impl LinkType {
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Normal),
            1 => Some(Self::Advertising),
            2 => Some(Self::AdvertisingOnly),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl Link {
    pub(crate) fn new(
        handle: LinkHandle,
        slotframe: SlotframeId,
        timeslot: u16,
        channel_offset: u16,
    ) -> Self {
        Self {
            handle,
            slotframe,
            timeslot,
            channel_offset,
            options: LinkOptions::empty(),
            link_type: LinkType::Normal,
            neighbor: LinkAddr::NULL,
            stats: None,
        }
    }

    pub(crate) fn set_options(&mut self, options: LinkOptions) {
        self.options = options;
    }

    pub(crate) fn set_link_type(&mut self, link_type: LinkType) {
        self.link_type = link_type;
    }

    pub(crate) fn set_neighbor(&mut self, neighbor: LinkAddr) {
        self.neighbor = neighbor;
    }

    pub fn handle(&self) -> LinkHandle {
        self.handle
    }

    pub fn slotframe(&self) -> SlotframeId {
        self.slotframe
    }

    pub fn timeslot(&self) -> u16 {
        self.timeslot
    }

    pub fn channel_offset(&self) -> u16 {
        self.channel_offset
    }

    pub fn options(&self) -> LinkOptions {
        self.options
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    /// the designated neighbor, [`LinkAddr::NULL`] when there is none
    pub fn neighbor(&self) -> LinkAddr {
        self.neighbor
    }

    /// A dedicated link has a single transmitter: its options are
    /// exactly [`LinkOptions::TX`].
    pub fn is_dedicated(&self) -> bool {
        self.options == LinkOptions::TX
    }

    pub fn is_shared(&self) -> bool {
        self.options.contains(LinkOptions::SHARED)
    }

    /// head of the statistics chain of this link
    pub fn stats(&self) -> Option<RecordHandle> {
        self.stats
    }

    /// head of the statistics chain, to attach or detach records with the
    /// [`StatsPool`] chain operations
    ///
    /// [`StatsPool`]: crate::stats::StatsPool
    pub fn stats_mut(&mut self) -> &mut Option<RecordHandle> {
        &mut self.stats
    }
}
