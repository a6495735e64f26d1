//! In-memory TSCH schedule: slotframes and the links allocated in them.
//!
//! The [`Schedule`] owns the links but not their statistics. Whenever a
//! link leaves the schedule, a [`LinkObserver`] is told synchronously,
//! before the link's handle is released, so it can purge whatever it
//! attached to the link.

mod id;
mod link;
mod slotframe;

use crate::addr::LinkAddr;
use log::{debug, info};
use thiserror::Error;

pub use self::{
    id::{LinkHandle, SlotframeId},
    link::{Link, LinkOptions, LinkType},
    slotframe::Slotframe,
};

/// Slotframes of the node, in the order they were added.
///
/// # Example
///
/// ```
/// use plexi_core::schedule::{LinkOptions, Schedule, SlotframeId};
///
/// let mut schedule = Schedule::new();
/// let frame = SlotframeId::new(1);
/// schedule.add_slotframe(frame, 101).unwrap();
///
/// let handle = schedule
///     .new_link(frame)
///     .set_timeslot(5)
///     .set_channel_offset(2)
///     .set_options(LinkOptions::TX)
///     .apply(&mut ())
///     .unwrap();
///
/// let link = schedule.link_by_timeslot(frame, 5).unwrap();
/// assert_eq!(link.handle(), handle);
/// assert!(link.is_dedicated());
/// ```
#[derive(Debug, Default)]
pub struct Schedule {
    slotframes: Vec<Slotframe>,

    /// the next link handle to try
    next_link: LinkHandle,
}

/// Told about every link leaving the [`Schedule`].
pub trait LinkObserver {
    /// `link` has been taken out of the schedule. Its handle is released
    /// once this returns.
    fn link_removed(&mut self, link: &mut Link);
}

impl LinkObserver for () {
    fn link_removed(&mut self, _link: &mut Link) {}
}

/// Builder for a new link, obtained via [`Schedule::new_link`].
///
/// ## Defaults
///
/// | Setting | Default |
/// |---------|---------|
/// | Timeslot | 0 |
/// | Channel offset | 0 |
/// | Options | none |
/// | Type | [`LinkType::Normal`] |
/// | Neighbor | [`LinkAddr::NULL`] |
pub struct LinkBuilder<'a> {
    slotframe: SlotframeId,
    timeslot: u16,
    channel_offset: u16,
    options: LinkOptions,
    link_type: LinkType,
    neighbor: LinkAddr,
    schedule: &'a mut Schedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("Slotframe ({slotframe}) already exists")]
    SlotframeExists { slotframe: SlotframeId },
    #[error("Slotframe handle not found ({slotframe})")]
    SlotframeNotFound { slotframe: SlotframeId },
    #[error("Slotframe ({slotframe}) needs at least one timeslot")]
    EmptySlotframe { slotframe: SlotframeId },
    #[error("Timeslot ({timeslot}) is outside slotframe ({slotframe}) of {size} slots")]
    TimeslotOutOfRange {
        slotframe: SlotframeId,
        timeslot: u16,
        size: u16,
    },
    #[error("Every link handle is in use")]
    HandlesExhausted,
}

impl<'a> LinkBuilder<'a> {
    pub fn set_timeslot(mut self, timeslot: u16) -> Self {
        self.timeslot = timeslot;
        self
    }

    pub fn set_channel_offset(mut self, channel_offset: u16) -> Self {
        self.channel_offset = channel_offset;
        self
    }

    pub fn set_options(mut self, options: LinkOptions) -> Self {
        self.options = options;
        self
    }

    pub fn set_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    pub fn set_neighbor(mut self, neighbor: LinkAddr) -> Self {
        self.neighbor = neighbor;
        self
    }

    /// Add the link to the schedule.
    ///
    /// A slotframe holds one link per timeslot: a link already sitting at
    /// the same timeslot is removed first and reported to `observer`.
    pub fn apply(self, observer: &mut impl LinkObserver) -> Result<LinkHandle, ScheduleError> {
        let Self {
            slotframe,
            timeslot,
            channel_offset,
            options,
            link_type,
            neighbor,
            schedule,
        } = self;

        let Some(frame) = schedule.slotframe(slotframe) else {
            return Err(ScheduleError::SlotframeNotFound { slotframe });
        };
        if timeslot >= frame.size() {
            return Err(ScheduleError::TimeslotOutOfRange {
                slotframe,
                timeslot,
                size: frame.size(),
            });
        }

        schedule.remove_link(slotframe, timeslot, observer);
        let handle = schedule.allocate_handle()?;

        let mut link = Link::new(handle, slotframe, timeslot, channel_offset);
        link.set_options(options);
        link.set_link_type(link_type);
        link.set_neighbor(neighbor);

        if let Some(frame) = schedule.slotframe_mut(slotframe) {
            frame.insert(link);
        }
        info!(
            "link {handle} added in slotframe {slotframe} at timeslot {timeslot}, channel offset {channel_offset}"
        );
        Ok(handle)
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_slotframe(&mut self, slotframe: SlotframeId, size: u16) -> Result<(), ScheduleError> {
        if self.slotframe(slotframe).is_some() {
            return Err(ScheduleError::SlotframeExists { slotframe });
        }
        if size == 0 {
            return Err(ScheduleError::EmptySlotframe { slotframe });
        }
        self.slotframes.push(Slotframe::new(slotframe, size));
        info!("slotframe {slotframe} added with {size} slots");
        Ok(())
    }

    /// Remove a slotframe and every link in it.
    ///
    /// Each link is reported to `observer`. The returned slotframe is
    /// empty.
    pub fn remove_slotframe(
        &mut self,
        slotframe: SlotframeId,
        observer: &mut impl LinkObserver,
    ) -> Option<Slotframe> {
        let index = self.slotframes.iter().position(|sf| sf.id() == slotframe)?;
        let mut removed = self.slotframes.remove(index);
        for mut link in removed.drain() {
            observer.link_removed(&mut link);
            debug!("link {} removed with slotframe {slotframe}", link.handle());
        }
        info!("slotframe {slotframe} removed");
        Some(removed)
    }

    /// Remove every slotframe, see [`Schedule::remove_slotframe`].
    pub fn clear(&mut self, observer: &mut impl LinkObserver) -> Vec<Slotframe> {
        let ids: Vec<_> = self.slotframes.iter().map(Slotframe::id).collect();
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            removed.extend(self.remove_slotframe(id, observer));
        }
        removed
    }

    pub fn slotframe(&self, slotframe: SlotframeId) -> Option<&Slotframe> {
        self.slotframes.iter().find(|sf| sf.id() == slotframe)
    }

    pub fn slotframe_mut(&mut self, slotframe: SlotframeId) -> Option<&mut Slotframe> {
        self.slotframes.iter_mut().find(|sf| sf.id() == slotframe)
    }

    pub fn slotframes(&self) -> impl Iterator<Item = &Slotframe> {
        self.slotframes.iter()
    }

    pub fn slotframes_mut(&mut self) -> impl Iterator<Item = &mut Slotframe> {
        self.slotframes.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.slotframes.is_empty()
    }

    /// Start building a link in `slotframe`.
    pub fn new_link(&mut self, slotframe: SlotframeId) -> LinkBuilder<'_> {
        LinkBuilder {
            slotframe,
            timeslot: 0,
            channel_offset: 0,
            options: LinkOptions::empty(),
            link_type: LinkType::Normal,
            neighbor: LinkAddr::NULL,
            schedule: self,
        }
    }

    pub fn link_by_timeslot(&self, slotframe: SlotframeId, timeslot: u16) -> Option<&Link> {
        self.slotframe(slotframe)?.link_by_timeslot(timeslot)
    }

    pub fn link_by_timeslot_mut(
        &mut self,
        slotframe: SlotframeId,
        timeslot: u16,
    ) -> Option<&mut Link> {
        self.slotframe_mut(slotframe)?.link_by_timeslot_mut(timeslot)
    }

    pub fn link(&self, handle: LinkHandle) -> Option<&Link> {
        self.links().find(|link| link.handle() == handle)
    }

    /// every link of every slotframe, in schedule order
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.slotframes.iter().flat_map(Slotframe::links)
    }

    pub fn links_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.slotframes.iter_mut().flat_map(Slotframe::links_mut)
    }

    /// Remove the link at `timeslot` of `slotframe`, reporting it to
    /// `observer` first.
    pub fn remove_link(
        &mut self,
        slotframe: SlotframeId,
        timeslot: u16,
        observer: &mut impl LinkObserver,
    ) -> Option<Link> {
        let mut link = self.slotframe_mut(slotframe)?.remove(timeslot)?;
        observer.link_removed(&mut link);
        info!(
            "link {} removed from slotframe {slotframe} at timeslot {timeslot}",
            link.handle()
        );
        Some(link)
    }

    fn allocate_handle(&mut self) -> Result<LinkHandle, ScheduleError> {
        let mut candidate = self.next_link;
        loop {
            if self.link(candidate).is_none() {
                self.next_link = candidate.next();
                return Ok(candidate);
            }
            candidate = candidate.next();
            if candidate == self.next_link {
                return Err(ScheduleError::HandlesExhausted);
            }
        }
    }
}
