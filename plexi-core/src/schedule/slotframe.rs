use crate::schedule::{Link, SlotframeId};
use std::collections::HashMap;

/// A repeating sequence of timeslots and the links allocated in it.
///
/// Links are kept in the order they were added. Lookup by timeslot does
/// not scan the links.
#[derive(Debug, Clone)]
pub struct Slotframe {
    id: SlotframeId,
    size: u16,
    links: Vec<Link>,
    /// position of each link in `links`, by timeslot
    by_timeslot: HashMap<u16, usize>,
}

impl Slotframe {
    pub(crate) fn new(id: SlotframeId, size: u16) -> Self {
        Self {
            id,
            size,
            links: Vec::new(),
            by_timeslot: HashMap::new(),
        }
    }

    pub fn id(&self) -> SlotframeId {
        self.id
    }

    /// number of timeslots
    pub fn size(&self) -> u16 {
        self.size
    }

    /// number of links
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    pub fn links_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.links.iter_mut()
    }

    pub fn link_by_timeslot(&self, timeslot: u16) -> Option<&Link> {
        let index = *self.by_timeslot.get(&timeslot)?;
        self.links.get(index)
    }

    pub fn link_by_timeslot_mut(&mut self, timeslot: u16) -> Option<&mut Link> {
        let index = *self.by_timeslot.get(&timeslot)?;
        self.links.get_mut(index)
    }

    /// the caller makes sure the timeslot is free
    pub(crate) fn insert(&mut self, link: Link) {
        debug_assert!(!self.by_timeslot.contains_key(&link.timeslot()));
        self.by_timeslot.insert(link.timeslot(), self.links.len());
        self.links.push(link);
    }

    pub(crate) fn remove(&mut self, timeslot: u16) -> Option<Link> {
        let index = self.by_timeslot.remove(&timeslot)?;
        let link = self.links.remove(index);
        for position in self.by_timeslot.values_mut() {
            if *position > index {
                *position -= 1;
            }
        }
        Some(link)
    }

    pub(crate) fn drain(&mut self) -> Vec<Link> {
        self.by_timeslot.clear();
        std::mem::take(&mut self.links)
    }
}
