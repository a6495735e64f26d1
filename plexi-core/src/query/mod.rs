//! Conjunctive filters over the schedule and its statistics.
//!
//! A [`QueryPredicate`] is built once per request, from the query string
//! of the request, and only checked against the keys the target resource
//! understands.

mod lexer;

use crate::{
    addr::{AddrParseError, LinkAddr},
    schedule::{Link, LinkHandle, Slotframe, SlotframeId},
    stats::{Metric, StatRecord, UnknownMetric},
};
use std::fmt;
use thiserror::Error;

/// The keys a query string may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Frame,
    Slot,
    Channel,
    Neighbor,
    Metric,
    Enable,
    Id,
    Link,
    Slots,
}

/// Optional filters, all of which must hold for an element to match.
///
/// An empty predicate matches everything.
///
/// ```
/// use plexi_core::query::{QueryKey, QueryPredicate};
///
/// let predicate = QueryPredicate::parse(
///     "frame=1&slot=5",
///     &[QueryKey::Frame, QueryKey::Slot, QueryKey::Channel],
/// )
/// .unwrap();
/// assert_eq!(predicate.frame().map(|f| f.get()), Some(1));
/// assert_eq!(predicate.timeslot(), Some(5));
/// assert_eq!(predicate.channel(), None);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QueryPredicate {
    frame: Option<SlotframeId>,
    timeslot: Option<u16>,
    channel: Option<u16>,
    neighbor: Option<LinkAddr>,
    metric: Option<Metric>,
    enabled: Option<bool>,
    id: Option<u16>,
    link: Option<LinkHandle>,
    slots: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Query ({query}) is not a list of key=value pairs")]
    Malformed { query: String },
    #[error("Query has none of the supported keys")]
    Unsupported,
    #[error("Query value ({value}) of {key} is not a 16 bit unsigned integer")]
    InvalidNumber { key: QueryKey, value: String },
    #[error("Invalid enable value ({value}), expecting y, yes, true, 1, n, no, false or 0")]
    InvalidEnable { value: String },
    #[error("{0}")]
    UnknownMetric(#[from] UnknownMetric),
    #[error("Invalid target node address: {0}")]
    InvalidAddress(#[from] AddrParseError),
}

impl QueryKey {
    pub const ALL: [Self; 9] = [
        Self::Frame,
        Self::Slot,
        Self::Channel,
        Self::Neighbor,
        Self::Metric,
        Self::Enable,
        Self::Id,
        Self::Link,
        Self::Slots,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::Slot => "slot",
            Self::Channel => "channel",
            Self::Neighbor => "tna",
            Self::Metric => "metric",
            Self::Enable => "enable",
            Self::Id => "id",
            Self::Link => "link",
            Self::Slots => "slots",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.label() == label)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parse the textual enable flag: `y`, `yes`, `true`, `1` or `n`, `no`,
/// `false`, `0`.
pub fn parse_enable(value: &str) -> Option<bool> {
    match value {
        "y" | "yes" | "true" | "1" => Some(true),
        "n" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

impl QueryPredicate {
    pub const fn new() -> Self {
        Self {
            frame: None,
            timeslot: None,
            channel: None,
            neighbor: None,
            metric: None,
            enabled: None,
            id: None,
            link: None,
            slots: None,
        }
    }

    /// Build a predicate from a query string.
    ///
    /// Only the keys in `accepted` are considered, others are ignored. An
    /// empty query gives the empty predicate. Only the first occurrence of
    /// a key is used.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Unsupported`] when the query is not empty but none
    ///   of its keys is accepted;
    /// - [`QueryError::InvalidNumber`] for numeric keys whose value is not
    ///   a `u16`;
    /// - [`QueryError::UnknownMetric`], [`QueryError::InvalidEnable`] and
    ///   [`QueryError::InvalidAddress`] for the other values.
    pub fn parse(query: &str, accepted: &[QueryKey]) -> Result<Self, QueryError> {
        let pairs = lexer::pairs(query)?;
        if pairs.is_empty() {
            return Ok(Self::new());
        }

        let mut predicate = Self::new();
        let mut recognised = false;
        let mut seen: Vec<QueryKey> = Vec::new();
        for (label, value) in pairs {
            let Some(key) = QueryKey::from_label(label) else {
                continue;
            };
            if !accepted.contains(&key) || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            recognised = true;
            predicate.set(key, value)?;
        }

        if !recognised {
            return Err(QueryError::Unsupported);
        }
        Ok(predicate)
    }

    fn set(&mut self, key: QueryKey, value: &str) -> Result<(), QueryError> {
        let number = || {
            value.parse::<u16>().map_err(|_| QueryError::InvalidNumber {
                key,
                value: value.to_owned(),
            })
        };
        match key {
            QueryKey::Frame => self.frame = Some(SlotframeId::new(number()?)),
            QueryKey::Slot => self.timeslot = Some(number()?),
            QueryKey::Channel => self.channel = Some(number()?),
            QueryKey::Neighbor => self.neighbor = Some(value.parse()?),
            QueryKey::Metric => self.metric = Some(value.parse()?),
            QueryKey::Enable => {
                let Some(enabled) = parse_enable(value) else {
                    return Err(QueryError::InvalidEnable {
                        value: value.to_owned(),
                    });
                };
                self.enabled = Some(enabled);
            }
            QueryKey::Id => self.id = Some(number()?),
            QueryKey::Link => self.link = Some(LinkHandle::new(number()?)),
            QueryKey::Slots => self.slots = Some(number()?),
        }
        Ok(())
    }

    #[must_use]
    pub fn with_frame(mut self, frame: SlotframeId) -> Self {
        self.frame = Some(frame);
        self
    }

    #[must_use]
    pub fn with_timeslot(mut self, timeslot: u16) -> Self {
        self.timeslot = Some(timeslot);
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel: u16) -> Self {
        self.channel = Some(channel);
        self
    }

    #[must_use]
    pub fn with_neighbor(mut self, neighbor: LinkAddr) -> Self {
        self.neighbor = Some(neighbor);
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: u16) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: LinkHandle) -> Self {
        self.link = Some(link);
        self
    }

    #[must_use]
    pub fn with_slots(mut self, slots: u16) -> Self {
        self.slots = Some(slots);
        self
    }

    /// the same predicate without its neighbor filter
    #[must_use]
    pub fn without_neighbor(mut self) -> Self {
        self.neighbor = None;
        self
    }

    pub fn frame(&self) -> Option<SlotframeId> {
        self.frame
    }

    pub fn timeslot(&self) -> Option<u16> {
        self.timeslot
    }

    pub fn channel(&self) -> Option<u16> {
        self.channel
    }

    pub fn neighbor(&self) -> Option<LinkAddr> {
        self.neighbor
    }

    pub fn metric(&self) -> Option<Metric> {
        self.metric
    }

    pub fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    pub fn id(&self) -> Option<u16> {
        self.id
    }

    pub fn link(&self) -> Option<LinkHandle> {
        self.link
    }

    pub fn slots(&self) -> Option<u16> {
        self.slots
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::new()
    }

    /// frame and slot count filters
    pub fn matches_slotframe(&self, slotframe: &Slotframe) -> bool {
        self.frame.is_none_or(|frame| frame == slotframe.id())
            && self.slots.is_none_or(|slots| slots == slotframe.size())
    }

    /// timeslot, channel, neighbor and link handle filters
    pub fn matches_link(&self, link: &Link) -> bool {
        self.timeslot.is_none_or(|slot| slot == link.timeslot())
            && self
                .channel
                .is_none_or(|channel| channel == link.channel_offset())
            && self
                .neighbor
                .is_none_or(|neighbor| neighbor == link.neighbor())
            && self.link.is_none_or(|handle| handle == link.handle())
    }

    /// metric, enable and id filters
    pub fn matches_record(&self, record: &StatRecord) -> bool {
        self.metric.is_none_or(|metric| Some(metric) == record.metric())
            && self.enabled.is_none_or(|enabled| enabled == record.enabled())
            && self.id.is_none_or(|id| Some(id) == record.id())
    }
}
