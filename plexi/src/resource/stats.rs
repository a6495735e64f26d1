//! `6top/stats`: the statistics records of the links.
//!
//! A record is rendered as
//! `{"id", "frame", "slot", "channel", "metric", "enable", "tna"?, "value"}`,
//! the location fields being those of the link it measures.

use crate::{
    error::Error,
    message::{Payload, Response, Status},
    resource::{collapse, parse_body, parse_query, render_value},
};
use log::{debug, info};
use plexi_core::{
    LinkAddr,
    query::{QueryKey, QueryPredicate},
    schedule::{Link, Schedule, SlotframeId},
    stats::{EnhancedRecord, MetaCodec as _, Metric, RecordHandle, SENTINEL, StatRecord, StatsPool},
    walker,
};
use serde::Deserialize;
use serde_json::{Value, json};

const STATS_KEYS: &[QueryKey] = &[
    QueryKey::Frame,
    QueryKey::Slot,
    QueryKey::Channel,
    QueryKey::Neighbor,
    QueryKey::Metric,
    QueryKey::Enable,
    QueryKey::Id,
];
const UNSUPPORTED_QUERY: &str =
    "Supports queries only on slot frame id and/or slotoffset and channeloffset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Frame,
    Slot,
    Channel,
    Window,
    Metric,
    Value,
    Neighbor,
    Enable,
    Id,
}

/// Body of a write. Every field but `metric` is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StatsSpec {
    frame: Option<u16>,
    slot: Option<u16>,
    channel: Option<u16>,
    tna: Option<String>,
    metric: Option<String>,
    id: Option<i64>,
    window: u16,
    enable: Option<Enable>,
    value: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Enable {
    Number(i64),
    Text(String),
}

/// A validated write: where to install, and what.
#[derive(Debug)]
struct Upsert {
    predicate: QueryPredicate,
    metric: Metric,
    id: Option<u16>,
    window: u16,
    enabled: bool,
    value: u16,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "frame" => Some(Self::Frame),
            "slot" => Some(Self::Slot),
            "channel" => Some(Self::Channel),
            "window" => Some(Self::Window),
            "metric" => Some(Self::Metric),
            "value" => Some(Self::Value),
            "tna" => Some(Self::Neighbor),
            "enable" => Some(Self::Enable),
            "id" => Some(Self::Id),
            _ => None,
        }
    }

    fn project(self, link: &Link, record: &StatRecord) -> Option<Value> {
        let value = match self {
            Self::Frame => Value::from(link.slotframe().get()),
            Self::Slot => Value::from(link.timeslot()),
            Self::Channel => Value::from(link.channel_offset()),
            Self::Window => Value::from(record.window()),
            Self::Metric => Value::from(record.metric()?.label()),
            Self::Value => render_value(record.metric(), record.value()),
            Self::Neighbor => {
                if link.neighbor().is_null() {
                    return None;
                }
                Value::from(link.neighbor().to_string())
            }
            Self::Enable => Value::from(u8::from(record.enabled())),
            Self::Id => Value::from(record.id()?),
        };
        Some(value)
    }
}

impl Enable {
    fn parse(&self) -> Result<bool, Error> {
        match self {
            Self::Number(number) => Ok(*number == 1),
            Self::Text(text) => match text.as_str() {
                "y" | "yes" | "true" => Ok(true),
                "n" | "no" | "false" => Ok(false),
                _ => Err(Error::bad_request(format!(
                    "Invalid statistics configuration (enable {text})"
                ))),
            },
        }
    }
}

impl StatsSpec {
    fn validate(self) -> Result<Upsert, Error> {
        let metric = match self.metric {
            Some(metric) => Some(metric.parse::<Metric>()?),
            None => None,
        };
        let id = match self.id {
            None => None,
            Some(id) => match u16::try_from(id) {
                Ok(id) if id >= 1 => Some(id),
                _ => {
                    return Err(Error::bad_request(
                        "Invalid statistics configuration (invalid id)",
                    ));
                }
            },
        };
        // signed values are stored as two's complement, as the RSSI is
        let value = match self.value {
            None => SENTINEL,
            Some(value) if (i64::from(i16::MIN)..=i64::from(u16::MAX)).contains(&value) => {
                value as u16
            }
            Some(_) => {
                return Err(Error::bad_request(
                    "Invalid statistics configuration (invalid value)",
                ));
            }
        };
        let neighbor = match self.tna {
            Some(tna) => Some(tna.parse::<LinkAddr>()?),
            None => None,
        };
        let enabled = match &self.enable {
            Some(enable) => enable.parse()?,
            None => false,
        };
        let Some(metric) = metric else {
            return Err(Error::bad_request(
                "Invalid statistics configuration (metric missing)",
            ));
        };

        let mut predicate = QueryPredicate::new();
        if let Some(frame) = self.frame {
            predicate = predicate.with_frame(SlotframeId::new(frame));
        }
        if let Some(slot) = self.slot {
            predicate = predicate.with_timeslot(slot);
        }
        if let Some(channel) = self.channel {
            predicate = predicate.with_channel(channel);
        }
        if let Some(neighbor) = neighbor {
            predicate = predicate.with_neighbor(neighbor);
        }

        Ok(Upsert {
            predicate,
            metric,
            id,
            window: self.window,
            enabled,
            value,
        })
    }
}

impl Upsert {
    /// The record of the chain of `link` this write applies to.
    ///
    /// Records are matched on the metric, and on the id when one is
    /// given. A record with the same metric but another id, or the same
    /// id but another metric, is a conflict.
    fn find(&self, link: &Link, pool: &StatsPool) -> Result<Option<RecordHandle>, Error> {
        for (handle, record) in pool.chain(link.stats()) {
            let same_metric = record.metric() == Some(self.metric);
            match self.id {
                None if same_metric => return Ok(Some(handle)),
                Some(id) if same_metric && record.id() == Some(id) => return Ok(Some(handle)),
                Some(id) if same_metric || record.id() == Some(id) => {
                    return Err(Error::MetricConflict);
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn apply(&self, link: &mut Link, pool: &mut StatsPool) -> Result<(), Error> {
        if let Some(handle) = self.find(link, pool)? {
            if let Some(record) = pool.get_mut(handle) {
                record.set_window(self.window)?;
                record.set_enabled(self.enabled);
                record.set_value(self.value);
            }
            debug!("statistics {} of link {} updated", self.metric, link.handle());
            return Ok(());
        }

        if self.metric.requires_dedicated_link() && !link.is_dedicated() {
            return Err(Error::BroadcastCell);
        }

        let mut meta = pool.blank_meta();
        meta.set_id(self.id)?;
        meta.set_metric(Some(self.metric));
        meta.set_enabled(self.enabled);
        meta.set_window(self.window)?;
        let handle = pool.allocate(meta)?;
        if let Some(record) = pool.get_mut(handle) {
            record.set_value(self.value);
        }
        pool.append(link.stats_mut(), handle);
        info!("statistics {} installed on link {}", self.metric, link.handle());
        Ok(())
    }
}

pub(crate) fn get(
    schedule: &Schedule,
    pool: &StatsPool,
    subresource: Option<&str>,
    query: &str,
) -> Result<Response, Error> {
    let predicate = parse_query(query, STATS_KEYS, UNSUPPORTED_QUERY)?;
    let field = match subresource {
        None => None,
        Some(label) => Some(Field::from_label(label).ok_or(Error::InvalidSubresource)?),
    };
    has_slotframes(schedule, &predicate)?;

    let mut values = Vec::new();
    walker::for_each_match(schedule, &predicate, |link| {
        for (_, record) in pool.chain(link.stats()) {
            if !predicate.matches_record(record) {
                continue;
            }
            match field {
                Some(field) => values.extend(field.project(link, record)),
                None => values.push(object(link, record)),
            }
        }
    });
    if values.is_empty() {
        return Err(Error::NotFound {
            message: "No specified statistics resource found",
        });
    }

    Ok(Response::content(collapse(values, predicate.id().is_some())))
}

/// Install a record on every link the body selects, or update the one
/// already measuring the same metric.
///
/// The first failing link stops the walk. Links handled before it keep
/// their new records.
pub(crate) fn post(
    schedule: &mut Schedule,
    pool: &mut StatsPool,
    payload: &[u8],
) -> Result<Response, Error> {
    let spec: StatsSpec = parse_body(payload)?;
    let upsert = spec.validate()?;
    has_slotframes(schedule, &upsert.predicate)?;

    let mut installed = 0usize;
    walker::try_for_each_match_mut(schedule, &upsert.predicate, |link| {
        upsert.apply(link, pool)?;
        installed += 1;
        Ok::<_, Error>(())
    })?;

    if installed == 0 {
        return Err(Error::NotFound {
            message: "Link not found to install statistics resource",
        });
    }
    Ok(Response::new(Status::Changed, Payload::Empty))
}

/// Remove the records selected by the query and answer with them.
///
/// With a `tna` filter, the links pointing at another neighbor are not
/// skipped: the reading their records keep about `tna` is removed
/// instead, which is how a sender of a shared link is forgotten.
pub(crate) fn delete(
    schedule: &mut Schedule,
    pool: &mut StatsPool,
    subresource: Option<&str>,
    query: &str,
) -> Result<Response, Error> {
    let predicate = parse_query(query, STATS_KEYS, UNSUPPORTED_QUERY)?;
    if subresource.is_some() {
        return Err(Error::NotFound {
            message: "Subresources are not allowed",
        });
    }
    has_slotframes(schedule, &predicate)?;

    let neighbor = predicate.neighbor();
    let links = predicate.clone().without_neighbor();
    let mut deleted = Vec::new();
    walker::try_for_each_match_mut(schedule, &links, |link| {
        let selected: Vec<RecordHandle> = pool
            .chain(link.stats())
            .filter(|(_, record)| predicate.matches_record(record))
            .map(|(handle, _)| handle)
            .collect();

        for handle in selected {
            match neighbor {
                Some(neighbor) if neighbor != link.neighbor() => {
                    if let Some(enhanced) = pool.remove_enhanced(handle, neighbor)
                        && let Some(record) = pool.get(handle)
                    {
                        debug!("sender {neighbor} forgotten by link {}", link.handle());
                        deleted.push(enhanced_object(link, record, &enhanced));
                    }
                }
                _ => {
                    if let Some(record) = pool.detach(link.stats_mut(), handle) {
                        info!("statistics {handle} of link {} deleted", link.handle());
                        deleted.push(object(link, &record));
                    }
                }
            }
        }
        Ok::<_, Error>(())
    })?;

    if deleted.is_empty() {
        return Err(Error::NotFound {
            message: "Nothing to delete",
        });
    }
    Ok(Response::new(
        Status::Deleted,
        Payload::Json(Value::Array(deleted)),
    ))
}

/// Fails unless the slotframe the predicate designates, or any slotframe
/// at all, exists.
fn has_slotframes(schedule: &Schedule, predicate: &QueryPredicate) -> Result<(), Error> {
    let found = match predicate.frame() {
        Some(frame) => schedule.slotframe(frame).is_some(),
        None => !schedule.is_empty(),
    };
    if found {
        Ok(())
    } else {
        Err(Error::NotFound {
            message: "No slotframes found",
        })
    }
}

fn object(link: &Link, record: &StatRecord) -> Value {
    let mut object = json!({
        "id": record.id(),
        "frame": link.slotframe().get(),
        "slot": link.timeslot(),
        "channel": link.channel_offset(),
        "metric": record.metric().map(Metric::label),
        "enable": u8::from(record.enabled()),
        "value": render_value(record.metric(), record.value()),
    });
    if !link.neighbor().is_null() {
        object["tna"] = Value::from(link.neighbor().to_string());
    }
    object
}

fn enhanced_object(link: &Link, record: &StatRecord, enhanced: &EnhancedRecord) -> Value {
    let mut object = object(link, record);
    object["tna"] = Value::from(enhanced.target().to_string());
    object["value"] = render_value(record.metric(), enhanced.value());
    object
}
