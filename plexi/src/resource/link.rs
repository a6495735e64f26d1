//! `6top/cellList`: the links of the schedule.
//!
//! A link is rendered as
//! `{"link", "frame", "slot", "channel", "option", "type", "tna"?, "stats"?}`
//! where `stats` lists the `{"id", "value"}` of its statistics records.

use crate::{
    error::Error,
    message::{Payload, Response, Status},
    resource::{collapse, parse_body, parse_query, render_value},
};
use log::info;
use plexi_core::{
    LinkAddr,
    query::{QueryKey, QueryPredicate},
    schedule::{Link, LinkOptions, LinkType, Schedule, SlotframeId},
    stats::StatsPool,
    walker,
};
use serde::Deserialize;
use serde_json::{Value, json};

const UNSUPPORTED_QUERY: &str =
    "Supports queries only on slot frame id and/or slotoffset and channeloffset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Link,
    Frame,
    Slot,
    Channel,
    Options,
    Type,
    Neighbor,
    Stats,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LinkSpec {
    frame: u16,
    slot: u16,
    channel: u16,
    option: u8,
    #[serde(rename = "type")]
    link_type: u8,
    tna: Option<String>,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "link" => Some(Self::Link),
            "frame" => Some(Self::Frame),
            "slot" => Some(Self::Slot),
            "channel" => Some(Self::Channel),
            "option" => Some(Self::Options),
            "type" => Some(Self::Type),
            "tna" => Some(Self::Neighbor),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }

    /// Push the projection of `link` to `values`. Links without a
    /// neighbor or without statistics have nothing to project for `tna`
    /// and `stats`.
    fn project(self, link: &Link, pool: &StatsPool, values: &mut Vec<Value>) {
        match self {
            Self::Link => values.push(Value::from(link.handle().get())),
            Self::Frame => values.push(Value::from(link.slotframe().get())),
            Self::Slot => values.push(Value::from(link.timeslot())),
            Self::Channel => values.push(Value::from(link.channel_offset())),
            Self::Options => values.push(Value::from(link.options().bits())),
            Self::Type => values.push(Value::from(link.link_type().code())),
            Self::Neighbor => {
                if !link.neighbor().is_null() {
                    values.push(Value::from(link.neighbor().to_string()));
                }
            }
            Self::Stats => values.extend(stats_entries(link, pool)),
        }
    }

    fn nothing_found(self) -> &'static str {
        match self {
            Self::Neighbor => "Link has no target node address.",
            Self::Stats => "No specified statistics was found",
            _ => NO_LINK,
        }
    }
}

const NO_LINK: &str = "No link was found";

pub(crate) fn get(
    schedule: &Schedule,
    pool: &StatsPool,
    subresource: Option<&str>,
    query: &str,
) -> Result<Response, Error> {
    let predicate = parse_query(
        query,
        &[
            QueryKey::Link,
            QueryKey::Frame,
            QueryKey::Slot,
            QueryKey::Channel,
        ],
        UNSUPPORTED_QUERY,
    )?;
    let field = match subresource {
        None => None,
        Some(label) => Some(Field::from_label(label).ok_or(Error::InvalidSubresource)?),
    };

    let links = walker::matching_links(schedule, &predicate);
    if links.is_empty() {
        return Err(Error::NotFound { message: NO_LINK });
    }

    let mut values = Vec::with_capacity(links.len());
    for link in links {
        match field {
            Some(field) => field.project(link, pool, &mut values),
            None => values.push(object(link, pool)),
        }
    }
    if let Some(field) = field
        && values.is_empty()
    {
        return Err(Error::NotFound {
            message: field.nothing_found(),
        });
    }

    let single = field.is_none() && is_single(&predicate);
    Ok(Response::content(collapse(values, single)))
}

/// Add the link described by the body and answer `[handle]`.
///
/// The statistics of a link replaced at the same timeslot are purged.
pub(crate) fn post(
    schedule: &mut Schedule,
    pool: &mut StatsPool,
    payload: &[u8],
) -> Result<Response, Error> {
    let body: Value = parse_body(payload)?;
    if body.is_array() {
        return Err(Error::bad_request(
            "Array of links is not supported yet. POST each link separately.",
        ));
    }
    let LinkSpec {
        frame,
        slot,
        channel,
        option,
        link_type,
        tna,
    } = serde_json::from_value(body)?;

    let neighbor = match tna {
        Some(tna) => tna.parse()?,
        None => LinkAddr::NULL,
    };
    let Some(link_type) = LinkType::from_code(link_type) else {
        return Err(Error::bad_request(format!("Invalid link type ({link_type})")));
    };

    let handle = schedule
        .new_link(SlotframeId::new(frame))
        .set_timeslot(slot)
        .set_channel_offset(channel)
        .set_options(LinkOptions::from_bits_truncate(option))
        .set_type(link_type)
        .set_neighbor(neighbor)
        .apply(pool)?;

    Ok(Response::new(
        Status::Changed,
        Payload::Json(json!([handle.get()])),
    ))
}

/// Remove the links selected by the `frame`, `slot` and `channel` query
/// and answer with them.
pub(crate) fn delete(
    schedule: &mut Schedule,
    pool: &mut StatsPool,
    subresource: Option<&str>,
    query: &str,
) -> Result<Response, Error> {
    let predicate = parse_query(
        query,
        &[QueryKey::Frame, QueryKey::Slot, QueryKey::Channel],
        UNSUPPORTED_QUERY,
    )?;
    if subresource.is_some() {
        return Err(Error::Unsupported {
            message: "Subresources are not supported for DELETE method",
        });
    }

    let targets: Vec<(SlotframeId, u16)> = walker::matching_links(schedule, &predicate)
        .into_iter()
        .map(|link| (link.slotframe(), link.timeslot()))
        .collect();

    let mut deleted = Vec::with_capacity(targets.len());
    for (slotframe, timeslot) in targets {
        if let Some(link) = schedule.remove_link(slotframe, timeslot, pool) {
            info!("link {} deleted", link.handle());
            deleted.push(fields(&link));
        }
    }

    let payload = if is_single(&predicate) {
        match deleted.pop() {
            Some(link) => Payload::Json(link),
            None => Payload::Empty,
        }
    } else {
        Payload::Json(Value::Array(deleted))
    };
    Ok(Response::new(Status::Deleted, payload))
}

/// `true` when the query designates at most one link.
fn is_single(predicate: &QueryPredicate) -> bool {
    predicate.link().is_some()
        || (predicate.frame().is_some()
            && predicate.timeslot().is_some()
            && predicate.channel().is_some())
}

fn fields(link: &Link) -> Value {
    let mut object = json!({
        "link": link.handle().get(),
        "frame": link.slotframe().get(),
        "slot": link.timeslot(),
        "channel": link.channel_offset(),
        "option": link.options().bits(),
        "type": link.link_type().code(),
    });
    if !link.neighbor().is_null() {
        object["tna"] = Value::from(link.neighbor().to_string());
    }
    object
}

fn object(link: &Link, pool: &StatsPool) -> Value {
    let mut object = fields(link);
    let stats: Vec<Value> = stats_entries(link, pool).collect();
    if !stats.is_empty() {
        object["stats"] = Value::Array(stats);
    }
    object
}

fn stats_entries<'a>(link: &'a Link, pool: &'a StatsPool) -> impl Iterator<Item = Value> + 'a {
    pool.chain(link.stats()).map(|(_, record)| {
        json!({
            "id": record.id(),
            "value": render_value(record.metric(), record.value()),
        })
    })
}
