//! The management resources of the node.
//!
//! Each resource lives under its own path. A trailing path segment names
//! a subresource: one field projected out of every element, so that
//! `6top/cellList/slot` lists the timeslots of the links instead of the
//! links themselves.

pub(crate) mod link;
pub(crate) mod neighbor;
pub(crate) mod slotframe;
pub(crate) mod stats;

use crate::error::Error;
use plexi_core::{
    query::{QueryKey, QueryPredicate},
    stats::Metric,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Slotframes,
    Links,
    Stats,
    Neighbors,
}

/// A JSON body holding either a single element or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl Resource {
    pub const ALL: [Self; 4] = [Self::Slotframes, Self::Links, Self::Stats, Self::Neighbors];

    pub const fn path(self) -> &'static str {
        match self {
            Self::Slotframes => "6top/slotFrame",
            Self::Links => "6top/cellList",
            Self::Stats => "6top/stats",
            Self::Neighbors => "6top/nbrList",
        }
    }

    /// Split a request path into the resource and its subresource.
    ///
    /// ```
    /// use plexi::Resource;
    ///
    /// assert_eq!(Resource::route("6top/stats").unwrap(), (Resource::Stats, None));
    /// assert_eq!(
    ///     Resource::route("6top/cellList/slot").unwrap(),
    ///     (Resource::Links, Some("slot"))
    /// );
    /// assert!(Resource::route("6top/statsx").is_err());
    /// ```
    pub fn route(path: &str) -> Result<(Self, Option<&str>), Error> {
        for resource in Self::ALL {
            let Some(rest) = path.strip_prefix(resource.path()) else {
                continue;
            };
            if rest.is_empty() {
                return Ok((resource, None));
            }
            if let Some(subresource) = rest.strip_prefix('/')
                && !subresource.is_empty()
            {
                return Ok((resource, Some(subresource)));
            }
        }
        Err(Error::UnknownResource {
            path: path.to_owned(),
        })
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(one) => vec![one],
            Self::Many(many) => many,
        }
    }
}

/// Render a record value the way clients expect it: RSSI signed, ASN as a
/// hexadecimal string and everything else unsigned.
pub(crate) fn render_value(metric: Option<Metric>, value: u16) -> Value {
    match metric {
        Some(Metric::Rssi) => Value::from(value as i16),
        Some(Metric::Asn) => Value::from(format!("{value:x}")),
        _ => Value::from(value),
    }
}

pub(crate) fn parse_query(
    query: &str,
    accepted: &[QueryKey],
    unsupported: &'static str,
) -> Result<QueryPredicate, Error> {
    QueryPredicate::parse(query, accepted).map_err(|error| Error::query(error, unsupported))
}

pub(crate) fn parse_body<T: DeserializeOwned>(payload: &[u8]) -> Result<T, Error> {
    Ok(serde_json::from_slice(payload)?)
}

/// The only element of `values` when `single` holds and there is exactly
/// one, the array otherwise.
pub(crate) fn collapse(mut values: Vec<Value>, single: bool) -> Value {
    if single
        && values.len() == 1
        && let Some(value) = values.pop()
    {
        return value;
    }
    Value::Array(values)
}
