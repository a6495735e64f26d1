//! `6top/slotFrame`: the slotframes of the schedule.
//!
//! A slotframe is rendered as `{"frame": id, "slots": size}`.

use crate::{
    error::Error,
    message::{Payload, Response, Status},
    resource::{OneOrMany, collapse, parse_body, parse_query},
};
use log::{debug, info};
use plexi_core::{
    query::{QueryKey, QueryPredicate},
    schedule::{Schedule, Slotframe, SlotframeId},
    stats::StatsPool,
    walker,
};
use serde::Deserialize;
use serde_json::{Value, json};

const ONLY_FRAME_OR_SLOTS: &str = "Supports only slot frame id XOR size as subresource or query";
const ONLY_FRAME: &str = "Supports only slot frame id as query";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Frame,
    Slots,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SlotframeSpec {
    frame: u16,
    slots: u16,
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "frame" => Some(Self::Frame),
            "slots" => Some(Self::Slots),
            _ => None,
        }
    }

    fn project(self, slotframe: &Slotframe) -> Value {
        match self {
            Self::Frame => Value::from(slotframe.id().get()),
            Self::Slots => Value::from(slotframe.size()),
        }
    }
}

pub(crate) fn get(
    schedule: &Schedule,
    subresource: Option<&str>,
    query: &str,
) -> Result<Response, Error> {
    let field = match subresource {
        None => None,
        Some(label) => Some(Field::from_label(label).ok_or(Error::Unsupported {
            message: ONLY_FRAME_OR_SLOTS,
        })?),
    };
    let mut predicate = parse_query(query, &[QueryKey::Frame, QueryKey::Slots], ONLY_FRAME_OR_SLOTS)?;
    // the id wins over the size
    if let Some(frame) = predicate.frame() {
        predicate = QueryPredicate::new().with_frame(frame);
    }

    let values: Vec<Value> = walker::matching_slotframes(schedule, &predicate)
        .into_iter()
        .map(|slotframe| match field {
            Some(field) => field.project(slotframe),
            None => object(slotframe),
        })
        .collect();
    if values.is_empty() {
        return Err(Error::NotFound {
            message: "No slotframe was found",
        });
    }

    let single = field.is_none() && predicate.frame().is_some();
    Ok(Response::content(collapse(values, single)))
}

/// Add every slotframe of the body, answering `1` for each one added and
/// `0` for each one refused.
pub(crate) fn post(schedule: &mut Schedule, payload: &[u8]) -> Result<Response, Error> {
    let specs: OneOrMany<SlotframeSpec> = parse_body(payload)?;

    let results: Vec<Value> = specs
        .into_vec()
        .into_iter()
        .map(|SlotframeSpec { frame, slots }| {
            match schedule.add_slotframe(SlotframeId::new(frame), slots) {
                Ok(()) => Value::from(1),
                Err(error) => {
                    debug!("slotframe {frame} of {slots} slots not added: {error}");
                    Value::from(0)
                }
            }
        })
        .collect();

    Ok(Response::new(Status::Changed, Payload::Json(Value::Array(results))))
}

/// Remove one slotframe (`frame` query) or all of them. The statistics of
/// the links removed with them are purged.
pub(crate) fn delete(
    schedule: &mut Schedule,
    pool: &mut StatsPool,
    subresource: Option<&str>,
    query: &str,
) -> Result<Response, Error> {
    if subresource.is_some() {
        return Err(Error::Unsupported {
            message: "Subresources are not supported for DELETE method",
        });
    }
    let predicate = parse_query(query, &[QueryKey::Frame], ONLY_FRAME)?;

    let payload = match predicate.frame() {
        Some(frame) => match schedule.remove_slotframe(frame, pool) {
            Some(removed) => {
                info!("slotframe {frame} deleted");
                Payload::Json(object(&removed))
            }
            None => Payload::Empty,
        },
        None => {
            let removed = schedule.clear(pool);
            info!("{} slotframes deleted", removed.len());
            Payload::Json(removed.iter().map(object).collect())
        }
    };
    Ok(Response::new(Status::Deleted, payload))
}

fn object(slotframe: &Slotframe) -> Value {
    json!({
        "frame": slotframe.id().get(),
        "slots": slotframe.size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_by_frame_is_single() {
        let schedule = schedule();

        let response = get(&schedule, None, "frame=2").unwrap();
        assert_eq!(response.json(), Some(&json!({"frame": 2, "slots": 7})));

        let response = get(&schedule, Some("slots"), "frame=2").unwrap();
        assert_eq!(response.json(), Some(&json!([7])));
    }

    #[test]
    fn get_by_slots() {
        let schedule = schedule();
        let response = get(&schedule, Some("frame"), "slots=101").unwrap();
        assert_eq!(response.json(), Some(&json!([1])));
    }

    #[test]
    fn get_all() {
        let schedule = schedule();
        let response = get(&schedule, None, "").unwrap();
        assert_eq!(
            response.json(),
            Some(&json!([{"frame": 1, "slots": 101}, {"frame": 2, "slots": 7}]))
        );
    }

    #[test]
    fn get_rejects_other_structures() {
        let schedule = schedule();

        let error = get(&schedule, Some("size"), "").unwrap_err();
        assert_eq!(error.status(), Status::NotImplemented);
        assert_eq!(error.to_string(), ONLY_FRAME_OR_SLOTS);

        let error = get(&schedule, None, "slot=3").unwrap_err();
        assert_eq!(error.status(), Status::BadRequest);

        let error = get(&schedule, None, "frame=9").unwrap_err();
        assert_eq!(error.status(), Status::NotFound);
    }

    #[test]
    fn post_one_or_many() {
        let mut schedule = Schedule::new();

        let response = post(&mut schedule, br#"{"frame": 1, "slots": 11}"#).unwrap();
        assert_eq!(response.json(), Some(&json!([1])));

        let response = post(
            &mut schedule,
            br#"[{"frame": 1, "slots": 11}, {"frame": 2, "slots": 0}, {"frame": 3, "slots": 5}]"#,
        )
        .unwrap();
        assert_eq!(response.json(), Some(&json!([0, 0, 1])));
        assert_eq!(schedule.slotframes().count(), 2);
    }

    #[test]
    fn post_garbage() {
        let mut schedule = Schedule::new();
        let error = post(&mut schedule, b"frame=1").unwrap_err();
        assert_eq!(error.status(), Status::BadRequest);
        assert_eq!(error.to_string(), "Can only support JSON payload format");
    }

    #[test]
    fn delete_one() {
        let mut schedule = schedule();
        let mut pool = StatsPool::new(2, Default::default());

        let response = delete(&mut schedule, &mut pool, None, "frame=1").unwrap();
        assert_eq!(response.status(), Status::Deleted);
        assert_eq!(response.json(), Some(&json!({"frame": 1, "slots": 101})));

        let response = delete(&mut schedule, &mut pool, None, "frame=1").unwrap();
        assert_eq!(response.status(), Status::Deleted);
        assert_eq!(*response.payload(), Payload::Empty);
    }

    #[test]
    fn delete_all() {
        let mut schedule = schedule();
        let mut pool = StatsPool::new(2, Default::default());

        let response = delete(&mut schedule, &mut pool, None, "").unwrap();
        assert_eq!(
            response.json(),
            Some(&json!([{"frame": 1, "slots": 101}, {"frame": 2, "slots": 7}]))
        );
        assert!(schedule.is_empty());
    }

    #[test]
    fn delete_rejects_subresources_and_other_queries() {
        let mut schedule = schedule();
        let mut pool = StatsPool::new(2, Default::default());

        let error = delete(&mut schedule, &mut pool, Some("frame"), "").unwrap_err();
        assert_eq!(error.status(), Status::NotImplemented);

        let error = delete(&mut schedule, &mut pool, None, "slots=7").unwrap_err();
        assert_eq!(error.to_string(), ONLY_FRAME);
        assert_eq!(schedule.slotframes().count(), 2);
    }

    fn schedule() -> Schedule {
        let mut schedule = Schedule::new();
        schedule.add_slotframe(SlotframeId::new(1), 101).unwrap();
        schedule.add_slotframe(SlotframeId::new(2), 7).unwrap();
        schedule
    }
}
