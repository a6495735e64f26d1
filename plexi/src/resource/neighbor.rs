//! `6top/nbrList`: the neighbors of the node and their aggregated
//! statistics, see [`NeighborAggregator`].

use crate::{
    error::Error,
    message::Response,
    neighbors::NeighborTable,
    resource::{collapse, render_value},
};
use plexi_core::{
    NeighborAggregator, NeighborStats,
    query::{QueryError, QueryKey, QueryPredicate},
    schedule::Schedule,
    stats::{Metric, StatsPool},
};
use serde_json::Value;

const ONLY_NEIGHBOR_QUERIES: &str = "Supports only queries on neighbor address";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Neighbor,
    Metric(Metric),
}

impl Field {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "tna" => Some(Self::Neighbor),
            _ => label.parse().ok().map(Self::Metric),
        }
    }
}

pub(crate) fn get(
    schedule: &Schedule,
    pool: &StatsPool,
    neighbors: &NeighborTable,
    subresource: Option<&str>,
    query: &str,
) -> Result<Response, Error> {
    let predicate =
        QueryPredicate::parse(query, &[QueryKey::Neighbor]).map_err(|error| match error {
            QueryError::InvalidAddress(_) => Error::bad_request("Bad node address format"),
            _ => Error::bad_request(ONLY_NEIGHBOR_QUERIES),
        })?;
    let field = match subresource {
        None => None,
        Some(label) => Some(
            Field::from_label(label).ok_or_else(|| Error::bad_request(ONLY_NEIGHBOR_QUERIES))?,
        ),
    };

    let selected = predicate.neighbor();
    if selected.is_some_and(|selected| !neighbors.contains(selected)) {
        return Err(Error::NotFound {
            message: "No neighbor was found",
        });
    }

    let mut values = Vec::new();
    for neighbor in neighbors.iter() {
        if selected.is_some_and(|selected| selected != neighbor) {
            continue;
        }
        match field {
            Some(Field::Neighbor) => values.push(Value::from(neighbor.to_string())),
            Some(Field::Metric(metric)) => {
                let stats = NeighborAggregator::collect(schedule, pool, neighbor);
                if let Some(value) = stats.get(metric) {
                    values.push(render_value(Some(metric), value));
                }
            }
            None => values.push(object(NeighborAggregator::collect(schedule, pool, neighbor))),
        }
    }

    // projections are always listed
    let single = field.is_none() && selected.is_some();
    Ok(Response::content(collapse(values, single)))
}

fn object(stats: NeighborStats) -> Value {
    let mut object = serde_json::Map::new();
    object.insert("tna".to_owned(), Value::from(stats.neighbor().to_string()));
    for metric in [Metric::Rssi, Metric::Lqi, Metric::Etx, Metric::Pdr, Metric::Asn] {
        if let Some(value) = stats.get(metric) {
            object.insert(metric.label().to_owned(), render_value(Some(metric), value));
        }
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexi_core::{
        LinkAddr,
        schedule::{LinkOptions, SlotframeId},
        stats::{MetaCodec as _, Sample, Storage},
    };
    use serde_json::json;

    const FIRST: &str = "215:8d00:57:6466";
    const SECOND: &str = "216:8d00:57:6467";

    #[test]
    fn list_without_samples() {
        let (schedule, pool, neighbors) = node();

        let response = get(&schedule, &pool, &neighbors, None, "").unwrap();
        assert_eq!(response.json(), Some(&json!([{"tna": FIRST}, {"tna": SECOND}])));

        let response = get(&schedule, &pool, &neighbors, Some("rssi"), "").unwrap();
        assert_eq!(response.json(), Some(&json!([])));

        let response = get(&schedule, &pool, &neighbors, Some("tna"), "").unwrap();
        assert_eq!(response.json(), Some(&json!([FIRST, SECOND])));
    }

    #[test]
    fn aggregated_metrics() {
        let (schedule, mut pool, neighbors) = node();
        let head = schedule.link_by_timeslot(SlotframeId::ONE, 1).unwrap().stats();
        pool.record_sample(head, Sample::Rssi(-60), None);
        pool.record_sample(head, Sample::Asn(0x1_2345), None);

        let response = get(&schedule, &pool, &neighbors, None, &format!("tna={FIRST}")).unwrap();
        assert_eq!(
            response.json(),
            Some(&json!({"tna": FIRST, "rssi": -60, "asn": "2345"}))
        );

        let response = get(&schedule, &pool, &neighbors, Some("asn"), "").unwrap();
        assert_eq!(response.json(), Some(&json!(["2345"])));
    }

    #[test]
    fn projection_of_one_neighbor_is_a_list() {
        let (schedule, mut pool, neighbors) = node();
        let query = format!("tna={FIRST}");

        let response = get(&schedule, &pool, &neighbors, Some("rssi"), &query).unwrap();
        assert_eq!(response.json(), Some(&json!([])));

        let head = schedule.link_by_timeslot(SlotframeId::ONE, 1).unwrap().stats();
        pool.record_sample(head, Sample::Rssi(-70), None);
        let response = get(&schedule, &pool, &neighbors, Some("rssi"), &query).unwrap();
        assert_eq!(response.json(), Some(&json!([-70])));

        let response = get(&schedule, &pool, &neighbors, Some("tna"), &query).unwrap();
        assert_eq!(response.json(), Some(&json!([FIRST])));

        // known neighbor without links
        let query = format!("tna={SECOND}");
        let response = get(&schedule, &pool, &neighbors, Some("rssi"), &query).unwrap();
        assert_eq!(response.json(), Some(&json!([])));
        let response = get(&schedule, &pool, &neighbors, None, &query).unwrap();
        assert_eq!(response.json(), Some(&json!({"tna": SECOND})));
    }

    #[test]
    fn errors() {
        let (schedule, pool, neighbors) = node();
        let cases = [
            (None, "tna=zz", "Bad node address format"),
            (None, "frame=1", ONLY_NEIGHBOR_QUERIES),
            (Some("snr"), "", ONLY_NEIGHBOR_QUERIES),
        ];
        for (subresource, query, message) in cases {
            let error = get(&schedule, &pool, &neighbors, subresource, query).unwrap_err();
            assert_eq!(error.to_string(), message);
        }

        let error = get(&schedule, &pool, &neighbors, None, "tna=217:8d00:57:6468").unwrap_err();
        assert_eq!(error.to_string(), "No neighbor was found");
    }

    fn addr(text: &str) -> LinkAddr {
        text.parse().unwrap()
    }

    fn node() -> (Schedule, StatsPool, NeighborTable) {
        let mut schedule = Schedule::new();
        let mut pool = StatsPool::new(4, Storage::Plain);
        let mut neighbors = NeighborTable::new();
        neighbors.insert(addr(FIRST));
        neighbors.insert(addr(SECOND));

        schedule.add_slotframe(SlotframeId::ONE, 11).unwrap();
        schedule
            .new_link(SlotframeId::ONE)
            .set_timeslot(1)
            .set_options(LinkOptions::RX)
            .set_neighbor(addr(FIRST))
            .apply(&mut pool)
            .unwrap();
        let link = schedule.link_by_timeslot_mut(SlotframeId::ONE, 1).unwrap();
        for metric in [Metric::Rssi, Metric::Asn] {
            let mut meta = pool.blank_meta();
            meta.set_metric(Some(metric));
            let handle = pool.allocate(meta).unwrap();
            pool.append(link.stats_mut(), handle);
        }
        (schedule, pool, neighbors)
    }
}
