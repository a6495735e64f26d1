/*!
# plexi

Management interface of a TSCH node. The schedule of the node and the
statistics measured on its links are exposed as resources answering JSON
to `GET`, `POST` and `DELETE` requests:

| Path | Resource |
|------|----------|
| `6top/slotFrame` | slotframes |
| `6top/cellList` | links |
| `6top/stats` | link statistics |
| `6top/nbrList` | neighbors and their aggregated statistics |

The radio reports its packet events with [`Plexi::on_packet_received`] and
[`Plexi::on_packet_sent`], which feed the statistics.

```
use plexi::{Configuration, Plexi, Request, SlotframeId, Status};
use serde_json::json;

let mut node = Plexi::new(Configuration::default());
node.add_slotframe(SlotframeId::ONE, 11).unwrap();

let response = node.handle(&Request::get("6top/slotFrame").set_query("frame=1"));
assert_eq!(response.status(), Status::Content);
assert_eq!(response.json(), Some(&json!({"frame": 1, "slots": 11})));
```
*/

mod config;
mod error;
mod inbox;
mod message;
mod neighbors;
mod resource;

use self::resource::{link, neighbor, slotframe, stats};
use log::{debug, info};
use plexi_core::{
    schedule::{LinkBuilder, Schedule, ScheduleError, Slotframe},
    stats::{Sample, StatsPool},
};

// convenient re-export of `plexi_core` core objects
pub use plexi_core::{
    LinkAddr, Metric, NeighborStats, SlotframeId,
    schedule::{Link, LinkHandle, LinkOptions, LinkType},
    stats::Storage,
};

pub use self::{
    config::Configuration,
    error::Error,
    inbox::{Delivery, Inbox, InboxError},
    message::{Block1, ContentFormat, ExchangeId, Method, Payload, Request, Response, Status},
    neighbors::NeighborTable,
    resource::Resource,
};

/// A node: its schedule, the statistics of its links and the resources
/// serving them.
///
/// Everything runs to completion on the caller's thread. Requests and
/// packet events are plain method calls and never overlap.
pub struct Plexi {
    configuration: Configuration,

    schedule: Schedule,
    pool: StatsPool,
    neighbors: NeighborTable,

    /// reassembly of block-wise writes to `6top/stats`
    stats_inbox: Inbox,
    /// reassembly of block-wise writes to `6top/cellList`
    links_inbox: Inbox,
}

impl Plexi {
    pub fn new(configuration: Configuration) -> Self {
        let pool = StatsPool::new(configuration.max_statistics, configuration.storage);
        let stats_inbox = Inbox::new(configuration.max_payload);
        let links_inbox = Inbox::new(configuration.max_payload);
        info!(
            "plexi started with room for {} statistics ({:?} storage)",
            configuration.max_statistics, configuration.storage
        );
        Self {
            configuration,
            schedule: Schedule::new(),
            pool,
            neighbors: NeighborTable::new(),
            stats_inbox,
            links_inbox,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn pool(&self) -> &StatsPool {
        &self.pool
    }

    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    /// the neighbor table, for neighbor discovery to fill
    pub fn neighbors_mut(&mut self) -> &mut NeighborTable {
        &mut self.neighbors
    }

    pub fn add_slotframe(&mut self, slotframe: SlotframeId, size: u16) -> Result<(), ScheduleError> {
        self.schedule.add_slotframe(slotframe, size)
    }

    /// Add a link to `slotframe`, configured by `configure`.
    ///
    /// ```
    /// use plexi::{Configuration, LinkOptions, Plexi, SlotframeId};
    ///
    /// let mut node = Plexi::new(Configuration::default());
    /// node.add_slotframe(SlotframeId::ONE, 11).unwrap();
    /// let handle = node
    ///     .add_link(SlotframeId::ONE, |link| {
    ///         link.set_timeslot(3).set_options(LinkOptions::TX)
    ///     })
    ///     .unwrap();
    /// assert_eq!(node.schedule().link(handle).unwrap().timeslot(), 3);
    /// ```
    pub fn add_link<F>(&mut self, slotframe: SlotframeId, configure: F) -> Result<LinkHandle, ScheduleError>
    where
        F: FnOnce(LinkBuilder<'_>) -> LinkBuilder<'_>,
    {
        let Self { schedule, pool, .. } = self;
        configure(schedule.new_link(slotframe)).apply(pool)
    }

    /// Remove a slotframe, purging the statistics of its links.
    pub fn remove_slotframe(&mut self, slotframe: SlotframeId) -> Option<Slotframe> {
        self.schedule.remove_slotframe(slotframe, &mut self.pool)
    }

    /// Remove a link, purging its statistics.
    pub fn remove_link(&mut self, slotframe: SlotframeId, timeslot: u16) -> Option<Link> {
        self.schedule.remove_link(slotframe, timeslot, &mut self.pool)
    }

    /// A packet was received on the link at `timeslot` of `slotframe`.
    ///
    /// Feeds the RSSI, LQI and ASN records of the link. On shared links
    /// the reading kept about `sender` is updated too.
    pub fn on_packet_received(
        &mut self,
        slotframe: SlotframeId,
        timeslot: u16,
        sender: LinkAddr,
        rssi: i16,
        lqi: u16,
        asn: u64,
    ) {
        let Some(link) = self.schedule.link_by_timeslot(slotframe, timeslot) else {
            debug!("packet received on unscheduled timeslot {timeslot} of slotframe {slotframe}");
            return;
        };
        let head = link.stats();
        let sender = link.is_shared().then_some(sender);

        for sample in [Sample::Rssi(rssi), Sample::Lqi(lqi), Sample::Asn(asn)] {
            self.pool.record_sample(head, sample, sender);
        }
    }

    /// A packet was sent on the link at `timeslot` of `slotframe`, after
    /// `transmissions` attempts.
    ///
    /// Only acknowledged packets feed the ETX and PDR records.
    pub fn on_packet_sent(
        &mut self,
        slotframe: SlotframeId,
        timeslot: u16,
        acknowledged: bool,
        transmissions: u8,
    ) {
        if !acknowledged {
            return;
        }
        let Some(link) = self.schedule.link_by_timeslot(slotframe, timeslot) else {
            debug!("packet sent on unscheduled timeslot {timeslot} of slotframe {slotframe}");
            return;
        };
        let head = link.stats();
        self.pool
            .record_sample(head, Sample::Transmissions(transmissions), None);
    }

    /// Serve one request.
    ///
    /// Failures are answered with the error status and the error message
    /// as a text payload, see [`Error::into_response`].
    pub fn handle(&mut self, request: &Request) -> Response {
        let response = match self.dispatch(request) {
            Ok(response) => response,
            Err(error) => {
                debug!(
                    "{:?} {} failed: {error}",
                    request.method(),
                    request.path()
                );
                error.into_response()
            }
        };
        debug!(
            "{:?} {}?{} {}",
            request.method(),
            request.path(),
            request.query(),
            response.status()
        );
        response
    }

    fn dispatch(&mut self, request: &Request) -> Result<Response, Error> {
        let (resource, subresource) = Resource::route(request.path())?;
        if !request.accepts_json() {
            return Err(Error::NotAcceptable);
        }
        let query = request.query();

        match (resource, request.method()) {
            (Resource::Slotframes, Method::Get) => slotframe::get(&self.schedule, subresource, query),
            (Resource::Slotframes, Method::Post) => {
                slotframe::post(&mut self.schedule, request.payload())
            }
            (Resource::Slotframes, Method::Delete) => {
                slotframe::delete(&mut self.schedule, &mut self.pool, subresource, query)
            }

            (Resource::Links, Method::Get) => {
                link::get(&self.schedule, &self.pool, subresource, query)
            }
            (Resource::Links, Method::Post) => match receive(&mut self.links_inbox, request)? {
                Delivery::Continue => Ok(Response::new(Status::Continue, Payload::Empty)),
                Delivery::Complete(payload) => {
                    link::post(&mut self.schedule, &mut self.pool, &payload)
                }
            },
            (Resource::Links, Method::Delete) => {
                link::delete(&mut self.schedule, &mut self.pool, subresource, query)
            }

            (Resource::Stats, Method::Get) => {
                stats::get(&self.schedule, &self.pool, subresource, query)
            }
            (Resource::Stats, Method::Post) => match receive(&mut self.stats_inbox, request)? {
                Delivery::Continue => Ok(Response::new(Status::Continue, Payload::Empty)),
                Delivery::Complete(payload) => {
                    stats::post(&mut self.schedule, &mut self.pool, &payload)
                }
            },
            (Resource::Stats, Method::Delete) => {
                stats::delete(&mut self.schedule, &mut self.pool, subresource, query)
            }

            (Resource::Neighbors, Method::Get) => neighbor::get(
                &self.schedule,
                &self.pool,
                &self.neighbors,
                subresource,
                query,
            ),

            (_, method) => Err(Error::MethodNotAllowed { method }),
        }
    }
}

fn receive(inbox: &mut Inbox, request: &Request) -> Result<Delivery, Error> {
    Ok(inbox.receive(request.exchange(), request.block1(), request.payload())?)
}
