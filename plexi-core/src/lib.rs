pub mod addr;
pub mod aggregate;
pub mod defaults;
pub mod query;
pub mod schedule;
pub mod stats;
pub mod walker;

pub use self::{
    addr::LinkAddr,
    aggregate::{NeighborAggregator, NeighborStats},
    query::{QueryKey, QueryPredicate},
    schedule::{Schedule, SlotframeId},
    stats::{Metric, StatsPool},
};
