//! Visit the links of a [`Schedule`] selected by a [`QueryPredicate`].
//!
//! Only the slotframe and link filters of the predicate are used here; the
//! record filters are applied by whoever walks the statistics chains.

use crate::{
    query::QueryPredicate,
    schedule::{Link, Schedule, Slotframe},
};

/// Call `visitor` on every link matching `predicate`, in schedule order.
///
/// With a frame filter the slotframe is looked up directly instead of
/// scanned, with a timeslot filter the link is too.
///
/// ```
/// use plexi_core::{
///     query::QueryPredicate,
///     schedule::{Schedule, SlotframeId},
///     walker,
/// };
///
/// let mut schedule = Schedule::new();
/// schedule.add_slotframe(SlotframeId::ONE, 11).unwrap();
/// for timeslot in [1, 2, 3] {
///     schedule
///         .new_link(SlotframeId::ONE)
///         .set_timeslot(timeslot)
///         .set_channel_offset(timeslot % 2)
///         .apply(&mut ())
///         .unwrap();
/// }
///
/// let mut seen = Vec::new();
/// walker::for_each_match(&schedule, &QueryPredicate::new().with_channel(1), |link| {
///     seen.push(link.timeslot())
/// });
/// assert_eq!(seen, [1, 3]);
/// ```
pub fn for_each_match<'a, F>(schedule: &'a Schedule, predicate: &QueryPredicate, mut visitor: F)
where
    F: FnMut(&'a Link),
{
    for slotframe in slotframes(schedule, predicate) {
        match predicate.timeslot() {
            Some(timeslot) => {
                if let Some(link) = slotframe.link_by_timeslot(timeslot)
                    && predicate.matches_link(link)
                {
                    visitor(link);
                }
            }
            None => slotframe
                .links()
                .filter(|link| predicate.matches_link(link))
                .for_each(&mut visitor),
        }
    }
}

/// Mutable variant of [`for_each_match`] that stops at the first error.
///
/// Links visited before the failing one keep whatever the visitor did to
/// them.
pub fn try_for_each_match_mut<F, E>(
    schedule: &mut Schedule,
    predicate: &QueryPredicate,
    mut visitor: F,
) -> Result<(), E>
where
    F: FnMut(&mut Link) -> Result<(), E>,
{
    let (direct, scan) = match predicate.frame() {
        Some(frame) => (schedule.slotframe_mut(frame), None),
        None => (None, Some(schedule.slotframes_mut())),
    };
    for slotframe in direct.into_iter().chain(scan.into_iter().flatten()) {
        if !predicate.matches_slotframe(slotframe) {
            continue;
        }
        match predicate.timeslot() {
            Some(timeslot) => {
                if let Some(link) = slotframe.link_by_timeslot_mut(timeslot)
                    && predicate.matches_link(link)
                {
                    visitor(link)?;
                }
            }
            None => {
                for link in slotframe.links_mut() {
                    if predicate.matches_link(link) {
                        visitor(link)?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// every link matching `predicate`, in schedule order
pub fn matching_links<'a>(schedule: &'a Schedule, predicate: &QueryPredicate) -> Vec<&'a Link> {
    let mut links = Vec::new();
    for_each_match(schedule, predicate, |link| links.push(link));
    links
}

/// the slotframes matching `predicate`, in schedule order
pub fn matching_slotframes<'a>(
    schedule: &'a Schedule,
    predicate: &QueryPredicate,
) -> Vec<&'a Slotframe> {
    slotframes(schedule, predicate).collect()
}

fn slotframes<'a>(
    schedule: &'a Schedule,
    predicate: &QueryPredicate,
) -> impl Iterator<Item = &'a Slotframe> {
    let (direct, scan) = match predicate.frame() {
        Some(frame) => (schedule.slotframe(frame), None),
        None => (None, Some(schedule.slotframes())),
    };
    direct
        .into_iter()
        .chain(scan.into_iter().flatten())
        .filter(move |slotframe| predicate.matches_slotframe(slotframe))
}
