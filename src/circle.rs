//! The circle-event queue.
//!
//! Circle events are kept in an arena and ordered by an immutable key set
//! `(lower_x, y, id)` in a `BTreeSet`. Events never move, so the handles
//! stored inside beach-line nodes stay valid for the whole sweep; an event
//! invalidated by a beach-line change is only *marked* inactive and is
//! dropped when it surfaces at the front of the queue.

use std::collections::BTreeSet;

use ordered_float::NotNan;

use crate::beach::ArcId;
use crate::predicates::Candidate;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CircleId(usize);

impl std::fmt::Debug for CircleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CircleEvent {
    pub x: NotNan<f64>,
    pub y: NotNan<f64>,
    pub lower_x: NotNan<f64>,
    pub is_site_point: bool,
    /// The beach-line node owning the (B, C) bisector of the triple.
    pub arc: ArcId,
}

#[derive(Default)]
pub(crate) struct CircleQueue {
    events: Vec<CircleEvent>,
    active: Vec<bool>,
    // Fires in (lower_x, y) order; the id makes keys unique.
    order: BTreeSet<(NotNan<f64>, NotNan<f64>, usize)>,
}

impl CircleQueue {
    pub(crate) fn new() -> Self {
        CircleQueue::default()
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
        self.active.clear();
        self.order.clear();
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn push(&mut self, candidate: &Candidate, arc: ArcId) -> CircleId {
        let id = CircleId(self.events.len());
        // Formation rejected non-finite candidates already.
        let ev = CircleEvent {
            x: NotNan::new(candidate.x).unwrap(),
            y: NotNan::new(candidate.y).unwrap(),
            lower_x: NotNan::new(candidate.lower_x).unwrap(),
            is_site_point: candidate.is_site_point,
            arc,
        };
        self.events.push(ev);
        self.active.push(true);
        self.order.insert((ev.lower_x, ev.y, id.0));
        id
    }

    pub(crate) fn peek(&self) -> Option<(CircleId, &CircleEvent)> {
        self.order
            .iter()
            .next()
            .map(|&(_, _, id)| (CircleId(id), &self.events[id]))
    }

    pub(crate) fn is_active(&self, id: CircleId) -> bool {
        self.active[id.0]
    }

    pub(crate) fn deactivate(&mut self, id: CircleId) {
        self.active[id.0] = false;
    }

    /// Removes the front event, active or not.
    pub(crate) fn pop(&mut self) {
        let front = *self
            .order
            .iter()
            .next()
            .expect("pop on an empty circle queue");
        self.order.remove(&front);
        self.active[front.2] = false;
    }

    /// Drops deactivated events sitting at the front of the queue.
    pub(crate) fn drain_inactive(&mut self) {
        while let Some(&(lx, y, id)) = self.order.iter().next() {
            if self.active[id] {
                break;
            }
            self.order.remove(&(lx, y, id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(x: f64, y: f64, lower_x: f64) -> Candidate {
        Candidate {
            x,
            y,
            lower_x,
            is_site_point: false,
        }
    }

    #[test]
    fn fires_in_lower_x_then_y_order() {
        let mut q = CircleQueue::new();
        let arc = ArcId::for_tests(0);
        q.push(&candidate(0.0, 5.0, 2.0), arc);
        q.push(&candidate(0.0, -1.0, 1.0), arc);
        q.push(&candidate(0.0, -2.0, 1.0), arc);

        let (_, first) = q.peek().unwrap();
        assert_eq!(first.lower_x.into_inner(), 1.0);
        assert_eq!(first.y.into_inner(), -2.0);
        q.pop();
        let (_, second) = q.peek().unwrap();
        assert_eq!(second.y.into_inner(), -1.0);
    }

    #[test]
    fn deactivated_events_drain_from_the_front() {
        let mut q = CircleQueue::new();
        let arc = ArcId::for_tests(0);
        let a = q.push(&candidate(0.0, 0.0, 1.0), arc);
        let b = q.push(&candidate(0.0, 0.0, 2.0), arc);
        q.deactivate(a);
        q.drain_inactive();
        let (front, _) = q.peek().unwrap();
        assert_eq!(front, b);
        assert_eq!(q.len(), 1);
    }
}
