//! The beach line.
//!
//! An ordered sequence of bisector nodes, keyed by the directed pair of
//! sites whose arcs meet there. The ordering is not a stored scalar: two
//! keys compare through a geometric predicate that is only meaningful
//! while one of them involves a site on the sweep line, so the structure
//! is a plain sorted `Vec` searched with that predicate, plus an arena
//! that gives every node a handle that survives insertions and removals.
//! Pending circle events and endpoint bridges hold those handles.

use crate::circle::CircleId;
use crate::diagram::EdgeId;
use crate::predicates;
use crate::site::SiteEvent;

/// Stable handle to a beach-line node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ArcId(usize);

impl ArcId {
    #[cfg(test)]
    pub(crate) fn for_tests(raw: usize) -> Self {
        ArcId(raw)
    }
}

impl std::fmt::Debug for ArcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// A directed pair of neighboring sites; the bisector between them.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ArcKey {
    pub left: SiteEvent,
    pub right: SiteEvent,
}

impl ArcKey {
    pub(crate) fn new(left: SiteEvent, right: SiteEvent) -> Self {
        ArcKey { left, right }
    }
}

/// Payload of a beach-line node. `edge` is `None` only for the temporary
/// bridge installed between a segment's start and its still-unswept end.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ArcData {
    pub edge: Option<EdgeId>,
    pub circle: Option<CircleId>,
}

struct ArcNode {
    key: ArcKey,
    data: ArcData,
}

#[derive(Default)]
pub(crate) struct BeachLine {
    nodes: Vec<ArcNode>,
    order: Vec<ArcId>,
}

impl BeachLine {
    pub(crate) fn new() -> Self {
        BeachLine::default()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn at(&self, position: usize) -> ArcId {
        self.order[position]
    }

    pub(crate) fn key(&self, id: ArcId) -> &ArcKey {
        &self.nodes[id.0].key
    }

    pub(crate) fn data(&self, id: ArcId) -> &ArcData {
        &self.nodes[id.0].data
    }

    pub(crate) fn data_mut(&mut self, id: ArcId) -> &mut ArcData {
        &mut self.nodes[id.0].data
    }

    /// The one permitted in-place key mutation: rewriting the right site
    /// when the arc between the key's sites collapses. The node's order
    /// position is unchanged by construction.
    pub(crate) fn set_right_site(&mut self, id: ArcId, site: SiteEvent) {
        self.nodes[id.0].key.right = site;
    }

    /// Index of the first node whose key is not below the probe key, with
    /// the probe's newest site on the sweep line.
    pub(crate) fn lower_bound(&self, probe: &ArcKey) -> usize {
        self.order.partition_point(|&id| {
            let key = &self.nodes[id.0].key;
            predicates::node_lt((&key.left, &key.right), (&probe.left, &probe.right))
        })
    }

    pub(crate) fn insert_at(&mut self, position: usize, key: ArcKey, data: ArcData) -> ArcId {
        let id = ArcId(self.nodes.len());
        self.nodes.push(ArcNode { key, data });
        self.order.insert(position, id);
        id
    }

    pub(crate) fn erase(&mut self, id: ArcId) {
        let position = self.position(id);
        self.order.remove(position);
    }

    /// Current order position of a node. Linear scan; the beach line is
    /// touched a constant number of times per event.
    pub(crate) fn position(&self, id: ArcId) -> usize {
        self.order
            .iter()
            .position(|&other| other == id)
            .expect("beach-line node was already erased")
    }

    /// Checks the alternation invariant: consecutive nodes share exactly
    /// the site between their arcs.
    #[cfg(debug_assertions)]
    pub(crate) fn check_invariants(&self) {
        for pair in self.order.windows(2) {
            let a = &self.nodes[pair[0].0].key;
            let b = &self.nodes[pair[1].0].key;
            assert!(
                a.right.sorted_index() == b.left.sorted_index(),
                "beach-line alternation broken between {:?} and {:?}",
                a,
                b,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point;
    use crate::site::SourceCategory;

    fn site(x: i32, y: i32, sorted: usize) -> SiteEvent {
        let mut s = SiteEvent::new_point(Point::new(x, y), 0, SourceCategory::SinglePoint);
        s.set_sorted_index(sorted);
        s
    }

    #[test]
    fn handles_survive_insert_and_erase() {
        let mut beach = BeachLine::new();
        let a = site(0, 0, 0);
        let b = site(1, 5, 1);
        let c = site(2, -5, 2);

        let n0 = beach.insert_at(0, ArcKey::new(a, b), ArcData::default());
        let n1 = beach.insert_at(1, ArcKey::new(b, c), ArcData::default());
        let n2 = beach.insert_at(2, ArcKey::new(c, a), ArcData::default());

        assert_eq!(beach.position(n2), 2);
        beach.erase(n1);
        assert_eq!(beach.len(), 2);
        assert_eq!(beach.position(n0), 0);
        assert_eq!(beach.position(n2), 1);
        assert_eq!(beach.key(n2).left.sorted_index(), 2);
    }
}
