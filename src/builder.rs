//! The sweep-line construction engine.
//!
//! Sites are collected up front, sorted and deduplicated, then consumed by
//! a single left-to-right sweep. The sweep maintains the beach line and a
//! queue of candidate circle events; each site event inserts arcs, each
//! circle event collapses one and materializes a Voronoi vertex. Circle
//! events invalidated by beach-line changes are deactivated in place and
//! drained when they reach the queue front.

use std::collections::BinaryHeap;

use crate::beach::{ArcData, ArcId, ArcKey, BeachLine};
use crate::circle::CircleQueue;
use crate::diagram::Diagram;
use crate::geom::{Point, Segment};
use crate::predicates;
use crate::site::{SiteEvent, SourceCategory};

/// A temporary beach-line entry bridging a segment's start arc to its
/// still-unswept end, keyed by the endpoint that will retire it.
struct Bridge {
    point: Point,
    arc: ArcId,
}

// Reversed order: the heap's top is the *smallest* endpoint, the next
// one the sweep will reach.
impl Ord for Bridge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.point.cmp(&self.point)
    }
}

impl PartialOrd for Bridge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Bridge {
    fn eq(&self, other: &Self) -> bool {
        self.point == other.point
    }
}

impl Eq for Bridge {}

/// Computes the Voronoi diagram of a set of points and non-crossing
/// segments with integer coordinates.
///
/// ```
/// use fortune::Builder;
///
/// let mut builder = Builder::new();
/// builder.insert_point((0, 0));
/// builder.insert_point((10, 0));
/// let diagram = builder.construct();
/// assert_eq!(diagram.cells().len(), 2);
/// ```
///
/// Segments may share endpoints but must not otherwise intersect; that
/// precondition is the caller's responsibility.
#[derive(Default)]
pub struct Builder {
    sites: Vec<SiteEvent>,
    input_index: usize,
    beach: BeachLine,
    circles: CircleQueue,
    bridges: BinaryHeap<Bridge>,
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    /// Adds a point site. Returns the source index future cells will
    /// refer to.
    pub fn insert_point(&mut self, point: impl Into<Point>) -> usize {
        let point = point.into();
        let index = self.input_index;
        self.input_index += 1;
        self.sites
            .push(SiteEvent::new_point(point, index, SourceCategory::SinglePoint));
        index
    }

    /// Adds a segment site. One segment contributes three cells: both
    /// endpoints and the open segment, all sharing the returned source
    /// index.
    pub fn insert_segment(&mut self, segment: impl Into<Segment>) -> usize {
        let segment = segment.into();
        let index = self.input_index;
        self.input_index += 1;
        let p0 = segment.start;
        let p1 = segment.end;
        self.sites
            .push(SiteEvent::new_point(p0, index, SourceCategory::SegmentStart));
        self.sites
            .push(SiteEvent::new_point(p1, index, SourceCategory::SegmentEnd));
        // Store the open segment from its lexicographically smaller end.
        let site = if p0 < p1 {
            SiteEvent::new_segment(p0, p1, index, SourceCategory::SegmentInitial)
        } else {
            SiteEvent::new_segment(p1, p0, index, SourceCategory::SegmentReverse)
        };
        self.sites.push(site);
        index
    }

    /// Drops all collected input.
    pub fn clear(&mut self) {
        self.sites.clear();
        self.input_index = 0;
    }

    /// Runs the sweep and returns the finished diagram.
    ///
    /// May be called again after inserting more input; every call
    /// rebuilds from the full accumulated site set.
    pub fn construct(&mut self) -> Diagram {
        let mut output = Diagram::new();
        output.reserve(self.sites.len());

        self.beach.clear();
        self.circles.clear();
        self.bridges.clear();

        let mut cursor = self.init_site_queue();
        self.init_beach_line(&mut cursor, &mut output);

        while !self.circles.is_empty() || cursor != self.sites.len() {
            if self.circles.is_empty() {
                self.process_site_event(&mut cursor, &mut output);
            } else if cursor == self.sites.len() {
                self.process_circle_event(&mut output);
            } else {
                let site_first = {
                    let (_, top) = self.circles.peek().unwrap();
                    predicates::site_precedes_circle(
                        &self.sites[cursor],
                        top.lower_x.into_inner(),
                        top.y.into_inner(),
                    )
                };
                if site_first {
                    self.process_site_event(&mut cursor, &mut output);
                } else {
                    self.process_circle_event(&mut output);
                }
            }
            self.circles.drain_inactive();
            #[cfg(debug_assertions)]
            self.beach.check_invariants();
        }

        debug_assert!(
            self.bridges.is_empty(),
            "a segment endpoint never retired its bridge"
        );
        self.beach.clear();
        output.build();
        output
    }

    /// Sorts the site events into sweep order, folds geometric
    /// duplicates, and indexes the survivors.
    fn init_site_queue(&mut self) -> usize {
        self.sites.sort_by(predicates::site_cmp);
        self.sites.dedup();
        for (index, site) in self.sites.iter_mut().enumerate() {
            site.set_sorted_index(index);
        }
        0
    }

    fn init_beach_line(&mut self, cursor: &mut usize, output: &mut Diagram) {
        if self.sites.is_empty() {
            return;
        }
        if self.sites.len() == 1 {
            output.process_single_site(&self.sites[0]);
            *cursor += 1;
            return;
        }

        // Skip the maximal leading column of sites stacked on the first
        // site's x: the first site itself, plus any vertical segments
        // and points sharing that column.
        let mut skip = 0;
        while *cursor < self.sites.len()
            && self.sites[*cursor].point0().x == self.sites[0].point0().x
            && predicates::is_vertical(&self.sites[*cursor])
        {
            *cursor += 1;
            skip += 1;
        }

        if skip == 1 {
            let first = self.sites[*cursor - 1];
            let second = self.sites[*cursor];
            let _ = self.insert_new_arc(first, first, second, 0, output);
            *cursor += 1;
        } else {
            // A collinear vertical column: install the bisector chain
            // directly, one node per adjacent pair.
            for i in 0..skip - 1 {
                let first = self.sites[i];
                let second = self.sites[i + 1];
                let (edge, _) = output.insert_edge_pair(&first, &second);
                self.beach.insert_at(
                    i,
                    ArcKey::new(first, second),
                    ArcData {
                        edge: Some(edge),
                        circle: None,
                    },
                );
            }
        }
    }

    fn process_site_event(&mut self, cursor: &mut usize, output: &mut Diagram) {
        let site_event = self.sites[*cursor];
        let mut last = *cursor + 1;

        if !site_event.is_segment() {
            // This point is the endpoint some segments have been waiting
            // for: retire their bridge nodes.
            while let Some(top) = self.bridges.peek() {
                if top.point != site_event.point0() {
                    break;
                }
                let arc = top.arc;
                let _ = self.bridges.pop();
                self.beach.erase(arc);
            }
        } else {
            // Segment sites sharing this start point are processed in one
            // run against the same beach-line position.
            while last < self.sites.len()
                && self.sites[last].is_segment()
                && self.sites[last].point0() == site_event.point0()
            {
                last += 1;
            }
        }

        let probe = ArcKey::new(site_event, site_event);
        let pos = self.beach.lower_bound(&probe);

        while *cursor != last {
            let mut site = self.sites[*cursor];

            if pos == self.beach.len() {
                // The new arc lands beyond the rightmost arc.
                let last_id = self.beach.at(pos - 1);
                let enclosing = self.beach.key(last_id).right;
                let outer = self.beach.key(last_id).left;
                let new_left = self.insert_new_arc(enclosing, enclosing, site, pos, output);
                self.activate_circle(outer, enclosing, site, new_left);
            } else if pos == 0 {
                // The new arc lands before the leftmost arc.
                let first_id = self.beach.at(0);
                let enclosing = self.beach.key(first_id).left;
                let first_right = self.beach.key(first_id).right;
                let _ = self.insert_new_arc(enclosing, enclosing, site, 0, output);
                if site.is_segment() {
                    let _ = site.inverse();
                }
                self.activate_circle(site, enclosing, first_right, first_id);
            } else {
                // The new arc splits the arc above it.
                let right_id = self.beach.at(pos);
                let arc2 = self.beach.key(right_id).left;
                let site3 = self.beach.key(right_id).right;
                self.deactivate_circle(right_id);

                let left_id = self.beach.at(pos - 1);
                let arc1 = self.beach.key(left_id).right;
                let site1 = self.beach.key(left_id).left;

                let new_left = self.insert_new_arc(arc1, arc2, site, pos, output);
                self.activate_circle(site1, arc1, site, new_left);
                if site.is_segment() {
                    let _ = site.inverse();
                }
                self.activate_circle(site, arc2, site3, right_id);
            }
            // Whatever branch ran, the freshly inserted left node sits at
            // `pos`; the next site in the run splits relative to it.
            *cursor += 1;
        }
    }

    /// Collapses the arc between two bisectors into a Voronoi vertex.
    ///
    /// With the triple (A, B, C) and nodes (A, B), (B, C): the (B, C)
    /// node is erased and the (A, B) node's key is rewritten to (A, C)
    /// in place. The rewrite preserves the node's order position because
    /// the vanished arc sat exactly between the old neighbors.
    fn process_circle_event(&mut self, output: &mut Diagram) {
        let (circle_id, event) = {
            let (id, event) = self
                .circles
                .peek()
                .expect("circle processing on an empty queue");
            (id, *event)
        };
        assert!(
            self.circles.is_active(circle_id),
            "inactive circle event at the queue front"
        );

        let arc_id = event.arc;
        let pos = self.beach.position(arc_id);
        assert!(pos > 0, "circle event on the leftmost beach-line node");

        let site3 = self.beach.key(arc_id).right;
        let bisector2 = self
            .beach
            .data(arc_id)
            .edge
            .expect("circle event collapsed onto a bridge node");

        let first_id = self.beach.at(pos - 1);
        let site1 = self.beach.key(first_id).left;
        let bisector1 = self
            .beach
            .data(first_id)
            .edge
            .expect("circle event next to a bridge node");

        // A segment ending on the outer point flips to keep the key
        // orientation consistent.
        let site3 = if !site1.is_segment()
            && site3.is_segment()
            && site3.point1() == site1.point0()
        {
            site3.inversed()
        } else {
            site3
        };

        self.beach.set_right_site(first_id, site3);
        let (edge, _) = output.insert_vertex_and_edge(&site1, &site3, &event, bisector1, bisector2);
        self.beach.data_mut(first_id).edge = Some(edge);
        self.beach.erase(arc_id);
        self.circles.pop();

        let pos = pos - 1; // position of the rewritten (A, C) node

        // The collapse created two new adjacencies; either may converge.
        if pos > 0 {
            self.deactivate_circle(first_id);
            let left_id = self.beach.at(pos - 1);
            let outer_left = self.beach.key(left_id).left;
            self.activate_circle(outer_left, site1, site3, first_id);
        }
        if pos + 1 < self.beach.len() {
            let right_id = self.beach.at(pos + 1);
            self.deactivate_circle(right_id);
            let outer_right = self.beach.key(right_id).right;
            self.activate_circle(site1, site3, outer_right, right_id);
        }
    }

    /// Splits the enclosing arc around a new site: inserts the (arc1,
    /// site) and (site, arc2) nodes at `pos` (plus a bridge node for
    /// segments) and the output edge pair for the new bisector. Returns
    /// the left node's handle.
    fn insert_new_arc(
        &mut self,
        arc1: SiteEvent,
        arc2: SiteEvent,
        site: SiteEvent,
        pos: usize,
        output: &mut Diagram,
    ) -> ArcId {
        let left_key = ArcKey::new(arc1, site);
        let right_key = if site.is_segment() {
            ArcKey::new(site.inversed(), arc2)
        } else {
            ArcKey::new(site, arc2)
        };

        let (edge1, edge2) = output.insert_edge_pair(&arc2, &site);

        let _ = self.beach.insert_at(
            pos,
            right_key,
            ArcData {
                edge: Some(edge2),
                circle: None,
            },
        );
        if site.is_segment() {
            // The temporary bisector between the segment's two halves;
            // it disappears when the far endpoint is swept.
            let bridge_id = self
                .beach
                .insert_at(pos, ArcKey::new(site, site.inversed()), ArcData::default());
            self.bridges.push(Bridge {
                point: site.point1(),
                arc: bridge_id,
            });
        }
        self.beach.insert_at(
            pos,
            left_key,
            ArcData {
                edge: Some(edge1),
                circle: None,
            },
        )
    }

    fn activate_circle(
        &mut self,
        site1: SiteEvent,
        site2: SiteEvent,
        site3: SiteEvent,
        node: ArcId,
    ) {
        if let Some(candidate) = predicates::circle_formation(&site1, &site2, &site3) {
            let id = self.circles.push(&candidate, node);
            self.beach.data_mut(node).circle = Some(id);
        }
    }

    fn deactivate_circle(&mut self, node: ArcId) {
        if let Some(id) = self.beach.data_mut(node).circle.take() {
            self.circles.deactivate(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_contributes_three_sites() {
        let mut builder = Builder::new();
        builder.insert_segment((0, 0, 10, 10));
        assert_eq!(builder.sites.len(), 3);
    }

    #[test]
    fn reverse_segments_store_the_smaller_endpoint_first() {
        let mut builder = Builder::new();
        builder.insert_segment((10, 10, 0, 0));
        let segment = builder.sites.iter().find(|s| s.is_segment()).unwrap();
        assert_eq!(segment.point0(), Point::new(0, 0));
        assert_eq!(segment.category(), SourceCategory::SegmentReverse);
    }

    #[test]
    fn duplicate_sites_fold() {
        let mut builder = Builder::new();
        builder.insert_point((5, 5));
        builder.insert_point((5, 5));
        builder.insert_point((7, 5));
        let _ = builder.init_site_queue();
        assert_eq!(builder.sites.len(), 2);
        assert_eq!(builder.sites[0].sorted_index(), 0);
        assert_eq!(builder.sites[1].sorted_index(), 1);
    }

    #[test]
    fn shared_endpoints_fold_into_one_cell_site() {
        let mut builder = Builder::new();
        builder.insert_segment((0, 0, 10, 0));
        builder.insert_segment((10, 0, 10, 10));
        let _ = builder.init_site_queue();
        // 2 segments + 3 unique endpoints.
        assert_eq!(builder.sites.len(), 5);
    }
}
