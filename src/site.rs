//! Site events.
//!
//! Every input point becomes one site; every input segment becomes three
//! (both endpoints plus the open segment itself, which simplifies output
//! construction). The segment site's stored direction starts at the
//! lexicographically smaller endpoint; during the sweep the builder flips
//! the `inverse` flag (and swaps the stored endpoints) whenever the
//! logical direction of the bisector it participates in reverses.

use crate::geom::Point;
use serde::Serialize;

/// The provenance of a Voronoi cell: which piece of input geometry owns it.
///
/// The declaration order is meaningful: it is the tiebreak used when
/// several sites share a coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SourceCategory {
    /// A free-standing input point.
    SinglePoint,
    /// The first endpoint of an input segment, in insertion order.
    SegmentStart,
    /// The second endpoint of an input segment, in insertion order.
    SegmentEnd,
    /// An open segment stored in its insertion direction.
    SegmentInitial,
    /// An open segment stored opposite to its insertion direction.
    SegmentReverse,
}

impl SourceCategory {
    /// True for the two open-segment categories.
    pub fn is_segment(self) -> bool {
        matches!(
            self,
            SourceCategory::SegmentInitial | SourceCategory::SegmentReverse
        )
    }
}

#[derive(Clone, Copy)]
pub(crate) struct SiteEvent {
    point0: Point,
    point1: Point,
    sorted_index: usize,
    initial_index: usize,
    category: SourceCategory,
    inverse: bool,
}

impl SiteEvent {
    pub(crate) fn new_point(p: Point, initial_index: usize, category: SourceCategory) -> Self {
        SiteEvent {
            point0: p,
            point1: p,
            sorted_index: 0,
            initial_index,
            category,
            inverse: false,
        }
    }

    pub(crate) fn new_segment(
        p0: Point,
        p1: Point,
        initial_index: usize,
        category: SourceCategory,
    ) -> Self {
        SiteEvent {
            point0: p0,
            point1: p1,
            sorted_index: 0,
            initial_index,
            category,
            inverse: false,
        }
    }

    #[inline]
    pub(crate) fn x(&self) -> i32 {
        self.point0.x
    }

    #[inline]
    pub(crate) fn y(&self) -> i32 {
        self.point0.y
    }

    #[inline]
    pub(crate) fn x0(&self) -> i32 {
        self.point0.x
    }

    #[inline]
    pub(crate) fn y0(&self) -> i32 {
        self.point0.y
    }

    #[inline]
    pub(crate) fn x1(&self) -> i32 {
        self.point1.x
    }

    #[inline]
    pub(crate) fn y1(&self) -> i32 {
        self.point1.y
    }

    #[inline]
    pub(crate) fn point0(&self) -> Point {
        self.point0
    }

    #[inline]
    pub(crate) fn point1(&self) -> Point {
        self.point1
    }

    #[inline]
    pub(crate) fn is_segment(&self) -> bool {
        self.point0 != self.point1
    }

    #[inline]
    pub(crate) fn is_point(&self) -> bool {
        !self.is_segment()
    }

    #[inline]
    pub(crate) fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Flips the logical direction of a segment site in place.
    pub(crate) fn inverse(&mut self) -> &mut Self {
        debug_assert!(self.is_segment(), "inverse() is only defined for segments");
        std::mem::swap(&mut self.point0, &mut self.point1);
        self.inverse = !self.inverse;
        self
    }

    /// Returns a flipped copy, leaving `self` alone.
    pub(crate) fn inversed(&self) -> Self {
        let mut copy = *self;
        let _ = copy.inverse();
        copy
    }

    #[inline]
    pub(crate) fn sorted_index(&self) -> usize {
        self.sorted_index
    }

    pub(crate) fn set_sorted_index(&mut self, index: usize) {
        self.sorted_index = index;
    }

    #[inline]
    pub(crate) fn initial_index(&self) -> usize {
        self.initial_index
    }

    #[inline]
    pub(crate) fn category(&self) -> SourceCategory {
        self.category
    }

    /// A bisector between a segment and one of its own endpoints is a
    /// secondary edge: it separates two cells owned by the same input
    /// geometry.
    pub(crate) fn is_primary_edge(site1: &SiteEvent, site2: &SiteEvent) -> bool {
        let seg1 = site1.is_segment();
        let seg2 = site2.is_segment();
        if seg1 && !seg2 {
            return site1.point0() != site2.point0() && site1.point1() != site2.point0();
        }
        if !seg1 && seg2 {
            return site2.point0() != site1.point0() && site2.point1() != site1.point0();
        }
        true
    }

    /// Secondary edges are straight even between a point and a segment.
    pub(crate) fn is_linear_edge(site1: &SiteEvent, site2: &SiteEvent) -> bool {
        if !Self::is_primary_edge(site1, site2) {
            return true;
        }
        !(site1.is_segment() ^ site2.is_segment())
    }
}

// Equality is geometric identity only: coincident endpoints of different
// segments (and identical opposite-direction segments) compare equal so
// that deduplication folds them into a single site.
impl PartialEq for SiteEvent {
    fn eq(&self, other: &Self) -> bool {
        self.point0 == other.point0 && self.point1 == other.point1
    }
}

impl Eq for SiteEvent {}

impl std::fmt::Debug for SiteEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_point() {
            write!(f, "#{}{:?}", self.sorted_index, self.point0)
        } else {
            write!(
                f,
                "#{}{:?}{}{:?}",
                self.sorted_index,
                self.point0,
                if self.inverse { "<" } else { "-" },
                self.point1,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_swaps_points_and_flag() {
        let mut s = SiteEvent::new_segment(
            Point::new(0, 0),
            Point::new(2, 3),
            0,
            SourceCategory::SegmentInitial,
        );
        assert!(!s.is_inverse());
        let _ = s.inverse();
        assert!(s.is_inverse());
        assert_eq!(s.point0(), Point::new(2, 3));
        assert_eq!(s.point1(), Point::new(0, 0));
        let _ = s.inverse();
        assert!(!s.is_inverse());
        assert_eq!(s.point0(), Point::new(0, 0));
    }

    #[test]
    fn secondary_edges() {
        let seg = SiteEvent::new_segment(
            Point::new(0, 0),
            Point::new(10, 0),
            0,
            SourceCategory::SegmentInitial,
        );
        let own_end = SiteEvent::new_point(Point::new(0, 0), 0, SourceCategory::SegmentStart);
        let other = SiteEvent::new_point(Point::new(5, 5), 1, SourceCategory::SinglePoint);

        assert!(!SiteEvent::is_primary_edge(&seg, &own_end));
        assert!(SiteEvent::is_linear_edge(&seg, &own_end));
        assert!(SiteEvent::is_primary_edge(&seg, &other));
        assert!(!SiteEvent::is_linear_edge(&seg, &other));
    }
}
