//! Geometric predicates for the sweep.
//!
//! Three layers, fastest first:
//!
//! 1. sign tests on exactly computed integer cross products (differences of
//!    32-bit inputs fit `i64`, their products fit `i128`);
//! 2. filtered `f64` evaluation with tracked error bounds ([`crate::num`]);
//! 3. exact rational recomputation ([`crate::exact`]) when a bound exceeds
//!    [`ULPS`].
//!
//! The beach-line comparator ([`node_lt`]) and the distance predicates
//! under it only ever compare an in-flight key (whose newest site lies on
//! the sweep line) against a resident key, which is what keeps their
//! epsilon-robust evaluation transitive in practice.

use std::cmp::Ordering;

use crate::exact;
use crate::geom::Point;
use crate::num::{ulp_cmp, RobustF64, RobustSum};
use crate::site::SiteEvent;

/// Published tolerance of the filtered tier, in ulps.
pub(crate) const ULPS: u64 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Orientation {
    Right,
    Collinear,
    Left,
}

/// `a1 * b2 - b1 * a2`, computed exactly and rounded once.
fn cross(a1: i64, b1: i64, a2: i64, b2: i64) -> f64 {
    (a1 as i128 * b2 as i128 - b1 as i128 * a2 as i128) as f64
}

fn orientation_of(value: f64) -> Orientation {
    if value == 0.0 {
        Orientation::Collinear
    } else if value < 0.0 {
        Orientation::Right
    } else {
        Orientation::Left
    }
}

pub(crate) fn orient(p1: Point, p2: Point, p3: Point) -> Orientation {
    orientation_of(cross(
        p1.x as i64 - p2.x as i64,
        p2.x as i64 - p3.x as i64,
        p1.y as i64 - p2.y as i64,
        p2.y as i64 - p3.y as i64,
    ))
}

#[inline]
pub(crate) fn is_vertical(site: &SiteEvent) -> bool {
    site.x0() == site.x1()
}

fn d(a: i32, b: i32) -> i64 {
    a as i64 - b as i64
}

fn f(v: i32) -> f64 {
    v as f64
}

// ---------------------------------------------------------------------
// Event ordering
// ---------------------------------------------------------------------

/// Strict sweep order between two sites. Points precede segments sharing
/// their coordinate; non-vertical segments order by the angle they leave
/// the shared point with.
fn site_lt(lhs: &SiteEvent, rhs: &SiteEvent) -> bool {
    if lhs.x0() != rhs.x0() {
        return lhs.x0() < rhs.x0();
    }
    if !lhs.is_segment() {
        if !rhs.is_segment() {
            return lhs.y0() < rhs.y0();
        }
        if is_vertical(rhs) {
            return lhs.y0() <= rhs.y0();
        }
        true
    } else {
        if is_vertical(rhs) {
            if is_vertical(lhs) {
                return lhs.y0() < rhs.y0();
            }
            return false;
        }
        if is_vertical(lhs) {
            return true;
        }
        if lhs.y0() != rhs.y0() {
            return lhs.y0() < rhs.y0();
        }
        orient(lhs.point1(), lhs.point0(), rhs.point1()) == Orientation::Left
    }
}

/// Total order used to sort the site queue. Geometric position first;
/// coincident sites tie-break by category, then by insertion order, so
/// deduplication keeps a deterministic representative.
pub(crate) fn site_cmp(lhs: &SiteEvent, rhs: &SiteEvent) -> Ordering {
    if site_lt(lhs, rhs) {
        return Ordering::Less;
    }
    if site_lt(rhs, lhs) {
        return Ordering::Greater;
    }
    lhs.category()
        .cmp(&rhs.category())
        .then(lhs.initial_index().cmp(&rhs.initial_index()))
}

/// True if the site event fires strictly before a circle event with the
/// given `lower_x`. Ties within the tolerance go to the circle.
pub(crate) fn site_precedes_circle(site: &SiteEvent, lower_x: f64, _y: f64) -> bool {
    ulp_cmp(f(site.x0()), lower_x, ULPS) == Ordering::Less
}

// ---------------------------------------------------------------------
// Distance predicates (beach-line ordering)
// ---------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum PsResult {
    Less,
    Undefined,
    More,
}

/// Returns true if a horizontal line through `point` meets the arc of
/// `right_site` before the arc of `left_site`; false on the intersection
/// point itself.
pub(crate) fn distance_predicate(
    left_site: &SiteEvent,
    right_site: &SiteEvent,
    point: Point,
) -> bool {
    if !left_site.is_segment() {
        if !right_site.is_segment() {
            pp(left_site, right_site, point)
        } else {
            ps(left_site, right_site, point, false)
        }
    } else if !right_site.is_segment() {
        ps(right_site, left_site, point, true)
    } else {
        ss(left_site, right_site, point)
    }
}

fn pp(left_site: &SiteEvent, right_site: &SiteEvent, point: Point) -> bool {
    let left = left_site.point0();
    let right = right_site.point0();
    match left.x.cmp(&right.x) {
        Ordering::Greater => {
            if point.y <= left.y {
                return false;
            }
        }
        Ordering::Less => {
            if point.y >= right.y {
                return true;
            }
        }
        Ordering::Equal => {
            return (left.y as i64) + (right.y as i64) < 2 * (point.y as i64);
        }
    }
    distance_to_point_arc(left_site, point) < distance_to_point_arc(right_site, point)
}

fn ps(left_site: &SiteEvent, right_site: &SiteEvent, point: Point, reverse: bool) -> bool {
    match fast_ps(left_site, right_site, point, reverse) {
        PsResult::Less => true,
        PsResult::More => false,
        PsResult::Undefined => {
            let dist1 = distance_to_point_arc(left_site, point);
            let dist2 = distance_to_segment_arc(right_site, point);
            reverse ^ (dist1 < dist2)
        }
    }
}

fn ss(left_site: &SiteEvent, right_site: &SiteEvent, point: Point) -> bool {
    // The two halves of one segment (a bridge pair) order by which side
    // of the segment the new point falls on.
    if left_site.sorted_index() == right_site.sorted_index() {
        return orient(left_site.point0(), left_site.point1(), point) == Orientation::Left;
    }
    distance_to_segment_arc(left_site, point) < distance_to_segment_arc(right_site, point)
}

fn distance_to_point_arc(site: &SiteEvent, point: Point) -> f64 {
    let dx = f(site.x()) - f(point.x);
    let dy = f(site.y()) - f(point.y);
    (dx * dx + dy * dy) / (2.0 * dx)
}

fn distance_to_segment_arc(site: &SiteEvent, point: Point) -> f64 {
    if is_vertical(site) {
        (f(site.x()) - f(point.x)) * 0.5
    } else {
        let seg0 = site.point0();
        let seg1 = site.point1();
        let a = f(seg1.x) - f(seg0.x);
        let b = f(seg1.y) - f(seg0.y);
        let k = (a * a + b * b).sqrt();
        // Avoid cancellation when computing 1/(k + b).
        let k = if b >= 0.0 { 1.0 / (b + k) } else { (k - b) / (a * a) };
        k * cross(
            d(seg1.x, seg0.x),
            d(seg1.y, seg0.y),
            d(point.x, seg0.x),
            d(point.y, seg0.y),
        )
    }
}

fn fast_ps(
    left_site: &SiteEvent,
    right_site: &SiteEvent,
    point: Point,
    reverse: bool,
) -> PsResult {
    let site_point = left_site.point0();
    let seg_start = right_site.point0();
    let seg_end = right_site.point1();

    if orient(seg_start, seg_end, point) != Orientation::Right {
        return if !right_site.is_inverse() {
            PsResult::Less
        } else {
            PsResult::More
        };
    }

    let dif_x = f(point.x) - f(site_point.x);
    let dif_y = f(point.y) - f(site_point.y);
    let a = f(seg_end.x) - f(seg_start.x);
    let b = f(seg_end.y) - f(seg_start.y);

    if is_vertical(right_site) {
        if point.y < site_point.y && !reverse {
            return PsResult::More;
        } else if point.y > site_point.y && reverse {
            return PsResult::Less;
        }
        return PsResult::Undefined;
    } else {
        let orientation = orientation_of(cross(
            d(seg_end.x, seg_start.x),
            d(seg_end.y, seg_start.y),
            d(point.x, site_point.x),
            d(point.y, site_point.y),
        ));
        if orientation == Orientation::Left {
            if !right_site.is_inverse() {
                return if reverse {
                    PsResult::Less
                } else {
                    PsResult::Undefined
                };
            }
            return if reverse {
                PsResult::Undefined
            } else {
                PsResult::More
            };
        }
    }

    let fast_left_expr = a * (dif_y + dif_x) * (dif_y - dif_x);
    let fast_right_expr = 2.0 * b * dif_x * dif_y;
    match ulp_cmp(fast_left_expr, fast_right_expr, 4) {
        Ordering::Equal => PsResult::Undefined,
        cmp => {
            if (cmp == Ordering::Greater) ^ reverse {
                if reverse {
                    PsResult::Less
                } else {
                    PsResult::More
                }
            } else {
                PsResult::Undefined
            }
        }
    }
}

// ---------------------------------------------------------------------
// Beach-line node comparison
// ---------------------------------------------------------------------

/// The newer of the two sites forming a key.
fn comparison_site<'a>(left: &'a SiteEvent, right: &'a SiteEvent) -> &'a SiteEvent {
    if left.sorted_index() > right.sorted_index() {
        left
    } else {
        right
    }
}

fn comparison_point(site: &SiteEvent) -> Point {
    std::cmp::min(site.point0(), site.point1())
}

/// `(y, direction)` tiebreak pair for keys whose comparison points share
/// an x coordinate.
fn comparison_y(left: &SiteEvent, right: &SiteEvent, is_new_node: bool) -> (i32, i8) {
    if left.sorted_index() == right.sorted_index() {
        return (left.y0(), 0);
    }
    if left.sorted_index() > right.sorted_index() {
        if !is_new_node && left.is_segment() && is_vertical(left) {
            return (left.y0(), 1);
        }
        return (left.y1(), 1);
    }
    (right.y0(), -1)
}

/// True if the arc intersection of `key1` lies below that of `key2` at
/// the sweep position of the newer key. Only valid while one of the keys
/// involves a site on the sweep line.
pub(crate) fn node_lt(
    key1: (&SiteEvent, &SiteEvent),
    key2: (&SiteEvent, &SiteEvent),
) -> bool {
    let site1 = comparison_site(key1.0, key1.1);
    let site2 = comparison_site(key2.0, key2.1);
    let point1 = comparison_point(site1);
    let point2 = comparison_point(site2);

    match point1.x.cmp(&point2.x) {
        Ordering::Less => distance_predicate(key1.0, key1.1, point2),
        Ordering::Greater => !distance_predicate(key2.0, key2.1, point1),
        Ordering::Equal => match site1.sorted_index().cmp(&site2.sorted_index()) {
            // Both keys were inserted while processing the same site.
            Ordering::Equal => {
                let y1 = comparison_y(key1.0, key1.1, true);
                let y2 = comparison_y(key2.0, key2.1, true);
                y1 < y2
            }
            Ordering::Less => {
                let y1 = comparison_y(key1.0, key1.1, false);
                let y2 = comparison_y(key2.0, key2.1, true);
                if y1.0 != y2.0 {
                    y1.0 < y2.0
                } else if !site1.is_segment() {
                    y1.1 < 0
                } else {
                    false
                }
            }
            Ordering::Greater => {
                let y1 = comparison_y(key1.0, key1.1, true);
                let y2 = comparison_y(key2.0, key2.1, false);
                if y1.0 != y2.0 {
                    y1.0 < y2.0
                } else if !site2.is_segment() {
                    y2.1 > 0
                } else {
                    true
                }
            }
        },
    }
}

// ---------------------------------------------------------------------
// Circle formation
// ---------------------------------------------------------------------

/// Which member of an arc triple a segment (or point) occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SiteIndex {
    One,
    Two,
    Three,
}

/// A candidate circle event: center, rightmost x, and whether the center
/// coincides with an input point.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Candidate {
    pub x: f64,
    pub y: f64,
    pub lower_x: f64,
    pub is_site_point: bool,
}

/// Decides whether three sites owning consecutive arcs converge, and if
/// so where. Returns `None` for divergent or degenerate triples.
pub(crate) fn circle_formation(
    site1: &SiteEvent,
    site2: &SiteEvent,
    site3: &SiteEvent,
) -> Option<Candidate> {
    let candidate = match (site1.is_segment(), site2.is_segment(), site3.is_segment()) {
        (false, false, false) => {
            if !exists_ppp(site1, site2, site3) {
                return None;
            }
            lazy_ppp(site1.point0(), site2.point0(), site3.point0())
        }
        (false, false, true) => {
            if !exists_pps(site1, site2, site3, SiteIndex::Three) {
                return None;
            }
            lazy_pps(site1, site2, site3, SiteIndex::Three)
        }
        (false, true, false) => {
            if !exists_pps(site1, site3, site2, SiteIndex::Two) {
                return None;
            }
            lazy_pps(site1, site3, site2, SiteIndex::Two)
        }
        (false, true, true) => {
            if !exists_pss(site1, site2, site3, SiteIndex::One) {
                return None;
            }
            lazy_pss(site1, site2, site3, SiteIndex::One)
        }
        (true, false, false) => {
            if !exists_pps(site2, site3, site1, SiteIndex::One) {
                return None;
            }
            lazy_pps(site2, site3, site1, SiteIndex::One)
        }
        (true, false, true) => {
            if !exists_pss(site2, site1, site3, SiteIndex::Two) {
                return None;
            }
            lazy_pss(site2, site1, site3, SiteIndex::Two)
        }
        (true, true, false) => {
            if !exists_pss(site3, site1, site2, SiteIndex::Three) {
                return None;
            }
            lazy_pss(site3, site1, site2, SiteIndex::Three)
        }
        (true, true, true) => {
            if !exists_sss(site1, site2, site3) {
                return None;
            }
            lazy_sss(site1, site2, site3)
        }
    };

    if !candidate.x.is_finite() || !candidate.y.is_finite() || !candidate.lower_x.is_finite() {
        return None;
    }
    if lies_outside_vertical_segment(&candidate, site1)
        || lies_outside_vertical_segment(&candidate, site2)
        || lies_outside_vertical_segment(&candidate, site3)
    {
        return None;
    }
    Some(candidate)
}

fn lies_outside_vertical_segment(c: &Candidate, site: &SiteEvent) -> bool {
    if !site.is_segment() || !is_vertical(site) {
        return false;
    }
    let y0 = f(if site.is_inverse() { site.y1() } else { site.y0() });
    let y1 = f(if site.is_inverse() { site.y0() } else { site.y1() });
    ulp_cmp(c.y, y0, ULPS) == Ordering::Less || ulp_cmp(c.y, y1, ULPS) == Ordering::Greater
}

fn exists_ppp(site1: &SiteEvent, site2: &SiteEvent, site3: &SiteEvent) -> bool {
    orient(site1.point0(), site2.point0(), site3.point0()) == Orientation::Right
}

fn exists_pps(
    site1: &SiteEvent,
    site2: &SiteEvent,
    site3: &SiteEvent,
    segment_index: SiteIndex,
) -> bool {
    if segment_index != SiteIndex::Two {
        let orient1 = orient(site1.point0(), site2.point0(), site3.point0());
        let orient2 = orient(site1.point0(), site2.point0(), site3.point1());
        if segment_index == SiteIndex::One && site1.x0() >= site2.x0() {
            if orient1 != Orientation::Right {
                return false;
            }
        } else if segment_index == SiteIndex::Three && site2.x0() >= site1.x0() {
            if orient2 != Orientation::Right {
                return false;
            }
        } else if orient1 != Orientation::Right && orient2 != Orientation::Right {
            return false;
        }
        true
    } else {
        site3.point0() != site1.point0() || site3.point1() != site2.point0()
    }
}

fn exists_pss(
    site1: &SiteEvent,
    site2: &SiteEvent,
    site3: &SiteEvent,
    point_index: SiteIndex,
) -> bool {
    if site2.sorted_index() == site3.sorted_index() {
        return false;
    }
    if point_index == SiteIndex::Two {
        if !site2.is_inverse() && site3.is_inverse() {
            return false;
        }
        if site2.is_inverse() == site3.is_inverse()
            && orient(site2.point0(), site1.point0(), site3.point1()) != Orientation::Right
        {
            return false;
        }
    }
    true
}

fn exists_sss(site1: &SiteEvent, site2: &SiteEvent, site3: &SiteEvent) -> bool {
    site1.sorted_index() != site2.sorted_index() && site2.sorted_index() != site3.sorted_index()
}

fn lazy_ppp(point1: Point, point2: Point, point3: Point) -> Candidate {
    let dif_x1 = f(point1.x) - f(point2.x);
    let dif_x2 = f(point2.x) - f(point3.x);
    let dif_y1 = f(point1.y) - f(point2.y);
    let dif_y2 = f(point2.y) - f(point3.y);
    let orientation = cross(
        d(point1.x, point2.x),
        d(point2.x, point3.x),
        d(point1.y, point2.y),
        d(point2.y, point3.y),
    );
    let inv_orientation = RobustF64::with_error(0.5 / orientation, 2.0);
    let sum_x1 = f(point1.x) + f(point2.x);
    let sum_x2 = f(point2.x) + f(point3.x);
    let sum_y1 = f(point1.y) + f(point2.y);
    let sum_y2 = f(point2.y) + f(point3.y);
    let dif_x3 = f(point1.x) - f(point3.x);
    let dif_y3 = f(point1.y) - f(point3.y);

    let mut c_x = RobustSum::new();
    let mut c_y = RobustSum::new();
    let error = 2.0;
    c_x += RobustF64::with_error(dif_x1 * sum_x1 * dif_y2, error);
    c_x += RobustF64::with_error(dif_y1 * sum_y1 * dif_y2, error);
    c_x -= RobustF64::with_error(dif_x2 * sum_x2 * dif_y1, error);
    c_x -= RobustF64::with_error(dif_y2 * sum_y2 * dif_y1, error);
    c_y += RobustF64::with_error(dif_x2 * sum_x2 * dif_x1, error);
    c_y += RobustF64::with_error(dif_y2 * sum_y2 * dif_x1, error);
    c_y -= RobustF64::with_error(dif_x1 * sum_x1 * dif_x2, error);
    c_y -= RobustF64::with_error(dif_y1 * sum_y1 * dif_x2, error);
    let mut lower_x = c_x;
    lower_x -= RobustF64::with_error(
        ((dif_x1 * dif_x1 + dif_y1 * dif_y1)
            * (dif_x2 * dif_x2 + dif_y2 * dif_y2)
            * (dif_x3 * dif_x3 + dif_y3 * dif_y3))
            .sqrt(),
        5.0,
    );

    let mut candidate = Candidate {
        x: c_x.dif().value() * inv_orientation.value(),
        y: c_y.dif().value() * inv_orientation.value(),
        lower_x: lower_x.dif().value() * inv_orientation.value(),
        is_site_point: false,
    };

    let recompute_x = c_x.dif().error() > ULPS as f64;
    let recompute_y = c_y.dif().error() > ULPS as f64;
    let recompute_lower_x = lower_x.dif().error() > ULPS as f64;
    if recompute_x || recompute_y || recompute_lower_x {
        exact::recompute_ppp(
            point1,
            point2,
            point3,
            &mut candidate,
            recompute_x,
            recompute_y,
            recompute_lower_x,
        );
    }
    candidate
}

fn lazy_pps(
    site1: &SiteEvent,
    site2: &SiteEvent,
    site3: &SiteEvent,
    segment_index: SiteIndex,
) -> Candidate {
    // (line_a, line_b) is perpendicular to the segment; the center is
    // midpoint(site1, site2) + t * (vec_x, vec_y).
    let line_a = f(site3.y1()) - f(site3.y0());
    let line_b = f(site3.x0()) - f(site3.x1());
    let vec_x = f(site2.y()) - f(site1.y());
    let vec_y = f(site1.x()) - f(site2.x());

    let teta = RobustF64::with_error(
        cross(
            d(site3.y1(), site3.y0()),
            d(site3.x0(), site3.x1()),
            d(site2.x(), site1.x()),
            d(site2.y(), site1.y()),
        ),
        1.0,
    );
    let a = RobustF64::with_error(
        cross(
            d(site3.y0(), site3.y1()),
            d(site3.x0(), site3.x1()),
            d(site3.y1(), site1.y()),
            d(site3.x1(), site1.x()),
        ),
        1.0,
    );
    let b = RobustF64::with_error(
        cross(
            d(site3.y0(), site3.y1()),
            d(site3.x0(), site3.x1()),
            d(site3.y1(), site2.y()),
            d(site3.x1(), site2.x()),
        ),
        1.0,
    );
    let denom = RobustF64::with_error(
        cross(
            d(site1.y(), site2.y()),
            d(site1.x(), site2.x()),
            d(site3.y1(), site3.y0()),
            d(site3.x1(), site3.x0()),
        ),
        1.0,
    );
    let inv_segm_len =
        RobustF64::with_error(1.0 / (line_a * line_a + line_b * line_b).sqrt(), 3.0);

    let mut t = RobustSum::new();
    if orientation_of(denom.value()) == Orientation::Collinear {
        t += teta / (RobustF64::new(8.0) * a);
        t -= a / (RobustF64::new(2.0) * teta);
    } else {
        let det = ((teta * teta + denom * denom) * a * b).sqrt();
        if segment_index == SiteIndex::Two {
            t -= det / (denom * denom);
        } else {
            t += det / (denom * denom);
        }
        t += teta * (a + b) / (RobustF64::new(2.0) * denom * denom);
    }

    let mut c_x = RobustSum::new();
    let mut c_y = RobustSum::new();
    c_x += RobustF64::new(0.5 * (f(site1.x()) + f(site2.x())));
    c_x += t * RobustF64::new(vec_x);
    c_y += RobustF64::new(0.5 * (f(site1.y()) + f(site2.y())));
    c_y += t * RobustF64::new(vec_y);

    let mut r = RobustSum::new();
    let mut lower_x = c_x;
    r -= RobustF64::new(line_a) * RobustF64::new(f(site3.x0()));
    r -= RobustF64::new(line_b) * RobustF64::new(f(site3.y0()));
    r += c_x * RobustF64::new(line_a);
    r += c_y * RobustF64::new(line_b);
    if r.positive().value() < r.negative().value() {
        r = -r;
    }
    lower_x += r * inv_segm_len;

    let mut candidate = Candidate {
        x: c_x.dif().value(),
        y: c_y.dif().value(),
        lower_x: lower_x.dif().value(),
        is_site_point: false,
    };

    let recompute_x = c_x.dif().error() > ULPS as f64;
    let recompute_y = c_y.dif().error() > ULPS as f64;
    let recompute_lower_x = lower_x.dif().error() > ULPS as f64;
    if recompute_x || recompute_y || recompute_lower_x {
        exact::recompute_pps(
            site1,
            site2,
            site3,
            segment_index,
            &mut candidate,
            recompute_x,
            recompute_y,
            recompute_lower_x,
        );
    }

    // With all five endpoints distinct, the center may project beyond the
    // segment; re-anchor on the nearer endpoint then.
    let unique_endpoints = !(site3.point0() == site1.point0()
        || site3.point0() == site2.point0()
        || site3.point1() == site1.point0()
        || site3.point1() == site2.point0()
        || site1.point0() == site2.point0());
    if unique_endpoints {
        let v3c = (
            candidate.x - f(site3.point0().x),
            candidate.y - f(site3.point0().y),
        );
        let v3 = (
            f(site3.point1().x) - f(site3.point0().x),
            f(site3.point1().y) - f(site3.point0().y),
        );
        let dot = (v3c.0 * v3.0 + v3c.1 * v3.1) / (v3.0 * v3.0 + v3.1 * v3.1);
        if !(-0.0..=1.0).contains(&dot) {
            let anchor = if dot < -0.0 {
                site3.point0()
            } else {
                site3.point1()
            };
            candidate = match segment_index {
                SiteIndex::One => lazy_ppp(anchor, site1.point0(), site2.point0()),
                SiteIndex::Two => lazy_ppp(site1.point0(), anchor, site2.point0()),
                SiteIndex::Three => lazy_ppp(site1.point0(), site2.point0(), anchor),
            };
        }
    }
    candidate
}

fn lazy_pss(
    site1: &SiteEvent,
    site2: &SiteEvent,
    site3: &SiteEvent,
    point_index: SiteIndex,
) -> Candidate {
    let segm_start1 = site2.point1();
    let segm_end1 = site2.point0();
    let segm_start2 = site3.point0();
    let segm_end2 = site3.point1();

    // A point shared by both segments admits exactly one solution: a
    // zero-radius circle on the point itself. Use the pristine integer
    // coordinates.
    if (site1.point0() == site2.point0() || site1.point0() == site2.point1())
        && (site1.point0() == site3.point0() || site1.point0() == site3.point1())
    {
        return Candidate {
            x: f(site1.point0().x),
            y: f(site1.point0().y),
            lower_x: f(site1.point0().x),
            is_site_point: true,
        };
    }

    let a1 = f(segm_end1.x) - f(segm_start1.x);
    let b1 = f(segm_end1.y) - f(segm_start1.y);
    let a2 = f(segm_end2.x) - f(segm_start2.x);
    let b2 = f(segm_end2.y) - f(segm_start2.y);

    let orientation = RobustF64::with_error(
        cross(
            d(segm_end1.y, segm_start1.y),
            d(segm_end1.x, segm_start1.x),
            d(segm_end2.y, segm_start2.y),
            d(segm_end2.x, segm_start2.x),
        ),
        1.0,
    );

    let mut candidate = Candidate::default();
    let recompute_x;
    let recompute_y;
    let recompute_lower_x;

    if orientation_of(orientation.value()) == Orientation::Collinear {
        let a = RobustF64::with_error(a1 * a1 + b1 * b1, 2.0);
        let c = RobustF64::with_error(
            cross(
                d(segm_end1.y, segm_start1.y),
                d(segm_end1.x, segm_start1.x),
                d(segm_start2.y, segm_start1.y),
                d(segm_start2.x, segm_start1.x),
            ),
            1.0,
        );
        let det = RobustF64::with_error(
            cross(
                d(segm_end1.x, segm_start1.x),
                d(segm_end1.y, segm_start1.y),
                d(site1.x(), segm_start1.x),
                d(site1.y(), segm_start1.y),
            ) * cross(
                d(segm_end1.y, segm_start1.y),
                d(segm_end1.x, segm_start1.x),
                d(site1.y(), segm_start2.y),
                d(site1.x(), segm_start2.x),
            ),
            3.0,
        );

        let mut t = RobustSum::new();
        t -= RobustF64::new(a1)
            * RobustF64::new((f(segm_start1.x) + f(segm_start2.x)) * 0.5 - f(site1.x()));
        t -= RobustF64::new(b1)
            * RobustF64::new((f(segm_start1.y) + f(segm_start2.y)) * 0.5 - f(site1.y()));
        if point_index == SiteIndex::Two {
            t += det.sqrt();
        } else {
            t -= det.sqrt();
        }
        t /= a;

        let mut c_x = RobustSum::new();
        let mut c_y = RobustSum::new();
        c_x += RobustF64::new(0.5 * (f(segm_start1.x) + f(segm_start2.x)));
        c_x += t * RobustF64::new(a1);
        c_y += RobustF64::new(0.5 * (f(segm_start1.y) + f(segm_start2.y)));
        c_y += t * RobustF64::new(b1);

        let mut lower_x = c_x;
        if c.is_neg() {
            lower_x -= RobustF64::new(0.5) * c / a.sqrt();
        } else {
            lower_x += RobustF64::new(0.5) * c / a.sqrt();
        }

        recompute_x = c_x.dif().error() > ULPS as f64;
        recompute_y = c_y.dif().error() > ULPS as f64;
        recompute_lower_x = lower_x.dif().error() > ULPS as f64;
        candidate.x = c_x.dif().value();
        candidate.y = c_y.dif().value();
        candidate.lower_x = lower_x.dif().value();
    } else {
        let sqr_sum1 = RobustF64::with_error((a1 * a1 + b1 * b1).sqrt(), 2.0);
        let sqr_sum2 = RobustF64::with_error((a2 * a2 + b2 * b2).sqrt(), 2.0);
        let mut a = RobustF64::with_error(
            cross(
                d(segm_end1.x, segm_start1.x),
                d(segm_end1.y, segm_start1.y),
                d(segm_start2.y, segm_end2.y),
                d(segm_end2.x, segm_start2.x),
            ),
            1.0,
        );
        if !a.is_neg() {
            a = a + sqr_sum1 * sqr_sum2;
        } else {
            a = (orientation * orientation) / (sqr_sum1 * sqr_sum2 - a);
        }
        let or1 = RobustF64::with_error(
            cross(
                d(segm_end1.y, segm_start1.y),
                d(segm_end1.x, segm_start1.x),
                d(segm_end1.y, site1.y()),
                d(segm_end1.x, site1.x()),
            ),
            1.0,
        );
        let or2 = RobustF64::with_error(
            cross(
                d(segm_end2.x, segm_start2.x),
                d(segm_end2.y, segm_start2.y),
                d(segm_end2.x, site1.x()),
                d(segm_end2.y, site1.y()),
            ),
            1.0,
        );
        let det = RobustF64::new(2.0) * a * or1 * or2;
        let c1 = RobustF64::with_error(
            cross(
                d(segm_end1.y, segm_start1.y),
                d(segm_end1.x, segm_start1.x),
                segm_end1.y as i64,
                segm_end1.x as i64,
            ),
            1.0,
        );
        let c2 = RobustF64::with_error(
            cross(
                d(segm_end2.x, segm_start2.x),
                d(segm_end2.y, segm_start2.y),
                segm_end2.x as i64,
                segm_end2.y as i64,
            ),
            1.0,
        );
        let inv_orientation = RobustF64::new(1.0) / orientation;

        let mut ix = RobustSum::new();
        let mut iy = RobustSum::new();
        ix += RobustF64::new(a2) * c1 * inv_orientation;
        ix += RobustF64::new(a1) * c2 * inv_orientation;
        iy += RobustF64::new(b1) * c2 * inv_orientation;
        iy += RobustF64::new(b2) * c1 * inv_orientation;

        let mut b = RobustSum::new();
        b += ix * (RobustF64::new(a1) * sqr_sum2);
        b += ix * (RobustF64::new(a2) * sqr_sum1);
        b += iy * (RobustF64::new(b1) * sqr_sum2);
        b += iy * (RobustF64::new(b2) * sqr_sum1);
        b -= sqr_sum1
            * RobustF64::with_error(
                cross(
                    d(segm_end2.x, segm_start2.x),
                    d(segm_end2.y, segm_start2.y),
                    -(site1.y() as i64),
                    site1.x() as i64,
                ),
                1.0,
            );
        b -= sqr_sum2
            * RobustF64::with_error(
                cross(
                    d(segm_end1.x, segm_start1.x),
                    d(segm_end1.y, segm_start1.y),
                    -(site1.y() as i64),
                    site1.x() as i64,
                ),
                1.0,
            );

        let mut t = RobustSum::new();
        t -= b;
        if point_index == SiteIndex::Two {
            t += det.sqrt();
        } else {
            t -= det.sqrt();
        }
        t /= a * a;

        let mut c_x = ix;
        let mut c_y = iy;
        c_x += t * (RobustF64::new(a1) * sqr_sum2);
        c_x += t * (RobustF64::new(a2) * sqr_sum1);
        c_y += t * (RobustF64::new(b1) * sqr_sum2);
        c_y += t * (RobustF64::new(b2) * sqr_sum1);

        if t.positive().value() < t.negative().value() {
            t = -t;
        }
        let mut lower_x = c_x;
        if orientation.is_neg() {
            lower_x -= t * orientation;
        } else {
            lower_x += t * orientation;
        }

        recompute_x = c_x.dif().error() > ULPS as f64;
        recompute_y = c_y.dif().error() > ULPS as f64;
        recompute_lower_x = lower_x.dif().error() > ULPS as f64;
        candidate.x = c_x.dif().value();
        candidate.y = c_y.dif().value();
        candidate.lower_x = lower_x.dif().value();
    }

    if recompute_x || recompute_y || recompute_lower_x {
        exact::recompute_pss(
            site1,
            site2,
            site3,
            point_index,
            &mut candidate,
            recompute_x,
            recompute_y,
            recompute_lower_x,
        );
    }
    candidate
}

fn lazy_sss(site1: &SiteEvent, site2: &SiteEvent, site3: &SiteEvent) -> Candidate {
    let a1 = RobustF64::new(f(site1.x1()) - f(site1.x0()));
    let b1 = RobustF64::new(f(site1.y1()) - f(site1.y0()));
    let c1 = RobustF64::with_error(
        cross(
            site1.x0() as i64,
            site1.y0() as i64,
            site1.x1() as i64,
            site1.y1() as i64,
        ),
        1.0,
    );
    let a2 = RobustF64::new(f(site2.x1()) - f(site2.x0()));
    let b2 = RobustF64::new(f(site2.y1()) - f(site2.y0()));
    let c2 = RobustF64::with_error(
        cross(
            site2.x0() as i64,
            site2.y0() as i64,
            site2.x1() as i64,
            site2.y1() as i64,
        ),
        1.0,
    );
    let a3 = RobustF64::new(f(site3.x1()) - f(site3.x0()));
    let b3 = RobustF64::new(f(site3.y1()) - f(site3.y0()));
    let c3 = RobustF64::with_error(
        cross(
            site3.x0() as i64,
            site3.y0() as i64,
            site3.x1() as i64,
            site3.y1() as i64,
        ),
        1.0,
    );

    let len1 = (a1 * a1 + b1 * b1).sqrt();
    let len2 = (a2 * a2 + b2 * b2).sqrt();
    let len3 = (a3 * a3 + b3 * b3).sqrt();
    let cross_12 = RobustF64::with_error(
        cross(
            d(site1.x1(), site1.x0()),
            d(site1.y1(), site1.y0()),
            d(site2.x1(), site2.x0()),
            d(site2.y1(), site2.y0()),
        ),
        1.0,
    );
    let cross_23 = RobustF64::with_error(
        cross(
            d(site2.x1(), site2.x0()),
            d(site2.y1(), site2.y0()),
            d(site3.x1(), site3.x0()),
            d(site3.y1(), site3.y0()),
        ),
        1.0,
    );
    let cross_31 = RobustF64::with_error(
        cross(
            d(site3.x1(), site3.x0()),
            d(site3.y1(), site3.y0()),
            d(site1.x1(), site1.x0()),
            d(site1.y1(), site1.y0()),
        ),
        1.0,
    );

    let mut denom = RobustSum::new();
    denom += cross_12 * len3;
    denom += cross_23 * len1;
    denom += cross_31 * len2;

    let mut r = RobustSum::new();
    r -= cross_12 * c3;
    r -= cross_23 * c1;
    r -= cross_31 * c2;

    let mut c_x = RobustSum::new();
    c_x += a1 * c2 * len3;
    c_x -= a2 * c1 * len3;
    c_x += a2 * c3 * len1;
    c_x -= a3 * c2 * len1;
    c_x += a3 * c1 * len2;
    c_x -= a1 * c3 * len2;

    let mut c_y = RobustSum::new();
    c_y += b1 * c2 * len3;
    c_y -= b2 * c1 * len3;
    c_y += b2 * c3 * len1;
    c_y -= b3 * c2 * len1;
    c_y += b3 * c1 * len2;
    c_y -= b1 * c3 * len2;

    let lower_x = c_x + r;

    let denom_dif = denom.dif();
    let c_x_dif = c_x.dif() / denom_dif;
    let c_y_dif = c_y.dif() / denom_dif;
    let lower_x_dif = lower_x.dif() / denom_dif;

    let recompute_x = c_x_dif.error() > ULPS as f64;
    let recompute_y = c_y_dif.error() > ULPS as f64;
    let recompute_lower_x = lower_x_dif.error() > ULPS as f64;
    let mut candidate = Candidate {
        x: c_x_dif.value(),
        y: c_y_dif.value(),
        lower_x: lower_x_dif.value(),
        is_site_point: false,
    };
    if recompute_x || recompute_y || recompute_lower_x {
        exact::recompute_sss(
            site1,
            site2,
            site3,
            &mut candidate,
            recompute_x,
            recompute_y,
            recompute_lower_x,
        );
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SourceCategory;

    fn point_site(x: i32, y: i32) -> SiteEvent {
        SiteEvent::new_point(Point::new(x, y), 0, SourceCategory::SinglePoint)
    }

    fn segment_site(x1: i32, y1: i32, x2: i32, y2: i32) -> SiteEvent {
        SiteEvent::new_segment(
            Point::new(x1, y1),
            Point::new(x2, y2),
            0,
            SourceCategory::SegmentInitial,
        )
    }

    #[test]
    fn orientation() {
        let a = Point::new(0, 0);
        let b = Point::new(1, 0);
        assert_eq!(orient(a, b, Point::new(2, 1)), Orientation::Left);
        assert_eq!(orient(a, b, Point::new(2, -1)), Orientation::Right);
        assert_eq!(orient(a, b, Point::new(2, 0)), Orientation::Collinear);
    }

    #[test]
    fn site_ordering() {
        // x-major, then y.
        assert_eq!(
            site_cmp(&point_site(0, 5), &point_site(1, -5)),
            Ordering::Less
        );
        assert_eq!(
            site_cmp(&point_site(1, -5), &point_site(1, 0)),
            Ordering::Less
        );
        // A point precedes any segment leaving it.
        let p = point_site(0, 0);
        let s = segment_site(0, 0, 3, 4);
        assert_eq!(site_cmp(&p, &s), Ordering::Less);
        // A vertical segment goes after the point with its y.
        let v = segment_site(0, 0, 0, 7);
        assert_eq!(site_cmp(&p, &v), Ordering::Less);
        // Vertical segments precede non-vertical ones at the same point.
        assert_eq!(site_cmp(&v, &s), Ordering::Less);
    }

    #[test]
    fn coincident_points_tie_break_by_category() {
        let single = point_site(3, 3);
        let start = SiteEvent::new_point(Point::new(3, 3), 7, SourceCategory::SegmentStart);
        assert_eq!(site_cmp(&single, &start), Ordering::Less);
        assert_eq!(site_cmp(&start, &single), Ordering::Greater);
    }

    #[test]
    fn point_point_distance_predicate() {
        // Two point sites, new site between their arcs.
        let left = point_site(0, 0);
        let right = point_site(2, 4);
        // A point well below both favors the left arc first.
        assert!(!distance_predicate(&left, &right, Point::new(3, -10)));
        // A point well above favors the right arc.
        assert!(distance_predicate(&left, &right, Point::new(3, 10)));
    }

    #[test]
    fn circle_through_three_points() {
        let s1 = point_site(0, 0);
        let s2 = point_site(0, 2);
        let s3 = point_site(2, 0);
        // Ordered so that the triple turns right (arcs converge).
        let c = circle_formation(&s1, &s2, &s3).expect("circle should exist");
        assert!((c.x - 1.0).abs() < 1e-9);
        assert!((c.y - 1.0).abs() < 1e-9);
        assert!((c.lower_x - (1.0 + std::f64::consts::SQRT_2)).abs() < 1e-9);

        // The mirrored (left-turning) triple diverges.
        assert!(circle_formation(&s3, &s2, &s1).is_none());
    }

    #[test]
    fn shared_endpoint_shortcut() {
        let p = point_site(1, 1);
        let mut seg1 = segment_site(1, 1, 5, 1);
        seg1.set_sorted_index(1);
        let mut seg2 = segment_site(1, 1, 1, 5);
        seg2.set_sorted_index(2);
        let c = circle_formation(&p, &seg1, &seg2).expect("degenerate circle on the point");
        assert!(c.is_site_point);
        assert_eq!(c.x, 1.0);
        assert_eq!(c.y, 1.0);
        assert_eq!(c.lower_x, 1.0);
    }

    #[test]
    fn parallel_segments_never_converge() {
        let mut s1 = segment_site(0, 0, 0, 10);
        s1.set_sorted_index(1);
        let mut s2 = segment_site(2, 0, 2, 10);
        s2.set_sorted_index(2);
        let mut s3 = segment_site(4, 0, 4, 10);
        s3.set_sorted_index(3);
        assert!(circle_formation(&s1, &s2, &s3).is_none());
    }
}
