//! Exact evaluation of circle-event coordinates, using rational arithmetic.
//!
//! The lazy tier in [`crate::predicates`] computes circle centers in `f64`
//! with tracked error bounds. When a bound exceeds the tolerance, the same
//! closed-form expression is re-evaluated here over [`Rational`] and rounded
//! back to `f64` once, at the end.
//!
//! Square roots are the only irrational pieces. They are computed to
//! [`SQRT_PRECISION_BITS`] fractional bits with an integer floor square
//! root. For 32-bit inputs every radicand is below `2^300`, so the result
//! of each expression carries hundreds of bits of headroom over the final
//! `f64` rounding; no cancellation can surface at the 53-bit level.

use malachite::num::arithmetic::traits::{Abs, Floor, FloorSqrt};
use malachite::num::basic::traits::{One, Zero};
use malachite::{Integer, Natural, Rational};

use crate::geom::Point;
use crate::predicates::{Candidate, SiteIndex};
use crate::site::SiteEvent;

/// Fractional bits carried by every computed square root.
const SQRT_PRECISION_BITS: u64 = 512;

fn int(v: i32) -> Integer {
    Integer::from(v)
}

fn rat(v: Integer) -> Rational {
    Rational::from(v)
}

/// `floor(sqrt(n) * 2^p) / 2^p` for a non-negative integer `n`.
pub(crate) fn sqrt_integer(n: &Integer) -> Rational {
    debug_assert!(*n >= Integer::ZERO);
    let n = Natural::try_from(n.clone()).unwrap();
    let root = (n << (2 * SQRT_PRECISION_BITS)).floor_sqrt();
    Rational::from_naturals(root, Natural::ONE << SQRT_PRECISION_BITS)
}

/// High-precision square root of a non-negative rational,
/// via `sqrt(p/q) = sqrt(p*q) / q`.
pub(crate) fn sqrt_rational(r: &Rational) -> Rational {
    debug_assert!(*r >= Rational::ZERO);
    let p = r.to_numerator();
    let q = r.to_denominator();
    let root = ((p * &q) << (2 * SQRT_PRECISION_BITS)).floor_sqrt();
    Rational::from_naturals(root, q << SQRT_PRECISION_BITS)
}

/// Rounds a rational to the nearest-or-below `f64` by explicit mantissa
/// extraction. Error is at most one ulp.
pub(crate) fn to_f64(r: &Rational) -> f64 {
    if *r == Rational::ZERO {
        return 0.0;
    }
    let negative = *r < Rational::ZERO;
    let mut abs = r.clone().abs();
    let two = Rational::from(2);

    // Scale into [1, 2), remembering the binary exponent.
    let mut exp: i64 = 0;
    while abs >= two {
        abs /= &two;
        exp += 1;
    }
    while abs < Rational::ONE {
        abs *= &two;
        exp -= 1;
    }

    let mantissa: Integer = (abs * Rational::from(1u64 << 52)).floor();
    let mantissa = u64::try_from(&mantissa).unwrap();
    let val = mantissa as f64 * exp2(exp - 52);
    if negative {
        -val
    } else {
        val
    }
}

// The exponents seen here stay far inside f64 range; anything smaller
// rounds to zero, which is the correct answer at that magnitude.
fn exp2(e: i64) -> f64 {
    if e < i32::MIN as i64 {
        0.0
    } else if e > i32::MAX as i64 {
        f64::INFINITY
    } else {
        2f64.powi(e as i32)
    }
}

/// `A[3] + A[0]√B[0] + A[1]√B[1] + A[2]·sqrt(B[3]·(√(B[0]·B[1]) + B[2]))`,
/// the expression shape of the non-collinear point-segment-segment case.
fn eval_pss_expr(a: &[Integer; 4], b: &[Integer; 4]) -> Rational {
    let s01 = sqrt_integer(&(&b[0] * &b[1]));
    let inner = rat(b[3].clone()) * (s01 + rat(b[2].clone()));
    // Cauchy-Schwarz keeps the paren non-negative; the product with B[3]
    // is non-negative whenever the triple admits a circle.
    let nested = if inner > Rational::ZERO {
        sqrt_rational(&inner)
    } else {
        Rational::ZERO
    };
    rat(a[3].clone())
        + rat(a[0].clone()) * sqrt_integer(&b[0])
        + rat(a[1].clone()) * sqrt_integer(&b[1])
        + rat(a[2].clone()) * nested
}

fn mark_divergent(c: &mut Candidate) {
    c.x = f64::INFINITY;
    c.y = f64::INFINITY;
    c.lower_x = f64::INFINITY;
}

/// Point-point-point circle.
pub(crate) fn recompute_ppp(
    p1: Point,
    p2: Point,
    p3: Point,
    c: &mut Candidate,
    recompute_x: bool,
    recompute_y: bool,
    recompute_lower_x: bool,
) {
    let dif_x = [
        int(p1.x) - int(p2.x),
        int(p2.x) - int(p3.x),
        int(p1.x) - int(p3.x),
    ];
    let dif_y = [
        int(p1.y) - int(p2.y),
        int(p2.y) - int(p3.y),
        int(p1.y) - int(p3.y),
    ];
    let sum_x = [int(p1.x) + int(p2.x), int(p2.x) + int(p3.x)];
    let sum_y = [int(p1.y) + int(p2.y), int(p2.y) + int(p3.y)];

    let denom = &dif_x[0] * &dif_y[1] - &dif_x[1] * &dif_y[0];
    if denom == Integer::ZERO {
        mark_divergent(c);
        return;
    }
    let numer1 = &dif_x[0] * &sum_x[0] + &dif_y[0] * &sum_y[0];
    let numer2 = &dif_x[1] * &sum_x[1] + &dif_y[1] * &sum_y[1];
    let denom2 = rat(&denom * Integer::from(2));

    let cx = rat(&numer1 * &dif_y[1] - &numer2 * &dif_y[0]) / &denom2;
    if recompute_x {
        c.x = to_f64(&cx);
    }
    if recompute_y {
        let cy = rat(&numer2 * &dif_x[0] - &numer1 * &dif_x[1]) / &denom2;
        c.y = to_f64(&cy);
    }
    if recompute_lower_x {
        let sqr_r = (&dif_x[0] * &dif_x[0] + &dif_y[0] * &dif_y[0])
            * (&dif_x[1] * &dif_x[1] + &dif_y[1] * &dif_y[1])
            * (&dif_x[2] * &dif_x[2] + &dif_y[2] * &dif_y[2]);
        let r = sqrt_integer(&sqr_r) / denom2.abs();
        c.lower_x = to_f64(&(cx + r));
    }
}

/// Point-point-segment circle. `site1` and `site2` are the points,
/// `site3` the segment; `segment_index` says where the segment sits in
/// the arc triple.
pub(crate) fn recompute_pps(
    site1: &SiteEvent,
    site2: &SiteEvent,
    site3: &SiteEvent,
    segment_index: SiteIndex,
    c: &mut Candidate,
    recompute_x: bool,
    recompute_y: bool,
    recompute_lower_x: bool,
) {
    let line_a = int(site3.y1()) - int(site3.y0());
    let line_b = int(site3.x0()) - int(site3.x1());
    let segm_len = &line_a * &line_a + &line_b * &line_b;
    let vec_x = int(site2.y()) - int(site1.y());
    let vec_y = int(site1.x()) - int(site2.x());
    let sum_x = int(site1.x()) + int(site2.x());
    let sum_y = int(site1.y()) + int(site2.y());
    let teta = &line_a * &vec_x + &line_b * &vec_y;
    let denom = &vec_x * &line_b - &vec_y * &line_a;

    let dif0 = int(site3.y1()) - int(site1.y());
    let dif1 = int(site1.x()) - int(site3.x1());
    let a = &line_a * &dif1 - &line_b * &dif0;
    let dif0 = int(site3.y1()) - int(site2.y());
    let dif1 = int(site2.x()) - int(site3.x1());
    let b = &line_a * &dif1 - &line_b * &dif0;
    let sum_ab = &a + &b;

    let segm_sqrt = sqrt_integer(&segm_len);

    if denom == Integer::ZERO {
        // The two points straddle the segment's line symmetrically.
        let numer = &teta * &teta - &sum_ab * &sum_ab;
        let denom = &teta * &sum_ab;
        if denom == Integer::ZERO {
            mark_divergent(c);
            return;
        }
        let ca0 = &denom * &sum_x * Integer::from(2) + &numer * &vec_x;
        let ca1 = &denom * &sum_ab * Integer::from(2) + &numer * &teta;
        let ca2 = &denom * &sum_y * Integer::from(2) + &numer * &vec_y;
        let inv_denom = rat(&denom * Integer::from(4));
        if recompute_x {
            c.x = to_f64(&(rat(ca0.clone()) / &inv_denom));
        }
        if recompute_y {
            c.y = to_f64(&(rat(ca2) / &inv_denom));
        }
        if recompute_lower_x {
            let numer = rat(ca0) * &segm_sqrt + rat(ca1);
            c.lower_x = to_f64(&(numer / (inv_denom * &segm_sqrt)));
        }
        return;
    }

    let det = (&teta * &teta + &denom * &denom) * &a * &b * Integer::from(4);
    if det < Integer::ZERO {
        mark_divergent(c);
        return;
    }
    let det_sqrt = sqrt_integer(&det);
    let denom_sqr = rat(&denom * &denom * Integer::from(2));

    let sign = |v: &Integer| {
        if segment_index == SiteIndex::Two {
            -v.clone()
        } else {
            v.clone()
        }
    };

    let ca0 = &sum_x * &denom * &denom + &teta * &sum_ab * &vec_x;
    if recompute_x {
        let cx = (rat(ca0.clone()) + rat(sign(&vec_x)) * &det_sqrt) / &denom_sqr;
        c.x = to_f64(&cx);
    }
    if recompute_y {
        let ca2 = &sum_y * &denom * &denom + &teta * &sum_ab * &vec_y;
        let cy = (rat(ca2) + rat(sign(&vec_y)) * &det_sqrt) / &denom_sqr;
        c.y = to_f64(&cy);
    }
    if recompute_lower_x {
        let ca2 = &sum_ab * (&denom * &denom + &teta * &teta);
        let numer = rat(ca0) * &segm_sqrt
            + rat(sign(&vec_x)) * sqrt_integer(&(&det * &segm_len))
            + rat(ca2)
            + rat(sign(&teta)) * det_sqrt;
        c.lower_x = to_f64(&(numer / (denom_sqr * segm_sqrt)));
    }
}

/// Point-segment-segment circle. `site1` is the point.
pub(crate) fn recompute_pss(
    site1: &SiteEvent,
    site2: &SiteEvent,
    site3: &SiteEvent,
    point_index: SiteIndex,
    c: &mut Candidate,
    recompute_x: bool,
    recompute_y: bool,
    recompute_lower_x: bool,
) {
    let segm_start1 = site2.point1();
    let segm_end1 = site2.point0();
    let segm_start2 = site3.point0();
    let segm_end2 = site3.point1();

    let a0 = int(segm_end1.x) - int(segm_start1.x);
    let b0 = int(segm_end1.y) - int(segm_start1.y);
    let a1 = int(segm_end2.x) - int(segm_start2.x);
    let b1 = int(segm_end2.y) - int(segm_start2.y);
    let orientation = &a1 * &b0 - &a0 * &b1;

    if orientation == Integer::ZERO {
        // Parallel segments: the center rides the midline.
        let denom = rat((&a0 * &a0 + &b0 * &b0) * Integer::from(2));
        if denom == Rational::ZERO {
            mark_divergent(c);
            return;
        }
        let c0 = (int(segm_start2.x) - int(segm_start1.x)) * &b0
            - (int(segm_start2.y) - int(segm_start1.y)) * &a0;
        let dx = (int(site1.y()) - int(segm_start1.y)) * &a0
            - (int(site1.x()) - int(segm_start1.x)) * &b0;
        let dy = (int(site1.x()) - int(segm_start2.x)) * &b0
            - (int(site1.y()) - int(segm_start2.y)) * &a0;
        let radicand = &dx * &dy;
        if radicand < Integer::ZERO {
            mark_divergent(c);
            return;
        }
        let root = sqrt_integer(&radicand);
        let two_signed = if point_index == SiteIndex::Two {
            Integer::from(2)
        } else {
            Integer::from(-2)
        };

        if recompute_y {
            let ca0 = &two_signed * &b0;
            let ca1 = (int(segm_start1.y) + int(segm_start2.y)) * &a0 * &a0
                - (int(segm_start1.x) + int(segm_start2.x) - int(site1.x()) * Integer::from(2))
                    * &a0
                    * &b0
                + int(site1.y()) * Integer::from(2) * &b0 * &b0;
            c.y = to_f64(&((rat(ca0) * &root + rat(ca1)) / &denom));
        }
        if recompute_x || recompute_lower_x {
            let ca0 = &two_signed * &a0;
            let ca1 = (int(segm_start1.x) + int(segm_start2.x)) * &b0 * &b0
                - (int(segm_start1.y) + int(segm_start2.y) - int(site1.y()) * Integer::from(2))
                    * &a0
                    * &b0
                + int(site1.x()) * Integer::from(2) * &a0 * &a0;
            let cx = (rat(ca0) * &root + rat(ca1)) / &denom;
            if recompute_x {
                c.x = to_f64(&cx);
            }
            if recompute_lower_x {
                let half_width =
                    rat(c0.abs()) * sqrt_integer(&(&a0 * &a0 + &b0 * &b0)) / &denom;
                c.lower_x = to_f64(&(cx + half_width));
            }
        }
        return;
    }

    let c0 = int(segm_end1.x) * &b0 - int(segm_end1.y) * &a0;
    let c1 = int(segm_end2.y) * &a1 - int(segm_end2.x) * &b1;
    let ix = &a0 * &c1 + &a1 * &c0;
    let iy = &b0 * &c1 + &b1 * &c0;
    let dx = &ix - int(site1.x()) * &orientation;
    let dy = &iy - int(site1.y()) * &orientation;

    if dx == Integer::ZERO && dy == Integer::ZERO {
        // The point sits exactly on the segments' intersection.
        let x = rat(ix) / rat(orientation.clone());
        let y = rat(iy) / rat(orientation);
        c.x = to_f64(&x);
        c.y = to_f64(&y);
        c.lower_x = c.x;
        return;
    }

    let sign = Integer::from(if point_index == SiteIndex::Two { 1 } else { -1 })
        * Integer::from(if orientation < Integer::ZERO { 1 } else { -1 });

    let cb = [
        &a0 * &a0 + &b0 * &b0,
        &a1 * &a1 + &b1 * &b1,
        &a0 * &a1 + &b0 * &b1,
        (&a0 * &dy - &b0 * &dx) * (&a1 * &dy - &b1 * &dx) * Integer::from(-2),
    ];
    let ca = [
        -(&a1 * &dx) - (&b1 * &dy),
        -(&a0 * &dx) - (&b0 * &dy),
        sign.clone(),
        Integer::ZERO,
    ];
    let temp = eval_pss_expr(&ca, &cb);
    let denom = &temp * rat(orientation.clone());
    if denom == Rational::ZERO {
        mark_divergent(c);
        return;
    }

    let dist_sqr = &dx * &dx + &dy * &dy;
    let proj0 = &dx * &a0 + &dy * &b0;
    let proj1 = &dx * &a1 + &dy * &b1;

    if recompute_y {
        let cy = eval_pss_expr(
            &[
                &dist_sqr * &b1 - &proj1 * &iy,
                &dist_sqr * &b0 - &proj0 * &iy,
                &iy * &sign,
                Integer::ZERO,
            ],
            &cb,
        );
        c.y = to_f64(&(cy / &denom));
    }
    if recompute_x || recompute_lower_x {
        let ca0 = &dist_sqr * &a1 - &proj1 * &ix;
        let ca1 = &dist_sqr * &a0 - &proj0 * &ix;
        let ca2 = &ix * &sign;
        if recompute_x {
            let cx = eval_pss_expr(&[ca0.clone(), ca1.clone(), ca2.clone(), Integer::ZERO], &cb);
            c.x = to_f64(&(cx / &denom));
        }
        if recompute_lower_x {
            let ca3 = &orientation
                * &dist_sqr
                * Integer::from(if temp < Rational::ZERO { -1 } else { 1 });
            let lx = eval_pss_expr(&[ca0, ca1, ca2, ca3], &cb);
            c.lower_x = to_f64(&(lx / &denom));
        }
    }
}

/// Segment-segment-segment circle.
pub(crate) fn recompute_sss(
    site1: &SiteEvent,
    site2: &SiteEvent,
    site3: &SiteEvent,
    c: &mut Candidate,
    recompute_x: bool,
    recompute_y: bool,
    recompute_lower_x: bool,
) {
    let sites = [site1, site2, site3];
    let mut a = [Integer::ZERO, Integer::ZERO, Integer::ZERO];
    let mut b = [Integer::ZERO, Integer::ZERO, Integer::ZERO];
    let mut cc = [Integer::ZERO, Integer::ZERO, Integer::ZERO];
    let mut len = [Rational::ZERO, Rational::ZERO, Rational::ZERO];
    for i in 0..3 {
        a[i] = int(sites[i].x1()) - int(sites[i].x0());
        b[i] = int(sites[i].y1()) - int(sites[i].y0());
        cc[i] = int(sites[i].x0()) * int(sites[i].y1()) - int(sites[i].y0()) * int(sites[i].x1());
        len[i] = sqrt_integer(&(&a[i] * &a[i] + &b[i] * &b[i]));
    }

    let cross = |u: &[Integer; 3], v: &[Integer; 3], i: usize| {
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;
        &u[j] * &v[k] - &u[k] * &v[j]
    };

    let weighted = |numers: &[Integer; 3]| {
        let mut acc = Rational::ZERO;
        for i in 0..3 {
            acc += rat(numers[i].clone()) * &len[i];
        }
        acc
    };

    let denom = weighted(&[cross(&a, &b, 0), cross(&a, &b, 1), cross(&a, &b, 2)]);
    if denom == Rational::ZERO {
        mark_divergent(c);
        return;
    }

    if recompute_y {
        let cy = weighted(&[cross(&b, &cc, 0), cross(&b, &cc, 1), cross(&b, &cc, 2)]);
        c.y = to_f64(&(cy / &denom));
    }
    if recompute_x || recompute_lower_x {
        let numers = [cross(&a, &cc, 0), cross(&a, &cc, 1), cross(&a, &cc, 2)];
        let cx = weighted(&numers);
        if recompute_x {
            c.x = to_f64(&(cx.clone() / &denom));
        }
        if recompute_lower_x {
            let mut r = Rational::ZERO;
            for i in 0..3 {
                r += rat(&numers[i] * &b[i]);
            }
            c.lower_x = to_f64(&((cx + r) / &denom));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_of_perfect_square_is_exact() {
        let r = sqrt_integer(&Integer::from(144));
        assert_eq!(r, Rational::from(12));
    }

    #[test]
    fn sqrt_two_to_f64() {
        let r = sqrt_integer(&Integer::from(2));
        let f = to_f64(&r);
        assert!((f - std::f64::consts::SQRT_2).abs() < 1e-15);
    }

    #[test]
    fn to_f64_round_trips_integers() {
        for v in [0i64, 1, -1, 42, -12345678, 1 << 52] {
            assert_eq!(to_f64(&Rational::from(v)), v as f64);
        }
    }

    #[test]
    fn to_f64_handles_fractions() {
        let r = Rational::from_signeds(1, 3);
        assert!((to_f64(&r) - 1.0 / 3.0).abs() < 1e-16);
        let r = Rational::from_signeds(-7, 2);
        assert_eq!(to_f64(&r), -3.5);
    }

    #[test]
    fn ppp_unit_triangle() {
        // Circumcircle of (0,0), (2,0), (0,2) — clockwise so the
        // orientation matches what circle formation feeds us — is
        // centered at (1,1) with radius sqrt(2).
        let mut c = Candidate::default();
        recompute_ppp(
            Point::new(0, 0),
            Point::new(0, 2),
            Point::new(2, 0),
            &mut c,
            true,
            true,
            true,
        );
        assert!((c.x - 1.0).abs() < 1e-12);
        assert!((c.y - 1.0).abs() < 1e-12);
        assert!((c.lower_x - (1.0 + std::f64::consts::SQRT_2)).abs() < 1e-12);
    }
}
