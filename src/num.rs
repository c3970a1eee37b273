//! The filtered floating-point layer.
//!
//! Geometric predicates evaluated in `f64` are only trustworthy when we
//! know how wrong they can be. [`RobustF64`] carries a relative-error
//! bound (in ulps) alongside every value, propagated through arithmetic
//! with the standard rules:
//!
//! - `r(a + b) <= max(r(a), r(b))` when the operands agree in sign,
//! - `r(a * b), r(a / b) <= r(a) + r(b)`,
//! - subtraction of same-signed values can cancel and blow the bound up
//!   arbitrarily,
//!
//! plus one rounding ulp per operation. Because of the cancellation case,
//! long sums are accumulated in a [`RobustSum`] that keeps positive and
//! negative contributions apart and subtracts once, at the end.
//!
//! When a final bound exceeds the caller's tolerance the computation is
//! redone in exact arithmetic (see [`crate::exact`]).

use std::cmp::Ordering;
use std::ops;

/// One rounding error, in ulps, added by every floating-point operation.
pub(crate) const ROUNDING_ERROR: f64 = 1.0;

/// An `f64` with an attached relative-error bound, measured in ulps.
#[derive(Copy, Clone, Default)]
pub(crate) struct RobustF64 {
    val: f64,
    err: f64,
}

impl RobustF64 {
    pub(crate) fn new(val: f64) -> Self {
        RobustF64 { val, err: 0.0 }
    }

    pub(crate) fn with_error(val: f64, err: f64) -> Self {
        RobustF64 { val, err }
    }

    #[inline]
    pub(crate) fn value(&self) -> f64 {
        self.val
    }

    #[inline]
    pub(crate) fn error(&self) -> f64 {
        self.err
    }

    // Zero is neither positive nor negative here; the sign tests below
    // rely on that.
    #[inline]
    pub(crate) fn is_pos(&self) -> bool {
        self.val > 0.0
    }

    #[inline]
    pub(crate) fn is_neg(&self) -> bool {
        self.val < 0.0
    }

    pub(crate) fn sqrt(self) -> Self {
        RobustF64 {
            val: self.val.sqrt(),
            err: self.err * 0.5 + ROUNDING_ERROR,
        }
    }
}

impl std::fmt::Debug for RobustF64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.12}[{:.2}]", self.val, self.err)
    }
}

/// A cancellation bound that never goes NaN: division by a vanishing sum
/// must surface as "unbounded error", not as a poisoned comparison.
fn saturate(err: f64) -> f64 {
    if err.is_nan() {
        f64::INFINITY
    } else {
        err
    }
}

impl ops::Add for RobustF64 {
    type Output = RobustF64;

    fn add(self, rhs: RobustF64) -> RobustF64 {
        let val = self.val + rhs.val;
        let err = if (!self.is_neg() && !rhs.is_neg()) || (!self.is_pos() && !rhs.is_pos()) {
            self.err.max(rhs.err) + ROUNDING_ERROR
        } else {
            let t = (self.val * self.err - rhs.val * rhs.err) / val;
            saturate(t.abs()) + ROUNDING_ERROR
        };
        RobustF64 { val, err }
    }
}

impl ops::Sub for RobustF64 {
    type Output = RobustF64;

    fn sub(self, rhs: RobustF64) -> RobustF64 {
        let val = self.val - rhs.val;
        let err = if (!self.is_neg() && !rhs.is_pos()) || (!self.is_pos() && !rhs.is_neg()) {
            self.err.max(rhs.err) + ROUNDING_ERROR
        } else {
            let t = (self.val * self.err + rhs.val * rhs.err) / val;
            saturate(t.abs()) + ROUNDING_ERROR
        };
        RobustF64 { val, err }
    }
}

impl ops::Mul for RobustF64 {
    type Output = RobustF64;

    fn mul(self, rhs: RobustF64) -> RobustF64 {
        RobustF64 {
            val: self.val * rhs.val,
            err: self.err + rhs.err + ROUNDING_ERROR,
        }
    }
}

impl ops::Div for RobustF64 {
    type Output = RobustF64;

    fn div(self, rhs: RobustF64) -> RobustF64 {
        RobustF64 {
            val: self.val / rhs.val,
            err: self.err + rhs.err + ROUNDING_ERROR,
        }
    }
}

impl ops::Neg for RobustF64 {
    type Output = RobustF64;

    fn neg(self) -> RobustF64 {
        RobustF64 {
            val: -self.val,
            err: self.err,
        }
    }
}

/// A sum kept as separate positive and negative accumulators.
///
/// Adding same-signed values keeps the error bound tight; the one
/// dangerous subtraction happens in [`RobustSum::dif`], once.
#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct RobustSum {
    pos: RobustF64,
    neg: RobustF64,
}

impl RobustSum {
    pub(crate) fn new() -> Self {
        RobustSum::default()
    }

    pub(crate) fn dif(&self) -> RobustF64 {
        self.pos - self.neg
    }

    pub(crate) fn positive(&self) -> RobustF64 {
        self.pos
    }

    pub(crate) fn negative(&self) -> RobustF64 {
        self.neg
    }
}

impl ops::AddAssign<RobustF64> for RobustSum {
    fn add_assign(&mut self, v: RobustF64) {
        if !v.is_neg() {
            self.pos = self.pos + v;
        } else {
            self.neg = self.neg - v;
        }
    }
}

impl ops::SubAssign<RobustF64> for RobustSum {
    fn sub_assign(&mut self, v: RobustF64) {
        if !v.is_neg() {
            self.neg = self.neg + v;
        } else {
            self.pos = self.pos - v;
        }
    }
}

impl ops::AddAssign<RobustSum> for RobustSum {
    fn add_assign(&mut self, v: RobustSum) {
        self.pos = self.pos + v.pos;
        self.neg = self.neg + v.neg;
    }
}

impl ops::SubAssign<RobustSum> for RobustSum {
    fn sub_assign(&mut self, v: RobustSum) {
        self.pos = self.pos + v.neg;
        self.neg = self.neg + v.pos;
    }
}

impl ops::Neg for RobustSum {
    type Output = RobustSum;

    fn neg(self) -> RobustSum {
        RobustSum {
            pos: self.neg,
            neg: self.pos,
        }
    }
}

impl ops::Mul<RobustF64> for RobustSum {
    type Output = RobustSum;

    fn mul(self, v: RobustF64) -> RobustSum {
        if !v.is_neg() {
            RobustSum {
                pos: self.pos * v,
                neg: self.neg * v,
            }
        } else {
            RobustSum {
                pos: self.neg * -v,
                neg: self.pos * -v,
            }
        }
    }
}

impl ops::DivAssign<RobustF64> for RobustSum {
    fn div_assign(&mut self, v: RobustF64) {
        *self = if !v.is_neg() {
            RobustSum {
                pos: self.pos / v,
                neg: self.neg / v,
            }
        } else {
            RobustSum {
                pos: self.neg / -v,
                neg: self.pos / -v,
            }
        };
    }
}

impl ops::Add<RobustSum> for RobustSum {
    type Output = RobustSum;

    fn add(mut self, v: RobustSum) -> RobustSum {
        self += v;
        self
    }
}

/// Maps an `f64` to an integer such that the mapping is monotone in the
/// float's value and adjacent representable floats map to adjacent
/// integers. Both zeros map to 0.
fn ulp_key(x: f64) -> i128 {
    let bits = x.to_bits();
    if bits >> 63 == 0 {
        bits as i128
    } else {
        -((bits & 0x7fff_ffff_ffff_ffff) as i128)
    }
}

/// Compares two floats, treating values within `max_ulps` representable
/// steps of each other as equal.
pub(crate) fn ulp_cmp(a: f64, b: f64, max_ulps: u64) -> Ordering {
    debug_assert!(!a.is_nan() && !b.is_nan());
    let d = ulp_key(a) - ulp_key(b);
    if d.unsigned_abs() <= max_ulps as u128 {
        Ordering::Equal
    } else if d < 0 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_sign_addition_keeps_max_error() {
        let a = RobustF64::with_error(1.0, 3.0);
        let b = RobustF64::with_error(2.0, 5.0);
        let c = a + b;
        assert_eq!(c.value(), 3.0);
        assert_eq!(c.error(), 6.0);
    }

    #[test]
    fn cancelling_subtraction_blows_up() {
        let a = RobustF64::with_error(1.0, 1.0);
        let b = RobustF64::with_error(1.0 - 1e-15, 1.0);
        let c = a - b;
        assert!(c.error() > 1e10);
    }

    #[test]
    fn multiplication_sums_errors() {
        let a = RobustF64::with_error(3.0, 2.0);
        let b = RobustF64::with_error(4.0, 3.0);
        assert_eq!((a * b).value(), 12.0);
        assert_eq!((a * b).error(), 6.0);
    }

    #[test]
    fn sum_separates_signs() {
        let mut s = RobustSum::new();
        s += RobustF64::new(10.0);
        s -= RobustF64::new(4.0);
        s += RobustF64::new(-1.0);
        assert_eq!(s.positive().value(), 10.0);
        assert_eq!(s.negative().value(), 5.0);
        assert_eq!(s.dif().value(), 5.0);
    }

    #[test]
    fn ulp_comparison() {
        assert_eq!(ulp_cmp(1.0, 1.0, 0), Ordering::Equal);
        let next = f64::from_bits(1.0f64.to_bits() + 1);
        assert_eq!(ulp_cmp(1.0, next, 0), Ordering::Less);
        assert_eq!(ulp_cmp(1.0, next, 1), Ordering::Equal);
        assert_eq!(ulp_cmp(next, 1.0, 0), Ordering::Greater);
        assert_eq!(ulp_cmp(0.0, -0.0, 0), Ordering::Equal);
        assert_eq!(ulp_cmp(-1.0, 1.0, 64), Ordering::Less);
        assert_eq!(ulp_cmp(1e300, -1e300, u64::MAX), Ordering::Equal);
    }
}
