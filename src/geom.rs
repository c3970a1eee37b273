//! Input geometry: integer points and segments.

use serde::Serialize;

// Points are ordered by `x` and then by `y`. This is the sweep direction:
// the sweep line is vertical and moves towards larger `x`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Point { x, y }
    }
}

/// An input segment. Endpoints may appear in either order; the builder
/// normalizes direction internally.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: impl Into<Point>, end: impl Into<Point>) -> Self {
        Segment {
            start: start.into(),
            end: end.into(),
        }
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} -- {:?}", self.start, self.end)
    }
}

impl From<(i32, i32, i32, i32)> for Segment {
    fn from((x1, y1, x2, y2): (i32, i32, i32, i32)) -> Self {
        Segment {
            start: Point { x: x1, y: y1 },
            end: Point { x: x2, y: y2 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_order_is_x_major() {
        let a = Point::new(0, 10);
        let b = Point::new(1, -10);
        let c = Point::new(1, 0);
        assert!(a < b);
        assert!(b < c);
    }
}
