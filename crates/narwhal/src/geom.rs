//! Planar primitives shared by the force engine, the Voronoi builder and the overlap driver.

use serde::{Deserialize, Serialize};

/// Tolerance used for every equality/ordering comparison in diagram construction.
pub const EPSILON: f64 = 1e-9;

#[inline]
pub fn equal_with_epsilon(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

#[inline]
pub fn greater_than_with_epsilon(a: f64, b: f64) -> bool {
    a - b > EPSILON
}

#[inline]
pub fn greater_than_or_equal_with_epsilon(a: f64, b: f64) -> bool {
    b - a <= EPSILON
}

#[inline]
pub fn less_than_with_epsilon(a: f64, b: f64) -> bool {
    b - a > EPSILON
}

#[inline]
pub fn less_than_or_equal_with_epsilon(a: f64, b: f64) -> bool {
    a - b <= EPSILON
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Coordinate-wise comparison with [`EPSILON`].
    pub fn approx_eq(self, other: Point) -> bool {
        equal_with_epsilon(self.x, other.x) && equal_with_epsilon(self.y, other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle in screen orientation: `top < bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn from_size(width: f64, height: f64) -> Self {
        Self {
            left: 0.0,
            right: width,
            top: 0.0,
            bottom: height,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn is_valid(&self) -> bool {
        self.left.is_finite()
            && self.right.is_finite()
            && self.top.is_finite()
            && self.bottom.is_finite()
            && self.right > self.left
            && self.bottom > self.top
    }

    pub fn contains(&self, p: Point) -> bool {
        greater_than_or_equal_with_epsilon(p.x, self.left)
            && less_than_or_equal_with_epsilon(p.x, self.right)
            && greater_than_or_equal_with_epsilon(p.y, self.top)
            && less_than_or_equal_with_epsilon(p.y, self.bottom)
    }

    pub fn clamp(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(self.left, self.right),
            p.y.clamp(self.top, self.bottom),
        )
    }

    /// Grows the rectangle around its center; `factor` is relative to the current size.
    pub fn expanded(&self, factor: f64) -> Self {
        let dw = self.width() * factor / 2.0;
        let dh = self.height() * factor / 2.0;
        Self {
            left: self.left - dw,
            right: self.right + dw,
            top: self.top - dh,
            bottom: self.bottom + dh,
        }
    }

    /// Maps `p` from `self` onto `target`, preserving its relative position.
    pub fn map_to(&self, target: &Rect, p: Point) -> Point {
        let sx = if self.width() > 0.0 {
            target.width() / self.width()
        } else {
            1.0
        };
        let sy = if self.height() > 0.0 {
            target.height() / self.height()
        } else {
            1.0
        };
        Point::new(
            target.left + (p.x - self.left) * sx,
            target.top + (p.y - self.top) * sy,
        )
    }
}

/// Signed area of a closed polygon (shoelace). Orientation decides the sign.
pub fn polygon_signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        acc += p.x * q.y - q.x * p.y;
    }
    acc / 2.0
}

/// Area-weighted centroid of a closed polygon, or `None` for degenerate (zero-area) loops.
pub fn polygon_centroid(points: &[Point]) -> Option<Point> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let f = p.x * q.y - q.x * p.y;
        area += f;
        cx += (p.x + q.x) * f;
        cy += (p.y + q.y) * f;
    }
    area /= 2.0;
    if area.abs() <= EPSILON {
        return None;
    }
    let f = area * 6.0;
    let c = Point::new(cx / f, cy / f);
    c.is_finite().then_some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_comparisons_are_a_trichotomy() {
        let samples = [
            0.0,
            1.0,
            1.0 + EPSILON / 2.0,
            1.0 + EPSILON * 2.0,
            -3.5,
            1e6,
            1e6 + 1e-3,
        ];
        for &a in &samples {
            assert!(equal_with_epsilon(a, a));
            for &b in &samples {
                let states = [
                    less_than_with_epsilon(a, b),
                    equal_with_epsilon(a, b),
                    greater_than_with_epsilon(a, b),
                ];
                let hits = states.iter().filter(|s| **s).count();
                assert_eq!(hits, 1, "a={a} b={b} states={states:?}");
            }
        }
    }

    #[test]
    fn centroid_of_unit_square_is_its_center() {
        let sq = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let c = polygon_centroid(&sq).expect("centroid");
        assert!(c.approx_eq(Point::new(1.0, 1.0)), "got {c:?}");
        assert!((polygon_signed_area(&sq).abs() - 4.0).abs() < 1e-12);

        let mut reversed = sq;
        reversed.reverse();
        let c = polygon_centroid(&reversed).expect("centroid");
        assert!(c.approx_eq(Point::new(1.0, 1.0)), "got {c:?}");
    }

    #[test]
    fn degenerate_polygon_has_no_centroid() {
        let line = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ];
        assert!(polygon_centroid(&line).is_none());
    }

    #[test]
    fn expanded_rect_keeps_center() {
        let r = Rect::from_size(100.0, 50.0);
        let e = r.expanded(0.1);
        assert!(e.center().approx_eq(r.center()));
        assert!((e.width() - 110.0).abs() < 1e-12);
        assert!((e.height() - 55.0).abs() < 1e-12);
        let mapped = r.map_to(&e, Point::new(100.0, 50.0));
        assert!(mapped.approx_eq(Point::new(e.right, e.bottom)));
    }
}
