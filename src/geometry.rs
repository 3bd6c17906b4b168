use std::f32::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};

/// A 2D coordinate. Which space it belongs to (face, canvas or device pixels)
/// is documented at each use site.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn offset(self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Width/height pair used for canvases, images and crop rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions finite and strictly positive.
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn scaled(self, factor: f32) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }

    pub fn aspect(&self) -> f32 {
        self.height / self.width
    }
}

/// Axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// One cubic Bezier segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubic {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

pub fn distance(a: Point, b: Point) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    (dx * dx + dy * dy).sqrt()
}

/// Normalizes an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Vertices of a regular hexagon centered at the origin with rounded corners.
///
/// Returns 12 points: even indices are the six corners on the circle of
/// `radius` (corner `k` at `-60·k` degrees), each followed by the point
/// `corner_radius` along the edge towards the next corner. The arc joins
/// between each pair are built by [`crate::processing::hex_clip`].
pub fn rounded_hexagon(radius: f32, corner_radius: f32) -> Vec<Point> {
    if !radius.is_finite() || radius <= 0.0 {
        return Vec::new();
    }

    let corners: Vec<Point> = (0..6)
        .map(|k| {
            let theta = (-60.0 * k as f32).to_radians();
            Point::new(radius * theta.cos(), radius * theta.sin())
        })
        .collect();

    // edge length of a regular hexagon equals its circumradius
    let t = (corner_radius / radius).clamp(0.0, 0.5);
    let mut vertices = Vec::with_capacity(12);
    for k in 0..6 {
        let corner = corners[k];
        let next = corners[(k + 1) % 6];
        vertices.push(corner);
        vertices.push(corner.lerp(next, t));
    }
    vertices
}

/// Flattens a circular arc into cubic Beziers, at most one per 90 degrees.
///
/// Angles are radians in screen space (y down). `anticlockwise` sweeps
/// towards decreasing angles, matching the immediate-mode canvas `arc` call.
pub fn arc_to_cubics(
    center: Point,
    radius: f32,
    start: f32,
    end: f32,
    anticlockwise: bool,
) -> Vec<Cubic> {
    if !radius.is_finite() || radius <= 0.0 {
        return Vec::new();
    }

    let mut sweep = end - start;
    if sweep.abs() >= TAU {
        sweep = if anticlockwise { -TAU } else { TAU };
    } else if anticlockwise {
        while sweep > 0.0 {
            sweep -= TAU;
        }
    } else {
        while sweep < 0.0 {
            sweep += TAU;
        }
    }

    if sweep.abs() < f32::EPSILON {
        return Vec::new();
    }

    let segments = ((sweep.abs() / FRAC_PI_2).ceil() as u32).max(1);
    let delta = sweep / segments as f32;
    // signed, so the handles follow the sweep direction
    let k = 4.0 / 3.0 * (delta / 4.0).tan();

    let mut cubics = Vec::with_capacity(segments as usize);
    for idx in 0..segments {
        let theta0 = start + delta * idx as f32;
        let theta1 = theta0 + delta;
        let p0 = point_on_circle(center, radius, theta0);
        let p3 = point_on_circle(center, radius, theta1);
        let p1 = Point::new(
            p0.x - k * radius * theta0.sin(),
            p0.y + k * radius * theta0.cos(),
        );
        let p2 = Point::new(
            p3.x + k * radius * theta1.sin(),
            p3.y - k * radius * theta1.cos(),
        );
        cubics.push(Cubic { p0, p1, p2, p3 });
    }
    cubics
}

pub fn point_on_circle(center: Point, radius: f32, theta: f32) -> Point {
    Point::new(
        center.x + radius * theta.cos(),
        center.y + radius * theta.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3
    }

    #[test]
    fn distance_is_euclidean() {
        assert!(close(distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)), 5.0));
        assert!(close(distance(Point::new(-1.0, 2.0), Point::new(-1.0, 2.0)), 0.0));
    }

    #[test]
    fn normalize_wraps_into_range() {
        assert!(close(normalize_degrees(390.0), 30.0));
        assert!(close(normalize_degrees(-30.0), 330.0));
        assert!(close(normalize_degrees(-270.0), 90.0));
        assert!(close(normalize_degrees(360.0), 0.0));
    }

    #[test]
    fn rounded_hexagon_has_twelve_points_with_corners_on_circle() {
        for radius in [0.5_f32, 1.0, 37.0, 250.0] {
            let pts = rounded_hexagon(radius, radius / 6.0);
            assert_eq!(pts.len(), 12);
            for (k, p) in pts.iter().step_by(2).enumerate() {
                assert!((distance(Point::default(), *p) - radius).abs() <= radius * 1e-4);
                let angle = normalize_degrees(p.y.atan2(p.x).to_degrees());
                let expected = normalize_degrees(-60.0 * k as f32);
                let diff = (angle - expected).abs();
                assert!(diff < 1e-2 || (360.0 - diff) < 1e-2, "corner {k} at {angle}");
            }
        }
    }

    #[test]
    fn rounded_hexagon_is_deterministic() {
        assert_eq!(rounded_hexagon(42.0, 7.0), rounded_hexagon(42.0, 7.0));
    }

    #[test]
    fn rounded_hexagon_rejects_degenerate_radius() {
        assert!(rounded_hexagon(0.0, 0.0).is_empty());
        assert!(rounded_hexagon(f32::NAN, 1.0).is_empty());
    }

    #[test]
    fn interpolated_points_sit_along_the_edge() {
        let pts = rounded_hexagon(60.0, 10.0);
        for k in 0..6 {
            assert!(close(distance(pts[2 * k], pts[2 * k + 1]), 10.0));
        }
    }

    #[test]
    fn anticlockwise_arc_ends_at_requested_angle() {
        let center = Point::new(10.0, 10.0);
        let cubics = arc_to_cubics(center, 5.0, 30f32.to_radians(), 330f32.to_radians(), true);
        assert_eq!(cubics.len(), 1);
        let end = cubics.last().unwrap().p3;
        let expected = point_on_circle(center, 5.0, (-30f32).to_radians());
        assert!(close(end.x, expected.x) && close(end.y, expected.y));
    }

    #[test]
    fn full_circle_splits_into_quarters() {
        let cubics = arc_to_cubics(Point::default(), 1.0, 0.0, TAU, false);
        assert_eq!(cubics.len(), 4);
    }
}
