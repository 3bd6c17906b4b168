//! Conversion between face-space (source image pixels) and canvas-space.

use crate::geometry::Point;

/// Image pixels per canvas pixel, plus the image point drawn at the canvas
/// origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub scale: f32,
    pub origin: Point,
}

#[derive(Debug, Clone, Copy)]
pub struct GridMapper {
    projection: Projection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl GridMapper {
    pub fn new(projection: Projection) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// A face-space length expressed in canvas pixels.
    pub fn to_canvas_len(&self, len: f32) -> f32 {
        len / self.projection.scale
    }

    pub fn to_canvas_coord(&self, value: f32, axis: Axis) -> f32 {
        let origin = match axis {
            Axis::X => self.projection.origin.x,
            Axis::Y => self.projection.origin.y,
        };
        (value - origin) / self.projection.scale
    }

    pub fn to_canvas(&self, p: Point) -> Point {
        Point::new(
            self.to_canvas_coord(p.x, Axis::X),
            self.to_canvas_coord(p.y, Axis::Y),
        )
    }

    pub fn to_face_len(&self, len: f32) -> f32 {
        len * self.projection.scale
    }

    pub fn to_face(&self, p: Point) -> Point {
        Point::new(
            p.x * self.projection.scale + self.projection.origin.x,
            p.y * self.projection.scale + self.projection.origin.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_face_points_onto_the_canvas_and_back() {
        let mapper = GridMapper::new(Projection {
            scale: 2.0,
            origin: Point::new(100.0, 50.0),
        });
        let canvas = mapper.to_canvas(Point::new(300.0, 250.0));
        assert_eq!(canvas, Point::new(100.0, 100.0));
        assert_eq!(mapper.to_face(canvas), Point::new(300.0, 250.0));
        assert_eq!(mapper.to_canvas_len(40.0), 20.0);
        assert_eq!(mapper.to_face_len(20.0), 40.0);
        assert_eq!(mapper.to_canvas_coord(100.0, Axis::X), 0.0);
    }
}
